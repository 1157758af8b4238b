//! # Directory Walker
//!
//! Lazy, cancellable, progress-reporting enumeration of the files to search.
//!
//! ## Overview
//!
//! A [`FileIterator`] discovers [`FileItem`]s on demand: [`FileIterator::update`]
//! makes sure item `index` is known (or that nothing is left) before the caller
//! reads it, so consumers can index randomly without re-walking.
//!
//! | Type | Source of items |
//! |------|-----------------|
//! | [`DirectoryWalker`] | recursive walk below root directories |
//! | [`FileListIterator`] | an explicit list of files |
//!
//! ## Progress
//!
//! Progress runs from 0 to [`MAX_PROGRESS`]. The roots share the budget evenly.
//! A directory with `n` new subdirectories keeps one `1/(n+1)` share for its own
//! files and hands one share to each subdirectory, so the value grows steadily
//! however unbalanced the tree is, and reaches the maximum once everything was
//! visited.
//!
//! ## Cycles
//!
//! Every directory is identified by its canonical (symlink-resolved) path; a
//! directory whose canonical path was already seen is not entered again.

use std::collections::HashSet;

use crate::{CancellationToken, FileFilter, FilePath, ListFilter};

/// Progress value reported once a walk is complete.
pub const MAX_PROGRESS: usize = 1000;

/// One file to search, with an optional text encoding hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileItem {
    /// The file.
    pub path: FilePath,
    /// Encoding name understood by [`codec_for_name`](crate::codec_for_name); `None` means UTF-8.
    pub encoding: Option<String>,
}

impl FileItem {
    /// An item without an encoding hint.
    pub fn new(path: FilePath) -> Self {
        Self { path, encoding: None }
    }

    /// An item decoded with `encoding`.
    pub fn with_encoding(path: FilePath, encoding: impl Into<String>) -> Self {
        Self {
            path,
            encoding: Some(encoding.into()),
        }
    }
}

/// Source of files for a search.
///
/// # Object Safety
///
/// This trait is object-safe; the search engine takes `Box<dyn FileIterator>`.
pub trait FileIterator: Send {
    /// Discover items until `index` is valid or the source is exhausted.
    fn update(&mut self, index: usize);

    /// Number of items discovered so far.
    fn len(&self) -> usize;

    /// Returns `true` if nothing was discovered yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A discovered item.
    fn item(&self, index: usize) -> Option<&FileItem>;

    /// Progress so far, never above [`max_progress`](Self::max_progress).
    fn current_progress(&self) -> usize;

    /// Progress value at completion.
    fn max_progress(&self) -> usize;

    /// Iterate over all items, discovering them as needed.
    fn iter(&mut self) -> FileItems<'_>
    where
        Self: Sized,
    {
        FileItems::new(self)
    }
}

/// Iterator returned by [`FileIterator::iter`].
pub struct FileItems<'a> {
    source: &'a mut dyn FileIterator,
    index: usize,
}

impl<'a> FileItems<'a> {
    /// Iterate over any file source, including boxed ones.
    pub fn new(source: &'a mut dyn FileIterator) -> Self {
        Self { source, index: 0 }
    }
}

impl Iterator for FileItems<'_> {
    type Item = FileItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.update(self.index);
        let item = self.source.item(self.index).cloned()?;
        self.index += 1;
        Some(item)
    }
}

impl std::fmt::Debug for FileItems<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileItems").field("index", &self.index).finish()
    }
}

// ============================================================================
// Explicit file list
// ============================================================================

/// A fixed list of files.
///
/// Progress counts the items handed out so far.
#[derive(Debug, Clone, Default)]
pub struct FileListIterator {
    items: Vec<FileItem>,
    reached: usize,
}

impl FileListIterator {
    /// Items from paths, without encoding hints.
    pub fn new(paths: impl IntoIterator<Item = FilePath>) -> Self {
        Self::from_items(paths.into_iter().map(FileItem::new))
    }

    /// Items as given.
    pub fn from_items(items: impl IntoIterator<Item = FileItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
            reached: 0,
        }
    }
}

impl FileIterator for FileListIterator {
    fn update(&mut self, index: usize) {
        self.reached = self.reached.max((index + 1).min(self.items.len()));
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn item(&self, index: usize) -> Option<&FileItem> {
        self.items.get(index)
    }

    fn current_progress(&self) -> usize {
        self.reached
    }

    fn max_progress(&self) -> usize {
        self.items.len()
    }
}

// ============================================================================
// Recursive walk
// ============================================================================

#[derive(Debug)]
struct PendingDir {
    path: FilePath,
    weight: f64,
    subdirs_pushed: bool,
}

/// Walks directory trees, yielding the files accepted by a [`FileFilter`].
///
/// ```rust
/// use devpath::{DirectoryWalker, FileFilter, FileIterator, FilePath, MAX_PROGRESS};
///
/// let dir = tempfile::tempdir().unwrap();
/// let root = FilePath::from_std_path(dir.path());
/// root.path_appended("a.rs").write_file_contents(b"", None).unwrap();
/// root.path_appended("sub").create_dir().unwrap();
/// root.path_appended("sub/b.rs").write_file_contents(b"", None).unwrap();
/// root.path_appended("sub/c.txt").write_file_contents(b"", None).unwrap();
///
/// let filter = FileFilter::new(&["*.rs"], &[]).unwrap();
/// let mut walker = DirectoryWalker::new(vec![root], filter);
/// let names: Vec<String> = walker.iter().map(|i| i.path.file_name().to_string()).collect();
/// assert_eq!(names, ["b.rs", "a.rs"]);
/// assert_eq!(walker.current_progress(), MAX_PROGRESS);
/// ```
#[derive(Debug)]
pub struct DirectoryWalker {
    pending: Vec<PendingDir>,
    known_dirs: HashSet<FilePath>,
    items: Vec<FileItem>,
    filter: FileFilter,
    encoding: Option<String>,
    progress: f64,
    cancel: CancellationToken,
}

impl DirectoryWalker {
    /// Walk below `roots` in the order given.
    pub fn new(roots: Vec<FilePath>, filter: FileFilter) -> Self {
        let mut walker = Self {
            pending: Vec::new(),
            known_dirs: HashSet::new(),
            items: Vec::new(),
            filter,
            encoding: None,
            progress: 0.0,
            cancel: CancellationToken::new(),
        };
        if roots.is_empty() {
            walker.progress = MAX_PROGRESS as f64;
            return walker;
        }
        let weight = MAX_PROGRESS as f64 / roots.len() as f64;
        for root in roots.into_iter().rev() {
            walker.known_dirs.insert(Self::identity(&root));
            walker.pending.push(PendingDir {
                path: root,
                weight,
                subdirs_pushed: false,
            });
        }
        walker
    }

    /// Tag every item with `encoding`.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Stop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The token this walk observes.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` once every directory was visited.
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    fn identity(dir: &FilePath) -> FilePath {
        dir.canonical_path().unwrap_or_else(|_| dir.clean_path())
    }

    fn list(&self, dir: &FilePath, filter: ListFilter) -> Vec<FilePath> {
        let filter = if self.filter.includes_hidden() {
            filter
        } else {
            filter.without_hidden()
        };
        match dir.dir_entries(&filter) {
            Ok(entries) => entries.into_iter().map(|e| e.path).collect(),
            Err(err) => {
                tracing::debug!(dir = %dir, error = %err, "cannot list directory, skipping");
                Vec::new()
            }
        }
    }

    /// Visit one pending directory. Returns `false` when nothing is left.
    fn step(&mut self) -> bool {
        let Some(dir) = self.pending.pop() else {
            self.progress = MAX_PROGRESS as f64;
            return false;
        };

        if !dir.path.is_dir() {
            self.progress += dir.weight;
            return true;
        }

        if !dir.subdirs_pushed {
            let mut subdirs = Vec::new();
            for sub in self.list(&dir.path, ListFilter::dirs()) {
                let identity = Self::identity(&sub);
                if self.known_dirs.insert(identity) {
                    subdirs.push(sub);
                }
            }
            if !subdirs.is_empty() {
                let share = dir.weight / (subdirs.len() + 1) as f64;
                self.pending.push(PendingDir {
                    path: dir.path,
                    weight: share,
                    subdirs_pushed: true,
                });
                for sub in subdirs.into_iter().rev() {
                    self.pending.push(PendingDir {
                        path: sub,
                        weight: share,
                        subdirs_pushed: false,
                    });
                }
                return true;
            }
        }

        let before = self.items.len();
        for file in self.list(&dir.path, ListFilter::files()) {
            if self.filter.matches(&file) {
                self.items.push(FileItem {
                    path: file,
                    encoding: self.encoding.clone(),
                });
            }
        }
        self.progress += dir.weight;
        tracing::trace!(
            dir = %dir.path,
            found = self.items.len() - before,
            progress = self.current_progress(),
            "walked directory"
        );
        true
    }
}

impl FileIterator for DirectoryWalker {
    fn update(&mut self, index: usize) {
        while index >= self.items.len() && !self.cancel.is_cancelled() {
            if !self.step() {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn item(&self, index: usize) -> Option<&FileItem> {
        self.items.get(index)
    }

    fn current_progress(&self) -> usize {
        (self.progress.round() as usize).min(MAX_PROGRESS)
    }

    fn max_progress(&self) -> usize {
        MAX_PROGRESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendRegistry, FileDir, FileLink, FileWrite, MemoryFileAccess};
    use std::sync::Arc;

    fn device(host: &str) -> (Arc<MemoryFileAccess>, impl Fn(&str) -> FilePath) {
        let mem = Arc::new(MemoryFileAccess::new());
        BackendRegistry::global().register("walker", host, mem.clone());
        let host = host.to_string();
        (mem, move |p: &str| FilePath::from_parts("walker", &host, p))
    }

    fn names(walker: &mut DirectoryWalker) -> Vec<String> {
        walker.iter().map(|i| i.path.path().to_string()).collect()
    }

    #[test]
    fn empty_roots_are_complete() {
        let walker = DirectoryWalker::new(Vec::new(), FileFilter::all());
        assert_eq!(walker.current_progress(), MAX_PROGRESS);
        assert!(walker.is_empty());
    }

    #[test]
    fn depth_first_with_parent_files_after_children() {
        let (mem, p) = device("order");
        mem.create_dir_all(&p("/r/a/x")).unwrap();
        mem.create_dir_all(&p("/r/b")).unwrap();
        for f in ["/r/top.txt", "/r/a/a1.txt", "/r/a/x/deep.txt", "/r/b/b1.txt"] {
            mem.write_file(&p(f), b"", None).unwrap();
        }
        let mut walker = DirectoryWalker::new(vec![p("/r")], FileFilter::all());
        assert_eq!(
            names(&mut walker),
            ["/r/a/x/deep.txt", "/r/a/a1.txt", "/r/b/b1.txt", "/r/top.txt"]
        );
        assert_eq!(walker.current_progress(), MAX_PROGRESS);
    }

    #[test]
    fn update_is_lazy_and_monotonic() {
        let (mem, p) = device("lazy");
        for d in ["/r/a", "/r/b", "/r/c"] {
            mem.create_dir_all(&p(d)).unwrap();
            mem.write_file(&p(&format!("{d}/f")), b"", None).unwrap();
        }
        let mut walker = DirectoryWalker::new(vec![p("/r")], FileFilter::all());
        let mut last_len = 0;
        let mut last_progress = 0;
        for index in 0..4 {
            walker.update(index);
            assert!(walker.len() >= last_len);
            assert!(walker.current_progress() >= last_progress);
            assert!(walker.current_progress() <= MAX_PROGRESS);
            last_len = walker.len();
            last_progress = walker.current_progress();
        }
        assert_eq!(walker.len(), 3);
        // First directory only holds a quarter of the budget.
        walker = DirectoryWalker::new(vec![p("/r")], FileFilter::all());
        walker.update(0);
        assert_eq!(walker.len(), 1);
        assert_eq!(walker.current_progress(), 250);
    }

    #[test]
    fn filters_apply_to_files() {
        let (mem, p) = device("filters");
        mem.create_dir_all(&p("/r/build")).unwrap();
        mem.write_file(&p("/r/main.rs"), b"", None).unwrap();
        mem.write_file(&p("/r/notes.md"), b"", None).unwrap();
        mem.write_file(&p("/r/build/gen.rs"), b"", None).unwrap();
        mem.write_file(&p("/r/.hidden.rs"), b"", None).unwrap();
        let filter = FileFilter::new(&["*.rs"], &["*/build/*"]).unwrap().with_hidden(false);
        let mut walker = DirectoryWalker::new(vec![p("/r")], filter);
        assert_eq!(names(&mut walker), ["/r/main.rs"]);
    }

    #[test]
    fn symlink_cycles_are_entered_once() {
        let (mem, p) = device("cycles");
        mem.create_dir_all(&p("/r/sub")).unwrap();
        mem.write_file(&p("/r/sub/f"), b"", None).unwrap();
        mem.create_symlink(&p("/r"), &p("/r/sub/back")).unwrap();
        let mut walker = DirectoryWalker::new(vec![p("/r")], FileFilter::all());
        assert_eq!(names(&mut walker), ["/r/sub/f"]);
        assert_eq!(walker.current_progress(), MAX_PROGRESS);
    }

    #[test]
    fn missing_roots_still_complete_progress() {
        let (mem, p) = device("missing");
        mem.create_dir_all(&p("/real")).unwrap();
        mem.write_file(&p("/real/f"), b"", None).unwrap();
        let mut walker = DirectoryWalker::new(vec![p("/gone"), p("/real")], FileFilter::all());
        assert_eq!(names(&mut walker), ["/real/f"]);
        assert_eq!(walker.current_progress(), MAX_PROGRESS);
    }

    #[test]
    fn cancelled_walk_stops() {
        let (mem, p) = device("cancel");
        mem.create_dir_all(&p("/r/a")).unwrap();
        mem.create_dir_all(&p("/r/b")).unwrap();
        mem.write_file(&p("/r/a/1"), b"", None).unwrap();
        mem.write_file(&p("/r/b/2"), b"", None).unwrap();
        let token = CancellationToken::new();
        let mut walker =
            DirectoryWalker::new(vec![p("/r")], FileFilter::all()).with_cancellation(token.clone());
        walker.update(0);
        assert_eq!(walker.len(), 1);
        let progress = walker.current_progress();
        token.cancel();
        walker.update(5);
        assert_eq!(walker.len(), 1);
        assert_eq!(walker.current_progress(), progress);
    }

    #[test]
    fn encoding_hint_is_attached() {
        let (mem, p) = device("encoding");
        mem.write_file(&p("/f"), b"", None).unwrap();
        let mut walker =
            DirectoryWalker::new(vec![p("/")], FileFilter::all()).with_encoding("latin1");
        walker.update(0);
        assert_eq!(walker.item(0).unwrap().encoding.as_deref(), Some("latin1"));
    }

    #[test]
    fn file_list_progress_tracks_reads() {
        let mut list =
            FileListIterator::new([FilePath::from_string("/a"), FilePath::from_string("/b")]);
        assert_eq!(list.max_progress(), 2);
        list.update(0);
        assert_eq!(list.current_progress(), 1);
        assert_eq!(list.iter().count(), 2);
        assert_eq!(list.current_progress(), 2);
    }

    #[test]
    fn boxed_iterators_can_be_iterated() {
        let mut boxed: Box<dyn FileIterator> =
            Box::new(FileListIterator::new([FilePath::from_string("/a")]));
        assert_eq!(FileItems::new(boxed.as_mut()).count(), 1);
    }

    #[test]
    fn file_iterator_is_object_safe() {
        fn _check(_: &dyn FileIterator) {}
    }
}
