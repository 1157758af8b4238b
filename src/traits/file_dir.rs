//! Directory operations.

use crate::{DirEntry, FilePath, FsError, ListFilter};

/// Directory operations of a file access back end.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FileDir`.
pub trait FileDir: Send + Sync {
    /// List the entries of a directory that pass `filter`.
    ///
    /// The outer `Result` says whether the directory could be opened; each
    /// item's `Result` says whether that entry could be read. Entries carry a
    /// [`FilePathInfo`](crate::FilePathInfo) when `filter.with_info` is set.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    fn list_directory(&self, path: &FilePath, filter: &ListFilter) -> Result<ListDirIter, FsError>;

    /// Create a directory (parent must exist).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::AlreadyExists`] if the path already exists
    fn create_dir(&self, path: &FilePath) -> Result<(), FsError>;

    /// Create a directory and all missing parents.
    ///
    /// Succeeds if the directory already exists.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if a component of the path exists but is not a directory
    fn create_dir_all(&self, path: &FilePath) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// Wraps a boxed iterator for flexibility across different back ends.
///
/// # Example
///
/// ```rust
/// use devpath::{FileDir, FilePath, FsError, ListFilter};
///
/// fn names<B: FileDir>(access: &B, dir: &FilePath) -> Result<Vec<String>, FsError> {
///     let mut names = Vec::new();
///     for entry in access.list_directory(dir, &ListFilter::all())? {
///         names.push(entry?.name().to_string());
///     }
///     Ok(names)
/// }
/// ```
pub struct ListDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ListDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }

    /// Collect the readable entries, dropping per-entry errors.
    pub fn collect_ok(self) -> Vec<DirEntry> {
        self.filter_map(Result::ok).collect()
    }
}

impl Iterator for ListDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl std::fmt::Debug for ListDirIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ListDirIter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> DirEntry {
        DirEntry {
            path: FilePath::from_string(path),
            info: None,
        }
    }

    #[test]
    fn list_dir_iter_from_vec() {
        let iter = ListDirIter::from_vec(vec![Ok(entry("/a")), Ok(entry("/b"))]);
        let collected: Vec<_> = iter.collect();
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn list_dir_iter_collect_all_error() {
        let entries = vec![
            Ok(entry("/a")),
            Err(FsError::PermissionDenied {
                path: FilePath::from_string("/b"),
                operation: "list_directory",
            }),
        ];
        assert!(ListDirIter::from_vec(entries).collect_all().is_err());
    }

    #[test]
    fn list_dir_iter_collect_ok_skips_errors() {
        let entries = vec![
            Err(FsError::NotFound {
                path: FilePath::from_string("/gone"),
            }),
            Ok(entry("/a")),
        ];
        let ok = ListDirIter::from_vec(entries).collect_ok();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].name(), "a");
    }

    #[test]
    fn file_dir_is_object_safe() {
        fn _check(_: &dyn FileDir) {}
    }

    #[test]
    fn list_dir_iter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ListDirIter>();
    }
}
