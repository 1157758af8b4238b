//! In-memory device back end.
//!
//! [`MemoryFileAccess`] is a complete device living in process memory: files,
//! directories, symlinks, permissions and modification times. Register it under
//! a scheme to get a device without a transport, or use it directly in tests.
//! Operations can be made to fail on demand with
//! [`MemoryFileAccess::fail_operation`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::SystemTime;

use crate::path_resolver::MAX_SYMLINK_DEPTH;
use crate::{
    DirEntry, Environment, FileDevice, FileDir, FileLink, FilePath, FilePathInfo, FilePermissions,
    FileRead, FileType, FileWrite, FsError, InfoFlags, ListDirIter, ListFilter, OsType, Permissions,
};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
    Symlink(String),
}

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    permissions: Permissions,
    modified: SystemTime,
}

impl Entry {
    fn file(data: Vec<u8>) -> Self {
        Self {
            node: Node::File(data),
            permissions: Permissions::default_file(),
            modified: SystemTime::now(),
        }
    }

    fn dir() -> Self {
        Self {
            node: Node::Dir,
            permissions: Permissions::default_dir(),
            modified: SystemTime::now(),
        }
    }

    fn info(&self, name: &str) -> FilePathInfo {
        let (file_type, size) = match &self.node {
            Node::File(data) => (FileType::File, data.len() as u64),
            Node::Dir => (FileType::Directory, 0),
            Node::Symlink(target) => (FileType::Symlink, target.len() as u64),
        };
        let info = FilePathInfo::new(file_type, size, self.permissions, self.modified);
        if name.starts_with('.') && name != "." && name != ".." {
            info.with_flag(InfoFlags::HIDDEN)
        } else {
            info
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    successes: usize,
    // None fails forever
    times: Option<usize>,
}

/// A thread-safe in-memory device.
///
/// Paths are keyed by their cleaned `path()` part; scheme and host are ignored,
/// so one instance can serve a whole scheme or a single host. Roots always
/// exist as directories.
///
/// ```rust
/// use devpath::{FileAccessExt, FileDir, FilePath, FileWrite, MemoryFileAccess};
///
/// let mem = MemoryFileAccess::new();
/// let dir = FilePath::from_parts("mem", "demo", "/project");
/// mem.create_dir_all(&dir).unwrap();
/// mem.write_file(&dir.path_appended("main.rs"), b"fn main() {}", None).unwrap();
/// assert_eq!(mem.read_to_string(&dir.path_appended("main.rs")).unwrap(), "fn main() {}");
/// ```
#[derive(Debug)]
pub struct MemoryFileAccess {
    os: OsType,
    environment: Environment,
    entries: RwLock<BTreeMap<String, Entry>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
}

impl MemoryFileAccess {
    /// An empty Linux-style device.
    pub fn new() -> Self {
        Self::with_os(OsType::Linux)
    }

    /// An empty device following the path rules of `os`.
    pub fn with_os(os: OsType) -> Self {
        Self {
            os,
            environment: Environment::new(os),
            entries: RwLock::new(BTreeMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the environment reported by [`FileDevice::environment`].
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Make every future call of `operation` fail with [`FsError::IoFailure`].
    ///
    /// Operation names are the trait method names, e.g. `"rename_file"`.
    pub fn fail_operation(&self, operation: &'static str) {
        self.fail_operation_after(operation, 0);
    }

    /// Let `operation` succeed `successes` more times, then fail every call.
    pub fn fail_operation_after(&self, operation: &'static str, successes: usize) {
        self.inject(operation, Failure { successes, times: None });
    }

    /// Let `operation` succeed `successes` more times, fail once, then recover.
    pub fn fail_operation_once_after(&self, operation: &'static str, successes: usize) {
        self.inject(operation, Failure { successes, times: Some(1) });
    }

    fn inject(&self, operation: &'static str, failure: Failure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation, failure);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Overwrite the modification time of an existing entry.
    pub fn set_modified(&self, path: &FilePath, modified: SystemTime) -> Result<(), FsError> {
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.modified = modified;
                Ok(())
            }
            None => Err(FsError::NotFound { path: path.clone() }),
        }
    }

    /// Number of entries stored, roots excluded.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Returns `true` if the device holds nothing but its roots.
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: &'static str, path: &FilePath) -> Result<(), FsError> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(failure) = failures.get_mut(operation) else {
            return Ok(());
        };
        if failure.successes > 0 {
            failure.successes -= 1;
            return Ok(());
        }
        if failure.times == Some(0) {
            failures.remove(operation);
            return Ok(());
        }
        if let Some(left) = &mut failure.times {
            *left -= 1;
        }
        Err(FsError::IoFailure {
            path: path.clone(),
            reason: format!("{operation}: injected failure"),
        })
    }

    fn key(&self, path: &FilePath) -> String {
        let cleaned = self.os.clean_path(path.path());
        if self.os.root_length(&cleaned) == 0 {
            // Relative paths live below the first root.
            let root = if self.os.is_windows() { "C:/" } else { "/" };
            return self.os.clean_path(&format!("{root}{cleaned}"));
        }
        cleaned
    }

    fn is_root(&self, key: &str) -> bool {
        self.os.root_length(key) == key.len()
    }

    fn parent_key(&self, key: &str) -> Option<String> {
        if self.is_root(key) {
            return None;
        }
        Some(self.os.clean_path(&format!("{key}/..")))
    }

    fn name_of(key: &str) -> &str {
        key.rsplit('/').next().unwrap_or(key)
    }

    /// Follow symlinks along `key`; the final component only if `follow_final`.
    fn resolve(
        &self,
        entries: &BTreeMap<String, Entry>,
        key: &str,
        follow_final: bool,
        original: &FilePath,
    ) -> Result<String, FsError> {
        let root_len = self.os.root_length(key);
        let mut root = key[..root_len].to_string();
        let mut segments: Vec<String> = Vec::new();
        let mut pending: Vec<String> = split_rev(&key[root_len..]);
        let mut hops = 0usize;

        while let Some(component) = pending.pop() {
            match component.as_str() {
                "." => continue,
                ".." => {
                    segments.pop();
                    continue;
                }
                _ => {}
            }
            segments.push(component);
            if pending.is_empty() && !follow_final {
                break;
            }
            let current = format!("{root}{}", segments.join("/"));
            if let Some(Entry {
                node: Node::Symlink(target),
                ..
            }) = entries.get(&current)
            {
                hops += 1;
                if hops > MAX_SYMLINK_DEPTH {
                    return Err(FsError::SymlinkLoop {
                        path: original.clone(),
                    });
                }
                segments.pop();
                let target_root = self.os.root_length(target);
                if target_root > 0 {
                    root = target[..target_root].to_string();
                    segments.clear();
                }
                pending.extend(split_rev(&target[target_root..]));
            }
        }
        Ok(format!("{root}{}", segments.join("/")))
    }

    fn lookup(
        &self,
        entries: &BTreeMap<String, Entry>,
        key: &str,
    ) -> Option<FilePathInfo> {
        if self.is_root(key) {
            return Some(Entry::dir().info("").with_flag(InfoFlags::ROOT));
        }
        entries.get(key).map(|e| e.info(Self::name_of(key)))
    }

    fn require_parent_dir(
        &self,
        entries: &BTreeMap<String, Entry>,
        key: &str,
        path: &FilePath,
    ) -> Result<(), FsError> {
        let Some(parent) = self.parent_key(key) else {
            return Ok(());
        };
        let parent = self.resolve(entries, &parent, true, path)?;
        match self.lookup(entries, &parent) {
            Some(info) if info.is_dir() => Ok(()),
            Some(_) => Err(FsError::NotADirectory {
                path: path.parent_dir(),
            }),
            None => Err(FsError::NotFound {
                path: path.parent_dir(),
            }),
        }
    }

    fn descendants(entries: &BTreeMap<String, Entry>, key: &str) -> Vec<String> {
        let prefix = if key.ends_with('/') {
            key.to_string()
        } else {
            format!("{key}/")
        };
        entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl Default for MemoryFileAccess {
    fn default() -> Self {
        Self::new()
    }
}

fn split_rev(text: &str) -> Vec<String> {
    text.split('/')
        .rev()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Trait implementations
// ============================================================================

impl FileRead for MemoryFileAccess {
    fn stat(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        self.check("stat", path)?;
        let entries = self.read_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        Ok(self.lookup(&entries, &key).unwrap_or_default())
    }

    fn read_file(
        &self,
        path: &FilePath,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<u8>, FsError> {
        self.check("read_file", path)?;
        let entries = self.read_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        if self.is_root(&key) {
            return Err(FsError::NotAFile { path: path.clone() });
        }
        match entries.get(&key).map(|e| &e.node) {
            Some(Node::File(data)) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
                let end = match limit {
                    Some(limit) => {
                        start.saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
                    }
                    None => data.len(),
                }
                .min(data.len());
                Ok(data[start..end].to_vec())
            }
            Some(_) => Err(FsError::NotAFile { path: path.clone() }),
            None => Err(FsError::NotFound { path: path.clone() }),
        }
    }
}

impl FileWrite for MemoryFileAccess {
    fn write_file(
        &self,
        path: &FilePath,
        data: &[u8],
        offset: Option<u64>,
    ) -> Result<u64, FsError> {
        self.check("write_file", path)?;
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        if self.is_root(&key) {
            return Err(FsError::NotAFile { path: path.clone() });
        }
        self.require_parent_dir(&entries, &key, path)?;

        match (entries.get_mut(&key), offset) {
            (Some(entry), offset) => {
                if entry.permissions.readonly() {
                    return Err(FsError::PermissionDenied {
                        path: path.clone(),
                        operation: "write_file",
                    });
                }
                let Node::File(content) = &mut entry.node else {
                    return Err(FsError::NotAFile { path: path.clone() });
                };
                match offset {
                    None => *content = data.to_vec(),
                    Some(offset) => {
                        let start = usize::try_from(offset).map_err(|_| FsError::InvalidData {
                            path: path.clone(),
                            details: format!("offset {offset} out of range"),
                        })?;
                        if content.len() < start + data.len() {
                            content.resize(start + data.len(), 0);
                        }
                        content[start..start + data.len()].copy_from_slice(data);
                    }
                }
                entry.modified = SystemTime::now();
            }
            (None, None) => {
                entries.insert(key, Entry::file(data.to_vec()));
            }
            (None, Some(_)) => return Err(FsError::NotFound { path: path.clone() }),
        }
        Ok(data.len() as u64)
    }

    fn remove_file(&self, path: &FilePath) -> Result<(), FsError> {
        self.check("remove_file", path)?;
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(path), false, path)?;
        match entries.get(&key).map(|e| &e.node) {
            Some(Node::Dir) => Err(FsError::NotAFile { path: path.clone() }),
            Some(_) => {
                entries.remove(&key);
                Ok(())
            }
            None if self.is_root(&key) => Err(FsError::NotAFile { path: path.clone() }),
            None => Err(FsError::NotFound { path: path.clone() }),
        }
    }

    fn remove_recursively(&self, path: &FilePath) -> Result<(), FsError> {
        self.check("remove_recursively", path)?;
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(path), false, path)?;
        if self.is_root(&key) {
            return Err(FsError::PermissionDenied {
                path: path.clone(),
                operation: "remove_recursively",
            });
        }
        if entries.remove(&key).is_none() {
            return Err(FsError::NotFound { path: path.clone() });
        }
        for child in Self::descendants(&entries, &key) {
            entries.remove(&child);
        }
        Ok(())
    }

    fn copy_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        self.check("copy_file", from)?;
        let mut entries = self.write_entries();
        let src = self.resolve(&entries, &self.key(from), true, from)?;
        let entry = match entries.get(&src) {
            Some(entry @ Entry { node: Node::File(_), .. }) => entry.clone(),
            Some(_) => return Err(FsError::NotAFile { path: from.clone() }),
            None => return Err(FsError::NotFound { path: from.clone() }),
        };
        let dst = self.resolve(&entries, &self.key(to), true, to)?;
        self.require_parent_dir(&entries, &dst, to)?;
        if matches!(entries.get(&dst).map(|e| &e.node), Some(Node::Dir)) || self.is_root(&dst) {
            return Err(FsError::NotAFile { path: to.clone() });
        }
        entries.insert(
            dst,
            Entry {
                modified: SystemTime::now(),
                ..entry
            },
        );
        Ok(())
    }

    fn rename_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        self.check("rename_file", from)?;
        let mut entries = self.write_entries();
        let src = self.resolve(&entries, &self.key(from), false, from)?;
        if !entries.contains_key(&src) {
            return Err(FsError::NotFound { path: from.clone() });
        }
        let dst = self.resolve(&entries, &self.key(to), false, to)?;
        if src == dst {
            return Ok(());
        }
        if dst.starts_with(&format!("{src}/")) || self.is_root(&dst) {
            return Err(FsError::InvalidData {
                path: to.clone(),
                details: format!("cannot move {from} into itself"),
            });
        }
        self.require_parent_dir(&entries, &dst, to)?;
        if matches!(entries.get(&dst).map(|e| &e.node), Some(Node::Dir))
            && !Self::descendants(&entries, &dst).is_empty()
        {
            return Err(FsError::DirectoryNotEmpty { path: to.clone() });
        }

        for child in Self::descendants(&entries, &dst) {
            entries.remove(&child);
        }
        let moved: Vec<String> = Self::descendants(&entries, &src);
        if let Some(entry) = entries.remove(&src) {
            entries.insert(dst.clone(), entry);
        }
        for child in moved {
            if let Some(entry) = entries.remove(&child) {
                let rest = &child[src.len()..];
                entries.insert(format!("{dst}{rest}"), entry);
            }
        }
        Ok(())
    }
}

impl FileDir for MemoryFileAccess {
    fn list_directory(&self, path: &FilePath, filter: &ListFilter) -> Result<ListDirIter, FsError> {
        self.check("list_directory", path)?;
        let entries = self.read_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        match self.lookup(&entries, &key) {
            Some(info) if info.is_dir() => {}
            Some(_) => return Err(FsError::NotADirectory { path: path.clone() }),
            None => return Err(FsError::NotFound { path: path.clone() }),
        }

        let mut out = Vec::new();
        for child in Self::descendants(&entries, &key) {
            let name = child[key.len()..].trim_start_matches('/');
            if name.contains('/') {
                continue;
            }
            let child_path = path.path_appended(name);
            let followed = self
                .resolve(&entries, &child, true, &child_path)
                .unwrap_or_else(|_| child.clone());
            let mut info = self
                .lookup(&entries, &followed)
                .or_else(|| self.lookup(&entries, &child))
                .unwrap_or_default();
            if name.starts_with('.') {
                info = info.with_flag(InfoFlags::HIDDEN);
            }
            if !filter.accepts(name, &info) {
                continue;
            }
            out.push(Ok(DirEntry {
                path: child_path,
                info: filter.with_info.then_some(info),
            }));
        }
        Ok(ListDirIter::from_vec(out))
    }

    fn create_dir(&self, path: &FilePath) -> Result<(), FsError> {
        self.check("create_dir", path)?;
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        if self.is_root(&key) || entries.contains_key(&key) {
            return Err(FsError::AlreadyExists {
                path: path.clone(),
                operation: "create_dir",
            });
        }
        self.require_parent_dir(&entries, &key, path)?;
        entries.insert(key, Entry::dir());
        Ok(())
    }

    fn create_dir_all(&self, path: &FilePath) -> Result<(), FsError> {
        self.check("create_dir_all", path)?;
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        let root_len = self.os.root_length(&key);
        let root = key[..root_len].to_string();
        let mut current = root.clone();
        for segment in key[root_len..].split('/').filter(|s| !s.is_empty()) {
            if current.len() > root.len() {
                current.push('/');
            }
            current.push_str(segment);
            match entries.get(&current).map(|e| &e.node) {
                Some(Node::Dir) => {}
                Some(_) => {
                    return Err(FsError::NotADirectory {
                        path: path.with_new_path(&current),
                    });
                }
                None => {
                    entries.insert(current.clone(), Entry::dir());
                }
            }
        }
        Ok(())
    }
}

impl FileLink for MemoryFileAccess {
    fn create_symlink(&self, target: &FilePath, link: &FilePath) -> Result<(), FsError> {
        self.check("create_symlink", link)?;
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(link), false, link)?;
        if self.is_root(&key) || entries.contains_key(&key) {
            return Err(FsError::AlreadyExists {
                path: link.clone(),
                operation: "create_symlink",
            });
        }
        self.require_parent_dir(&entries, &key, link)?;
        let mut entry = Entry::file(Vec::new());
        entry.node = Node::Symlink(target.path().to_string());
        entry.permissions = Permissions::from_mode(0o777);
        entries.insert(key, entry);
        Ok(())
    }

    fn symlink_target(&self, path: &FilePath) -> Result<FilePath, FsError> {
        self.check("symlink_target", path)?;
        let entries = self.read_entries();
        let key = self.resolve(&entries, &self.key(path), false, path)?;
        match entries.get(&key).map(|e| &e.node) {
            Some(Node::Symlink(target)) => Ok(path.with_new_path(target)),
            Some(_) => Err(FsError::InvalidData {
                path: path.clone(),
                details: "not a symlink".into(),
            }),
            None => Err(FsError::NotFound { path: path.clone() }),
        }
    }

    fn stat_link(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        self.check("stat_link", path)?;
        let entries = self.read_entries();
        let key = self.resolve(&entries, &self.key(path), false, path)?;
        Ok(self.lookup(&entries, &key).unwrap_or_default())
    }
}

impl FilePermissions for MemoryFileAccess {
    fn permissions(&self, path: &FilePath) -> Result<Permissions, FsError> {
        self.check("permissions", path)?;
        let entries = self.read_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        self.lookup(&entries, &key)
            .map(|info| info.permissions())
            .ok_or_else(|| FsError::NotFound { path: path.clone() })
    }

    fn set_permissions(&self, path: &FilePath, permissions: Permissions) -> Result<(), FsError> {
        self.check("set_permissions", path)?;
        let mut entries = self.write_entries();
        let key = self.resolve(&entries, &self.key(path), true, path)?;
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.permissions = permissions;
                Ok(())
            }
            None => Err(FsError::NotFound { path: path.clone() }),
        }
    }
}

impl FileDevice for MemoryFileAccess {
    fn os_type(&self, _path: &FilePath) -> OsType {
        self.os
    }

    fn environment(&self, path: &FilePath) -> Result<Environment, FsError> {
        self.check("environment", path)?;
        Ok(self.environment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileAccessExt;

    fn p(s: &str) -> FilePath {
        FilePath::from_parts("mem", "unit", s)
    }

    fn names(mem: &MemoryFileAccess, dir: &str, filter: &ListFilter) -> Vec<String> {
        mem.list_directory(&p(dir), filter)
            .unwrap()
            .collect_ok()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    #[test]
    fn write_then_read() {
        let mem = MemoryFileAccess::new();
        assert_eq!(mem.write_file(&p("/f.txt"), b"hello world", None).unwrap(), 11);
        assert_eq!(mem.read_all(&p("/f.txt")).unwrap(), b"hello world");
        assert_eq!(mem.read_file(&p("/f.txt"), Some(5), 6).unwrap(), b"world");
        assert_eq!(mem.read_file(&p("/f.txt"), None, 100).unwrap(), b"");
    }

    #[test]
    fn write_at_offset_patches() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/f"), b"abcdef", None).unwrap();
        mem.write_file(&p("/f"), b"XY", Some(2)).unwrap();
        mem.write_file(&p("/f"), b"!", Some(8)).unwrap();
        assert_eq!(mem.read_all(&p("/f")).unwrap(), b"abXYef\0\0!");
        assert!(mem.write_file(&p("/missing"), b"x", Some(0)).is_err());
    }

    #[test]
    fn write_needs_parent() {
        let mem = MemoryFileAccess::new();
        let err = mem.write_file(&p("/no/such/file"), b"x", None).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn stat_missing_is_not_an_error() {
        let mem = MemoryFileAccess::new();
        assert!(!mem.stat(&p("/nothing")).unwrap().exists());
        assert!(mem.stat(&p("/")).unwrap().is_root());
    }

    #[test]
    fn directories_and_listing() {
        let mem = MemoryFileAccess::new();
        mem.create_dir_all(&p("/src/deep")).unwrap();
        mem.write_file(&p("/src/b.rs"), b"", None).unwrap();
        mem.write_file(&p("/src/a.txt"), b"", None).unwrap();
        mem.write_file(&p("/src/.hidden"), b"", None).unwrap();
        assert_eq!(
            names(&mem, "/src", &ListFilter::all()),
            [".hidden", "a.txt", "b.rs", "deep"]
        );
        assert_eq!(names(&mem, "/src", &ListFilter::dirs()), ["deep"]);
        let rs = ListFilter::files().with_name_filters(&["*.rs"]).unwrap();
        assert_eq!(names(&mem, "/src", &rs), ["b.rs"]);
        assert_eq!(
            names(&mem, "/src", &ListFilter::files().without_hidden()),
            ["a.txt", "b.rs"]
        );
    }

    #[test]
    fn listing_attaches_info_on_request() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/x"), b"123", None).unwrap();
        let entries = mem
            .list_directory(&p("/"), &ListFilter::all().with_info())
            .unwrap()
            .collect_all()
            .unwrap();
        assert_eq!(entries[0].info.map(|i| i.size), Some(3));
        assert_eq!(entries[0].path, p("/x"));
    }

    #[test]
    fn create_dir_errors() {
        let mem = MemoryFileAccess::new();
        mem.create_dir(&p("/a")).unwrap();
        assert!(matches!(
            mem.create_dir(&p("/a")),
            Err(FsError::AlreadyExists { .. })
        ));
        assert!(matches!(
            mem.create_dir(&p("/x/y")),
            Err(FsError::NotFound { .. })
        ));
        mem.write_file(&p("/file"), b"", None).unwrap();
        assert!(matches!(
            mem.create_dir_all(&p("/file/sub")),
            Err(FsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn remove_and_remove_recursively() {
        let mem = MemoryFileAccess::new();
        mem.create_dir_all(&p("/d/e")).unwrap();
        mem.write_file(&p("/d/e/f"), b"", None).unwrap();
        assert!(matches!(mem.remove_file(&p("/d")), Err(FsError::NotAFile { .. })));
        mem.remove_file(&p("/d/e/f")).unwrap();
        assert!(!mem.exists(&p("/d/e/f")).unwrap());
        mem.write_file(&p("/d/e/g"), b"", None).unwrap();
        mem.remove_recursively(&p("/d")).unwrap();
        assert!(mem.is_empty());
        assert!(matches!(
            mem.remove_recursively(&p("/d")),
            Err(FsError::NotFound { .. })
        ));
    }

    #[test]
    fn rename_moves_subtree() {
        let mem = MemoryFileAccess::new();
        mem.create_dir_all(&p("/old/sub")).unwrap();
        mem.write_file(&p("/old/sub/f"), b"1", None).unwrap();
        mem.rename_file(&p("/old"), &p("/new")).unwrap();
        assert!(!mem.exists(&p("/old")).unwrap());
        assert_eq!(mem.read_all(&p("/new/sub/f")).unwrap(), b"1");
        assert!(mem.rename_file(&p("/new"), &p("/new/sub/x")).is_err());
    }

    #[test]
    fn rename_replaces_file() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/a"), b"new", None).unwrap();
        mem.write_file(&p("/b"), b"old", None).unwrap();
        mem.rename_file(&p("/a"), &p("/b")).unwrap();
        assert_eq!(mem.read_all(&p("/b")).unwrap(), b"new");
        assert_eq!(mem.len(), 1);
    }

    #[test]
    fn copy_keeps_permissions() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/a"), b"x", None).unwrap();
        mem.set_permissions(&p("/a"), Permissions::from_mode(0o755)).unwrap();
        mem.copy_file(&p("/a"), &p("/b")).unwrap();
        assert_eq!(mem.permissions(&p("/b")).unwrap().mode(), 0o755);
        assert_eq!(mem.read_all(&p("/b")).unwrap(), b"x");
    }

    #[test]
    fn readonly_file_rejects_write() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/ro"), b"x", None).unwrap();
        mem.set_permissions(&p("/ro"), Permissions::from_mode(0o444)).unwrap();
        assert!(matches!(
            mem.write_file(&p("/ro"), b"y", None),
            Err(FsError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn symlinks_are_followed_for_io_but_not_stat_link() {
        let mem = MemoryFileAccess::new();
        mem.create_dir(&p("/real")).unwrap();
        mem.write_file(&p("/real/f"), b"data", None).unwrap();
        mem.create_symlink(&p("/real"), &p("/link")).unwrap();
        assert_eq!(mem.read_all(&p("/link/f")).unwrap(), b"data");
        assert!(mem.stat(&p("/link")).unwrap().is_dir());
        assert!(mem.stat_link(&p("/link")).unwrap().is_symlink());
        assert_eq!(mem.symlink_target(&p("/link")).unwrap(), p("/real"));
        mem.remove_file(&p("/link")).unwrap();
        assert!(mem.exists(&p("/real/f")).unwrap());
    }

    #[test]
    fn symlink_loop_reports_error() {
        let mem = MemoryFileAccess::new();
        mem.create_symlink(&p("/b"), &p("/a")).unwrap();
        mem.create_symlink(&p("/a"), &p("/b")).unwrap();
        assert!(matches!(mem.stat(&p("/a")), Err(FsError::SymlinkLoop { .. })));
    }

    #[test]
    fn injected_failures() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/a"), b"", None).unwrap();
        mem.fail_operation_after("rename_file", 1);
        mem.rename_file(&p("/a"), &p("/b")).unwrap();
        let err = mem.rename_file(&p("/b"), &p("/c")).unwrap_err();
        assert!(matches!(err, FsError::IoFailure { .. }));
        mem.clear_failures();
        mem.rename_file(&p("/b"), &p("/c")).unwrap();
    }

    #[test]
    fn one_shot_failure_recovers() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/a"), b"", None).unwrap();
        mem.fail_operation_once_after("stat", 1);
        mem.stat(&p("/a")).unwrap();
        assert!(mem.stat(&p("/a")).is_err());
        mem.stat(&p("/a")).unwrap();
        mem.stat(&p("/a")).unwrap();
    }

    #[test]
    fn windows_device_roots() {
        let mem = MemoryFileAccess::with_os(OsType::Windows);
        mem.create_dir_all(&p("C:/Users/me")).unwrap();
        mem.write_file(&p("C:/Users/me/x.txt"), b"1", None).unwrap();
        assert!(mem.is_file(&p("C:/Users/me/x.txt")).unwrap());
        assert!(mem.is_dir(&p("C:/")).unwrap());
        assert_eq!(mem.os_type(&p("C:/")), OsType::Windows);
    }

    #[test]
    fn modification_time_override() {
        let mem = MemoryFileAccess::new();
        mem.write_file(&p("/f"), b"", None).unwrap();
        mem.set_modified(&p("/f"), SystemTime::UNIX_EPOCH).unwrap();
        assert_eq!(mem.stat(&p("/f")).unwrap().last_modified, SystemTime::UNIX_EPOCH);
    }
}
