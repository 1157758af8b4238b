//! File system operations on [`FilePath`].
//!
//! Every method here resolves the back end through
//! [`BackendRegistry::global`], so the same call works for local paths and for
//! any registered device. Predicates such as [`FilePath::exists`] answer `false`
//! when the back end fails; everything else returns `Result`.
//!
//! ```rust
//! use devpath::FilePath;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = FilePath::from_std_path(dir.path()).path_appended("notes.txt");
//! assert!(!file.exists());
//! file.write_file_contents(b"hello", None).unwrap();
//! assert_eq!(file.file_contents(None, 0).unwrap(), b"hello");
//! assert_eq!(file.file_size().unwrap(), 5);
//! ```

use std::time::SystemTime;

use crate::{
    BackendRegistry, DirEntry, Environment, FileAccessExt, FileDevice, FileDir, FilePath,
    FilePathInfo, FilePermissions, FileRead, FileWrite, FsError, IterativeResolver, ListFilter,
    OsType, PathResolver, Permissions, SharedAccess,
};

impl FilePath {
    fn access(&self) -> Result<SharedAccess, FsError> {
        BackendRegistry::global().resolve(self)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns `true` if the path exists. Empty paths never exist.
    pub fn exists(&self) -> bool {
        !self.is_empty() && self.access().and_then(|a| a.exists(self)).unwrap_or(false)
    }

    /// Returns `true` if the path is a regular file (after following symlinks).
    pub fn is_file(&self) -> bool {
        self.info().map(|i| i.is_file()).unwrap_or(false)
    }

    /// Returns `true` if the path is a directory (after following symlinks).
    pub fn is_dir(&self) -> bool {
        self.info().map(|i| i.is_dir()).unwrap_or(false)
    }

    /// Returns `true` if the path is a file with an execute bit.
    pub fn is_executable_file(&self) -> bool {
        self.access().and_then(|a| a.is_executable(self)).unwrap_or(false)
    }

    /// Returns `true` if the path is a directory the owner may write to.
    pub fn is_writable_dir(&self) -> bool {
        self.info()
            .map(|i| i.is_dir() && !i.permissions().readonly())
            .unwrap_or(false)
    }

    /// Stat snapshot, possibly served from the registry's cache.
    pub fn info(&self) -> Result<FilePathInfo, FsError> {
        if self.is_empty() {
            return Ok(FilePathInfo::not_found());
        }
        self.access()?.stat(self)
    }

    /// Size in bytes.
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] if the path does not exist.
    pub fn file_size(&self) -> Result<u64, FsError> {
        self.access()?.file_size(self)
    }

    /// Last modification time.
    pub fn last_modified(&self) -> Result<SystemTime, FsError> {
        let info = self.info()?;
        if !info.exists() {
            return Err(FsError::NotFound { path: self.clone() });
        }
        Ok(info.last_modified)
    }

    /// Permission bits.
    pub fn permissions(&self) -> Result<Permissions, FsError> {
        self.access()?.permissions(self)
    }

    /// OS family of the device owning this path.
    pub fn device_os_type(&self) -> OsType {
        if self.is_local() {
            return OsType::host();
        }
        self.access().map(|a| a.os_type(self)).unwrap_or_else(|_| self.os_type())
    }

    /// Environment of the device owning this path.
    pub fn device_environment(&self) -> Result<Environment, FsError> {
        if self.is_local() {
            return Ok(Environment::system());
        }
        self.access()?.environment(self)
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Read up to `limit` bytes starting at `offset`; `None` reads to the end.
    pub fn file_contents(&self, limit: Option<u64>, offset: u64) -> Result<Vec<u8>, FsError> {
        self.access()?.read_file(self, limit, offset)
    }

    /// Write `data`, replacing the file when `offset` is `None` and patching it otherwise.
    ///
    /// This is a plain write; use [`SaveFile`](crate::SaveFile) when a crash must
    /// never leave the file half written.
    pub fn write_file_contents(&self, data: &[u8], offset: Option<u64>) -> Result<u64, FsError> {
        self.access()?.write_file(self, data, offset)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Create this directory and any missing parents.
    pub fn create_dir(&self) -> Result<(), FsError> {
        self.access()?.create_dir_all(self)
    }

    /// Make sure this is a writable directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if something else occupies the path
    /// - [`FsError::PermissionDenied`] if the directory exists but is read-only
    pub fn ensure_writable_dir(&self) -> Result<(), FsError> {
        let info = self.info()?;
        if !info.exists() {
            return self.create_dir();
        }
        if !info.is_dir() {
            return Err(FsError::NotADirectory { path: self.clone() });
        }
        if info.permissions().readonly() {
            return Err(FsError::PermissionDenied {
                path: self.clone(),
                operation: "ensure_writable_dir",
            });
        }
        Ok(())
    }

    /// Remove a file or an empty directory.
    pub fn remove_file(&self) -> Result<(), FsError> {
        self.access()?.remove_file(self)
    }

    /// Remove a file or a whole directory tree.
    ///
    /// Refuses to remove a root directory.
    pub fn remove_recursively(&self) -> Result<(), FsError> {
        if self.is_root_path() {
            return Err(FsError::PermissionDenied {
                path: self.clone(),
                operation: "remove_recursively",
            });
        }
        self.access()?.remove_recursively(self)
    }

    /// Copy this file to `target`, which may be on another device.
    pub fn copy_file(&self, target: &FilePath) -> Result<(), FsError> {
        if self.is_same_device(target) {
            return self.access()?.copy_file(self, target);
        }
        let source = self.access()?;
        let data = source.read_file(self, None, 0)?;
        let permissions = source.permissions(self)?;
        let destination = target.access()?;
        destination.write_file(target, &data, None)?;
        // Not every device can represent the source's mode bits.
        if let Err(err) = destination.set_permissions(target, permissions) {
            tracing::debug!(
                path = %target,
                error = %err,
                "could not carry permissions across devices"
            );
        }
        Ok(())
    }

    /// Move this file or directory to `target`.
    ///
    /// Across devices a file is copied and the source removed afterwards.
    pub fn rename_file(&self, target: &FilePath) -> Result<(), FsError> {
        if self.is_same_device(target) {
            return self.access()?.rename_file(self, target);
        }
        if !self.is_file() {
            return Err(FsError::NotSupported {
                operation: "rename_file across devices for directories",
            });
        }
        self.copy_file(target)?;
        self.remove_file()
    }

    /// Replace the permission bits.
    pub fn set_permissions(&self, permissions: Permissions) -> Result<(), FsError> {
        self.access()?.set_permissions(self, permissions)
    }

    // ------------------------------------------------------------------
    // Links and directories
    // ------------------------------------------------------------------

    /// Raw target of this symlink, on the same device.
    pub fn symlink_target(&self) -> Result<FilePath, FsError> {
        self.access()?.symlink_target(self)
    }

    /// This path with every symlink resolved and `.`/`..` removed.
    pub fn canonical_path(&self) -> Result<FilePath, FsError> {
        let access = self.access()?;
        IterativeResolver.canonicalize(self, access.as_ref())
    }

    /// Readable entries of this directory that pass `filter`.
    ///
    /// Entries that fail to load are logged and skipped.
    pub fn dir_entries(&self, filter: &ListFilter) -> Result<Vec<DirEntry>, FsError> {
        let mut entries = Vec::new();
        for entry in self.access()?.list_directory(self, filter)? {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(err) => tracing::debug!(dir = %self, error = %err, "skipping unreadable entry"),
            }
        }
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Executable lookup
    // ------------------------------------------------------------------

    fn executable_accepted(candidate: &FilePath) -> bool {
        match candidate.device_os_type() {
            OsType::Windows => candidate.is_file(),
            _ => candidate.is_executable_file(),
        }
    }

    /// Find the executable named by this path in `additional_dirs` and then in
    /// the `PATH` of its device.
    ///
    /// An absolute path is only checked in place.
    pub fn search_in_path(&self, additional_dirs: &[FilePath]) -> Option<FilePath> {
        let environment = self.device_environment().ok()?;
        environment.search_in_path(self.path(), self, additional_dirs, Self::executable_accepted)
    }

    /// Find the executable named by this path in `directories` only.
    pub fn search_in_directories(&self, directories: &[FilePath]) -> Option<FilePath> {
        let environment = self.device_environment().ok()?;
        environment.search_in_directories(self.path(), directories, Self::executable_accepted)
    }

    // ------------------------------------------------------------------
    // Device hooks
    // ------------------------------------------------------------------

    /// Human-readable name of the device owning this path.
    pub fn display_name(&self) -> String {
        BackendRegistry::global().display_name(self)
    }

    /// Returns `true` if both paths live on the same device.
    pub fn is_same_device(&self, other: &FilePath) -> bool {
        BackendRegistry::global().is_same_device(self, other)
    }

    /// A local file with the same content as this one, if the device provides one.
    pub fn local_source(&self) -> Option<FilePath> {
        BackendRegistry::global().local_source(self)
    }

    /// Open a terminal in this directory with the device's environment.
    pub fn open_terminal(&self) -> Result<(), FsError> {
        let environment = self.device_environment()?;
        BackendRegistry::global().open_terminal(self, &environment)
    }
}
