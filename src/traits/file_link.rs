//! Symlink operations.

use crate::{FilePath, FilePathInfo, FsError};

/// Symlink operations.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FileLink`.
pub trait FileLink: Send + Sync {
    /// Create a symbolic link at `link` pointing to `target`.
    ///
    /// `target` is stored as given (only its `path()` part) and need not exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `link` already exists
    /// - [`FsError::NotFound`] if the parent of `link` does not exist
    fn create_symlink(&self, target: &FilePath, link: &FilePath) -> Result<(), FsError>;

    /// Read the raw target of a symbolic link, on the same device as `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::InvalidData`] if `path` is not a symlink
    fn symlink_target(&self, path: &FilePath) -> Result<FilePath, FsError>;

    /// Stat snapshot without following a final symlink.
    ///
    /// Like [`FileRead::stat`](super::FileRead::stat), a missing path yields a
    /// snapshot without the `EXISTS` flag.
    fn stat_link(&self, path: &FilePath) -> Result<FilePathInfo, FsError>;
}
