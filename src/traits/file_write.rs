//! Write operations.

use crate::{FilePath, FsError};

/// Write operations of a file access back end.
///
/// Callers that go through the [`BackendRegistry`](crate::BackendRegistry)
/// get stat cache invalidation for free; back ends do not need to know about
/// the cache.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FileWrite`.
pub trait FileWrite: Send + Sync {
    /// Write `data` to `path`, returning the number of bytes written.
    ///
    /// With `offset: None` the file is created or truncated. With an offset the
    /// existing file is patched in place and must exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory (or, with an offset, the file) is missing
    /// - [`FsError::NotAFile`] if `path` is a directory
    /// - [`FsError::PermissionDenied`] if write access is denied
    fn write_file(&self, path: &FilePath, data: &[u8], offset: Option<u64>) -> Result<u64, FsError>;

    /// Remove a file or symlink.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    fn remove_file(&self, path: &FilePath) -> Result<(), FsError>;

    /// Remove a file, or a directory with all its contents.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn remove_recursively(&self, path: &FilePath) -> Result<(), FsError>;

    /// Copy a file on the same device, overwriting `to`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `from` does not exist
    /// - [`FsError::NotAFile`] if `from` is a directory
    fn copy_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError>;

    /// Rename or move a file or directory on the same device, replacing `to`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `from` does not exist
    fn rename_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError>;
}
