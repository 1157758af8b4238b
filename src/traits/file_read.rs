//! Read operations.

use crate::{FilePath, FilePathInfo, FsError};

/// Read operations of a file access back end.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FileRead`.
pub trait FileRead: Send + Sync {
    /// Check if a path exists.
    ///
    /// Returns `Ok(false)` for missing paths. Only returns an error for
    /// unexpected failures (e.g., I/O errors on a remote transport).
    fn exists(&self, path: &FilePath) -> Result<bool, FsError> {
        Ok(self.stat(path)?.exists())
    }

    /// Stat snapshot of `path`, following symlinks.
    ///
    /// A missing path yields a snapshot without
    /// [`InfoFlags::EXISTS`](crate::InfoFlags::EXISTS) rather than an error so that
    /// negative results can be cached.
    fn stat(&self, path: &FilePath) -> Result<FilePathInfo, FsError>;

    /// Read up to `limit` bytes starting at `offset`.
    ///
    /// `None` reads to the end of the file. Reading past the end returns an
    /// empty buffer.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    /// - [`FsError::PermissionDenied`] if read access is denied
    fn read_file(
        &self,
        path: &FilePath,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<u8>, FsError>;
}
