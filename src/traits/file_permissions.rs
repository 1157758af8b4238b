//! Permission management operations.

use crate::{FilePath, FsError, Permissions};

/// Permission management operations.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FilePermissions`.
pub trait FilePermissions: Send + Sync {
    /// Current permissions of `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn permissions(&self, path: &FilePath) -> Result<Permissions, FsError>;

    /// Set permissions on a file or directory.
    ///
    /// Back ends without a permission model may ignore the request.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn set_permissions(&self, path: &FilePath, permissions: Permissions) -> Result<(), FsError>;
}
