//! Facts about the device a back end serves.

use crate::{Environment, FilePath, FsError, OsType};

/// Device-level information.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FileDevice`.
pub trait FileDevice: Send + Sync {
    /// OS family of the device that owns `path`.
    fn os_type(&self, path: &FilePath) -> OsType;

    /// Environment a shell on the device of `path` would see.
    ///
    /// # Errors
    ///
    /// - [`FsError::IoFailure`] if the device cannot be queried
    fn environment(&self, path: &FilePath) -> Result<Environment, FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_device_is_object_safe() {
        fn _check(_: &dyn FileDevice) {}
    }
}
