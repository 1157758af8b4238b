//! # File Access Traits
//!
//! The capability interface every file access back end implements.
//!
//! ## Trait Layers
//!
//! ```text
//! FileRead + FileWrite + FileDir                  = FileAccess
//! FileAccess + FileLink + FilePermissions + FileDevice = DeviceFileAccess
//! ```
//!
//! ## Quick Reference
//!
//! | Composite Trait | Component Traits | Use Case |
//! |-----------------|------------------|----------|
//! | [`FileAccess`] | [`FileRead`], [`FileWrite`], [`FileDir`] | Plain file I/O |
//! | [`DeviceFileAccess`] | + [`FileLink`], [`FilePermissions`], [`FileDevice`] | Anything the [`BackendRegistry`](crate::BackendRegistry) routes to |
//!
//! ## Blanket Implementations
//!
//! Both composite traits have blanket implementations. Implement the component
//! traits and the composite comes for free.
//!
//! ## Paths
//!
//! Every method receives the full [`FilePath`](crate::FilePath), scheme and host
//! included. A back end registered for one device only looks at
//! [`FilePath::path`](crate::FilePath::path); one registered for a whole scheme
//! uses the host to pick the device.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`; back ends use
//! interior mutability for their state.
//!
//! ## Object Safety
//!
//! All traits are object-safe. The registry stores back ends as
//! `Arc<dyn DeviceFileAccess>`:
//!
//! ```rust
//! use devpath::{DeviceFileAccess, FilePath};
//!
//! fn size_of(access: &dyn DeviceFileAccess, path: &FilePath) -> u64 {
//!     access.stat(path).map(|info| info.size).unwrap_or(0)
//! }
//! ```

mod file_device;
mod file_dir;
mod file_link;
mod file_permissions;
mod file_read;
mod file_write;

pub use file_device::FileDevice;
pub use file_dir::{FileDir, ListDirIter};
pub use file_link::FileLink;
pub use file_permissions::FilePermissions;
pub use file_read::FileRead;
pub use file_write::FileWrite;

/// Basic file access: reading, writing and directory operations.
///
/// Automatically implemented for any type that implements the three component traits.
///
/// # Example
///
/// ```rust
/// use devpath::{FileAccess, FilePath, FsError};
///
/// fn backup_file<B: FileAccess>(access: &B, src: &FilePath, dst: &FilePath) -> Result<(), FsError> {
///     let data = access.read_file(src, None, 0)?;
///     access.create_dir_all(&dst.parent_dir())?;
///     access.write_file(dst, &data, None)?;
///     Ok(())
/// }
/// ```
pub trait FileAccess: FileRead + FileWrite + FileDir {}

impl<T: FileRead + FileWrite + FileDir> FileAccess for T {}

/// Everything the registry needs from a back end.
///
/// Extends [`FileAccess`] with symlinks ([`FileLink`]), permissions
/// ([`FilePermissions`]) and device facts ([`FileDevice`]).
///
/// Automatically implemented for any type implementing all component traits.
pub trait DeviceFileAccess: FileAccess + FileLink + FilePermissions + FileDevice {}

impl<T: FileAccess + FileLink + FilePermissions + FileDevice> DeviceFileAccess for T {}

// ============================================================================
// Shared handles
// ============================================================================

// `Arc<T>` forwards every call, so `Arc<dyn DeviceFileAccess>` can itself be
// wrapped in middleware such as `CachedAccess`.

use std::sync::Arc;

use crate::{Environment, FilePath, FilePathInfo, FsError, ListFilter, OsType, Permissions};

impl<T: FileRead + ?Sized> FileRead for Arc<T> {
    fn exists(&self, path: &FilePath) -> Result<bool, FsError> {
        (**self).exists(path)
    }

    fn stat(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        (**self).stat(path)
    }

    fn read_file(
        &self,
        path: &FilePath,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<u8>, FsError> {
        (**self).read_file(path, limit, offset)
    }
}

impl<T: FileWrite + ?Sized> FileWrite for Arc<T> {
    fn write_file(
        &self,
        path: &FilePath,
        data: &[u8],
        offset: Option<u64>,
    ) -> Result<u64, FsError> {
        (**self).write_file(path, data, offset)
    }

    fn remove_file(&self, path: &FilePath) -> Result<(), FsError> {
        (**self).remove_file(path)
    }

    fn remove_recursively(&self, path: &FilePath) -> Result<(), FsError> {
        (**self).remove_recursively(path)
    }

    fn copy_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        (**self).copy_file(from, to)
    }

    fn rename_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        (**self).rename_file(from, to)
    }
}

impl<T: FileDir + ?Sized> FileDir for Arc<T> {
    fn list_directory(&self, path: &FilePath, filter: &ListFilter) -> Result<ListDirIter, FsError> {
        (**self).list_directory(path, filter)
    }

    fn create_dir(&self, path: &FilePath) -> Result<(), FsError> {
        (**self).create_dir(path)
    }

    fn create_dir_all(&self, path: &FilePath) -> Result<(), FsError> {
        (**self).create_dir_all(path)
    }
}

impl<T: FileLink + ?Sized> FileLink for Arc<T> {
    fn create_symlink(&self, target: &FilePath, link: &FilePath) -> Result<(), FsError> {
        (**self).create_symlink(target, link)
    }

    fn symlink_target(&self, path: &FilePath) -> Result<FilePath, FsError> {
        (**self).symlink_target(path)
    }

    fn stat_link(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        (**self).stat_link(path)
    }
}

impl<T: FilePermissions + ?Sized> FilePermissions for Arc<T> {
    fn permissions(&self, path: &FilePath) -> Result<Permissions, FsError> {
        (**self).permissions(path)
    }

    fn set_permissions(&self, path: &FilePath, permissions: Permissions) -> Result<(), FsError> {
        (**self).set_permissions(path, permissions)
    }
}

impl<T: FileDevice + ?Sized> FileDevice for Arc<T> {
    fn os_type(&self, path: &FilePath) -> OsType {
        (**self).os_type(path)
    }

    fn environment(&self, path: &FilePath) -> Result<Environment, FsError> {
        (**self).environment(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_access_is_object_safe() {
        fn _check(_: &dyn FileAccess) {}
    }

    #[test]
    fn device_file_access_is_object_safe() {
        fn _check(_: &dyn DeviceFileAccess) {}
    }

    #[test]
    fn arc_dyn_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<std::sync::Arc<dyn DeviceFileAccess>>();
    }

    #[test]
    fn arc_dyn_is_itself_a_device_access() {
        fn _check<T: DeviceFileAccess>() {}
        _check::<Arc<dyn DeviceFileAccess>>();
    }
}
