//! # Extension Traits
//!
//! Convenience methods for file access back ends.
//!
//! ## Overview
//!
//! [`FileAccessExt`] provides commonly needed helpers that aren't part of the
//! core trait hierarchy. They are default methods with a blanket
//! implementation, so any [`FileAccess`] back end gets them for free.
//!
//! ## Available Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](FileAccessExt::is_file) | Check if path is a regular file |
//! | [`is_dir`](FileAccessExt::is_dir) | Check if path is a directory |
//! | [`is_executable`](FileAccessExt::is_executable) | Check for an executable regular file |
//! | [`file_size`](FileAccessExt::file_size) | Size of an existing file |
//! | [`read_all`](FileAccessExt::read_all) | Whole file contents |
//! | [`read_to_string`](FileAccessExt::read_to_string) | Whole file as UTF-8 |
//! | [`ensure_dir`](FileAccessExt::ensure_dir) | Create a directory tree unless present |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, `read_json` and `write_json` are available
//! through [`FileAccessExtJson`].

use crate::{FileAccess, FilePath, FsError};

/// Extension methods for any file access back end.
///
/// # Example
///
/// ```rust
/// use devpath::{FileAccess, FileAccessExt, FilePath, FsError};
///
/// fn load_if_present<B: FileAccess>(access: &B, path: &FilePath) -> Result<Option<String>, FsError> {
///     if access.is_file(path)? {
///         return access.read_to_string(path).map(Some);
///     }
///     Ok(None)
/// }
/// ```
pub trait FileAccessExt: FileAccess {
    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_file(&self, path: &FilePath) -> Result<bool, FsError> {
        Ok(self.stat(path)?.is_file())
    }

    /// Check if the path points to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_dir(&self, path: &FilePath) -> Result<bool, FsError> {
        Ok(self.stat(path)?.is_dir())
    }

    /// Check if the path is a regular file with an execute bit set.
    fn is_executable(&self, path: &FilePath) -> Result<bool, FsError> {
        let info = self.stat(path)?;
        Ok(info.is_file() && info.permissions().executable())
    }

    /// Get the size of a file in bytes.
    ///
    /// # Errors
    ///
    /// Returns `FsError::NotFound` if the path doesn't exist.
    fn file_size(&self, path: &FilePath) -> Result<u64, FsError> {
        let info = self.stat(path)?;
        if !info.exists() {
            return Err(FsError::NotFound { path: path.clone() });
        }
        Ok(info.size)
    }

    /// Read the whole file.
    fn read_all(&self, path: &FilePath) -> Result<Vec<u8>, FsError> {
        self.read_file(path, None, 0)
    }

    /// Read the whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// - `FsError::InvalidData` if the file isn't valid UTF-8
    fn read_to_string(&self, path: &FilePath) -> Result<String, FsError> {
        let data = self.read_all(path)?;
        String::from_utf8(data).map_err(|e| FsError::InvalidData {
            path: path.clone(),
            details: e.to_string(),
        })
    }

    /// Create `path` and its parents unless it already is a directory.
    fn ensure_dir(&self, path: &FilePath) -> Result<(), FsError> {
        if !self.is_dir(path)? {
            self.create_dir_all(path)?;
        }
        Ok(())
    }
}

impl<B: FileAccess + ?Sized> FileAccessExt for B {}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FileAccessExtJson: FileAccess {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - `FsError::NotFound` if the file doesn't exist
        /// - `FsError::InvalidData` if the content is not valid JSON for `T`
        fn read_json<T: DeserializeOwned>(&self, path: &FilePath) -> Result<T, FsError> {
            let data = self.read_all(path)?;
            serde_json::from_slice(&data).map_err(|e| FsError::InvalidData {
                path: path.clone(),
                details: e.to_string(),
            })
        }

        /// Serialize a value and write it as pretty-printed JSON.
        fn write_json<T: Serialize>(&self, path: &FilePath, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_vec_pretty(value).map_err(|e| FsError::InvalidData {
                path: path.clone(),
                details: e.to_string(),
            })?;
            self.write_file(path, &json, None).map(|_| ())
        }
    }

    impl<B: FileAccess + ?Sized> FileAccessExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FileAccessExtJson;
