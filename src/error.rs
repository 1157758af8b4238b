//! Error types for device file access.

use crate::FilePath;

/// File access error type with contextual variants.
///
/// All variants include the path and, where useful, the operation that failed.
/// Uses `#[non_exhaustive]` for forward compatibility. Use [`FsError::kind`] to
/// match on the error category without destructuring.
///
/// # Examples
///
/// ```rust
/// use devpath::{ErrorKind, FilePath, FsError};
///
/// let err = FsError::NotFound { path: FilePath::from_string("/missing") };
/// assert!(err.to_string().contains("/missing"));
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/File Errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: FilePath,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: FilePath,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a file but found something else.
    #[error("not a file: {path}")]
    NotAFile {
        /// The path that is not a file.
        path: FilePath,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: FilePath,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: FilePath,
    },

    /// Symlink chain too long or circular.
    #[error("symlink loop detected: {path}")]
    SymlinkLoop {
        /// The path whose resolution looped.
        path: FilePath,
    },

    // Permission/Access Errors
    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: FilePath,
        /// The operation that was denied.
        operation: &'static str,
    },

    // Routing Errors
    /// No back end is registered for the path's scheme and host.
    #[error("no file access registered for {scheme}://{host}")]
    BackendUnavailable {
        /// The unmatched scheme.
        scheme: String,
        /// The unmatched host.
        host: String,
    },

    /// Operation is not supported by this back end.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    // Data Errors
    /// Invalid data encountered.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path with invalid data.
        path: FilePath,
        /// Details about the invalid data.
        details: String,
    },

    /// A search or filter pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    // Watch Errors
    /// The watch ceiling for the process has been reached.
    #[error("too many watches: limit {limit} reached while adding {path}")]
    TooManyWatches {
        /// The path that could not be watched.
        path: FilePath,
        /// The configured ceiling.
        limit: usize,
    },

    // Save Errors
    /// The existing target of a save cannot be written.
    #[error("target not writable: {path}")]
    TargetNotWritable {
        /// The save target.
        path: FilePath,
    },

    /// No temporary file could be created next to a save target.
    #[error("cannot create temporary file for {path}: {reason}")]
    TempFileCreationFailed {
        /// The save target.
        path: FilePath,
        /// OS error text.
        reason: String,
    },

    /// Replacing the save target failed.
    #[error("cannot commit {path}: {reason}")]
    CommitIoFailure {
        /// The save target.
        path: FilePath,
        /// OS error text.
        reason: String,
    },

    // I/O Errors
    /// Back end failure described by text, e.g. a remote transport error or timeout.
    #[error("I/O failure on {path}: {reason}")]
    IoFailure {
        /// The path involved in the operation.
        path: FilePath,
        /// Description of the failure.
        reason: String,
    },

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: FilePath,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Flat error category of an [`FsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// [`FsError::NotFound`].
    NotFound,
    /// [`FsError::AlreadyExists`].
    AlreadyExists,
    /// [`FsError::NotAFile`].
    NotAFile,
    /// [`FsError::NotADirectory`].
    NotADirectory,
    /// [`FsError::DirectoryNotEmpty`].
    DirectoryNotEmpty,
    /// [`FsError::SymlinkLoop`].
    SymlinkLoop,
    /// [`FsError::PermissionDenied`].
    PermissionDenied,
    /// [`FsError::BackendUnavailable`].
    BackendUnavailable,
    /// [`FsError::NotSupported`].
    NotSupported,
    /// [`FsError::InvalidData`].
    InvalidData,
    /// [`FsError::InvalidPattern`].
    InvalidPattern,
    /// [`FsError::TooManyWatches`].
    TooManyWatches,
    /// [`FsError::TargetNotWritable`].
    TargetNotWritable,
    /// [`FsError::TempFileCreationFailed`].
    TempFileCreationFailed,
    /// [`FsError::CommitIoFailure`].
    CommitIoFailure,
    /// [`FsError::IoFailure`] and [`FsError::Io`].
    IoFailure,
}

impl FsError {
    /// The error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound { .. } => ErrorKind::NotFound,
            FsError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            FsError::NotAFile { .. } => ErrorKind::NotAFile,
            FsError::NotADirectory { .. } => ErrorKind::NotADirectory,
            FsError::DirectoryNotEmpty { .. } => ErrorKind::DirectoryNotEmpty,
            FsError::SymlinkLoop { .. } => ErrorKind::SymlinkLoop,
            FsError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FsError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            FsError::NotSupported { .. } => ErrorKind::NotSupported,
            FsError::InvalidData { .. } => ErrorKind::InvalidData,
            FsError::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            FsError::TooManyWatches { .. } => ErrorKind::TooManyWatches,
            FsError::TargetNotWritable { .. } => ErrorKind::TargetNotWritable,
            FsError::TempFileCreationFailed { .. } => ErrorKind::TempFileCreationFailed,
            FsError::CommitIoFailure { .. } => ErrorKind::CommitIoFailure,
            FsError::IoFailure { .. } | FsError::Io { .. } => ErrorKind::IoFailure,
        }
    }

    /// Map an OS error for `operation` on `path` to the most specific variant.
    pub fn from_io(operation: &'static str, path: &FilePath, error: std::io::Error) -> Self {
        let path = path.clone();
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied { path, operation },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path, operation },
            std::io::ErrorKind::NotADirectory => FsError::NotADirectory { path },
            std::io::ErrorKind::IsADirectory => FsError::NotAFile { path },
            std::io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty { path },
            _ => FsError::Io {
                operation,
                path,
                source: error,
            },
        }
    }

    /// Returns `true` for failures that should skip one file rather than abort a bulk operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::PermissionDenied
                | ErrorKind::BackendUnavailable
                | ErrorKind::NotAFile
                | ErrorKind::NotADirectory
                | ErrorKind::InvalidData
                | ErrorKind::SymlinkLoop
                | ErrorKind::IoFailure
        )
    }
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        FsError::from_io("io", &FilePath::new(), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_error_not_found_display() {
        let err = FsError::NotFound {
            path: FilePath::from_string("/missing"),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn fs_error_already_exists_display() {
        let err = FsError::AlreadyExists {
            path: FilePath::from_string("/exists"),
            operation: "create",
        };
        assert_eq!(err.to_string(), "create: already exists: /exists");
    }

    #[test]
    fn backend_unavailable_display() {
        let err = FsError::BackendUnavailable {
            scheme: "docker".into(),
            host: "abc".into(),
        };
        assert_eq!(err.to_string(), "no file access registered for docker://abc");
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }

    #[test]
    fn device_path_in_message_uses_canonical_form() {
        let err = FsError::IoFailure {
            path: FilePath::from_parts("ssh", "srv", "/etc/x"),
            reason: "timed out".into(),
        };
        assert_eq!(err.to_string(), "I/O failure on ssh://srv/etc/x: timed out");
    }

    #[test]
    fn from_io_keeps_context() {
        let path = FilePath::from_string("/a");
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        match FsError::from_io("write", &path, io_err) {
            FsError::PermissionDenied { path: p, operation } => {
                assert_eq!(p, path);
                assert_eq!(operation, "write");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fs_error_from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::NotFound { .. }));
    }

    #[test]
    fn fs_error_from_io_other() {
        let io_err = std::io::Error::other("test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::Io { .. }));
        assert_eq!(fs_err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn recoverable_kinds() {
        let path = FilePath::from_string("/x");
        assert!(FsError::NotFound { path: path.clone() }.is_recoverable());
        assert!(!FsError::CommitIoFailure {
            path,
            reason: String::new()
        }
        .is_recoverable());
    }
}
