//! # devpath
//!
//! One path type for local files and files on other devices, with pluggable
//! file access, directory walking, content search, atomic saving and
//! coordinated file watching on top.
//!
//! ---
//!
//! ## Quick Start
//!
//! A [`FilePath`] is a `(scheme, host, path)` triple. An empty scheme means a
//! local path; anything else is routed through the [`BackendRegistry`] to the
//! [`DeviceFileAccess`] registered for it.
//!
//! ```rust
//! use devpath::{BackendRegistry, FilePath, MemoryFileAccess};
//! use std::sync::Arc;
//!
//! BackendRegistry::global().register("docker", "builder", Arc::new(MemoryFileAccess::new()));
//!
//! let dir = FilePath::from_string("docker://builder/work/src");
//! dir.create_dir().unwrap();
//! let file = dir.path_appended("main.rs");
//! file.write_file_contents(b"fn main() {}", None).unwrap();
//!
//! assert!(file.is_file());
//! assert_eq!(file.file_name(), "main.rs");
//! assert_eq!(file.parent_dir(), dir);
//! assert_eq!(file.to_string(), "docker://builder/work/src/main.rs");
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FilePath`] | Immutable path value with the path algebra (clean, join, relative paths, suffixes) |
//! | [`OsType`] | Per-OS path rules: separators, roots, case sensitivity |
//! | [`DeviceFileAccess`] | Capability interface a back end implements |
//! | [`BackendRegistry`] | Maps `(scheme, host)` to a back end |
//! | [`StatCache`] | Bounded TTL cache of [`FilePathInfo`] snapshots |
//! | [`DirectoryWalker`] | Lazy, cancellable, progress-reporting recursive file enumeration |
//! | [`FileSearch`] | Parallel literal or regex search over file contents |
//! | [`SaveFile`] | Atomic file replacement |
//! | [`WatchCoordinator`] | Shared, reference-counted file and directory watches |
//! | [`FsError`] | Error type with context |
//!
//! ---
//!
//! ## Trait Hierarchy
//!
//! ```text
//! FileRead + FileWrite + FileDir                        = FileAccess
//! FileAccess + FileLink + FilePermissions + FileDevice  = DeviceFileAccess
//! ```
//!
//! Both composite traits have blanket implementations. Implement the component
//! traits and you get the composite for free.
//!
//! ---
//!
//! ## Error Handling
//!
//! All I/O returns `Result<T, FsError>` and errors carry the path involved:
//!
//! ```rust
//! use devpath::{FilePath, FsError};
//!
//! let err = FsError::NotFound { path: FilePath::from_string("/missing.txt") };
//! assert_eq!(err.to_string(), "not found: /missing.txt");
//! ```
//!
//! Parsing never fails: text that is not a path yields an empty [`FilePath`].
//!
//! ---
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. The registry, the stat
//! cache and the watch coordinator are safe to use from any thread.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`FilePath`], [`FilePathInfo`], [`Permissions`], [`FindFlags`], [`SearchResultItem`] and settings values |
//! | `watch-notify` | OS file watching through `notify` (`NotifyWatchFacility`) |

// Private modules
mod cancel;
mod environment;
mod error;
mod ext;
mod file_path;
mod filter;
mod layer;
mod local;
mod memory;
mod os_type;
mod path_io;
mod path_resolver;
mod registry;
mod save_file;
mod search;
mod stat_cache;
mod traits;
mod types;
mod walker;
mod watch;

// Public re-exports - path value and rules
pub use file_path::FilePath;
pub use os_type::{CaseSensitivity, OsType};

// Public re-exports - error types
pub use error::{ErrorKind, FsError};

// Public re-exports - core types
pub use types::{DirEntry, FilePathInfo, FileType, InfoFlags, ListFilter, Permissions};

// Public re-exports - access traits
pub use traits::{
    DeviceFileAccess, FileAccess, FileDevice, FileDir, FileLink, FilePermissions, FileRead,
    FileWrite, ListDirIter,
};

// Public re-exports - back ends and routing
pub use environment::Environment;
pub use local::LocalFileAccess;
pub use memory::MemoryFileAccess;
pub use registry::{BackendRegistry, DeviceHooks, SharedAccess};

// Public re-exports - caching and middleware
pub use layer::{CachedAccess, Layer, LayerExt, StatCacheLayer};
pub use stat_cache::{StatCache, StatCacheConfig, StatCacheStats};

// Public re-exports - path resolution
pub use path_resolver::{IterativeResolver, MAX_SYMLINK_DEPTH, PathResolver};

// Public re-exports - walking and searching
pub use cancel::CancellationToken;
pub use filter::{FileFilter, split_filter_text};
pub use search::{
    FileSearch, FindFlags, Latin1Codec, MAX_LINE_LENGTH, SearchEvent, SearchHandle,
    SearchParameters, SearchResultItem, SearchSummary, TextCodec, Utf8Codec, Utf16Codec,
    codec_for_name, expand_replacement_template, match_case_replacement,
};
pub use walker::{
    DirectoryWalker, FileItem, FileItems, FileIterator, FileListIterator, MAX_PROGRESS,
};

// Public re-exports - saving and watching
pub use save_file::SaveFile;
pub use watch::{
    ManualWatchFacility, WatchConfig, WatchCoordinator, WatchFacility, WatchGroup, WatchMode,
    WatchNotification, Watcher,
};

// Public re-exports - infrastructure
pub use ext::FileAccessExt;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FileAccessExtJson;
#[cfg(feature = "watch-notify")]
pub use watch::NotifyWatchFacility;
