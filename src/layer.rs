//! # Layer Trait
//!
//! Tower-style middleware composition for file access back ends, and the
//! [`StatCacheLayer`] that every registered back end is wrapped in.
//!
//! ## Overview
//!
//! ```text
//! Backend ──▶ Layer::layer() ──▶ Wrapped Backend
//! ```
//!
//! Each middleware provides:
//! 1. A wrapper struct that implements the access traits
//! 2. A `Layer` implementation that creates the wrapper
//!
//! ## Stat Caching
//!
//! [`CachedAccess`] answers [`FileRead::stat`] from a shared [`StatCache`] and
//! invalidates the affected entries after every mutating call, so callers
//! going through the wrapper never observe their own writes as stale.
//!
//! ```rust
//! use std::sync::Arc;
//! use devpath::{FilePath, FileRead, FileWrite, LayerExt, MemoryFileAccess, StatCache, StatCacheLayer};
//!
//! let cache = Arc::new(StatCache::default());
//! let access = MemoryFileAccess::new().layer(StatCacheLayer::new(Arc::clone(&cache)));
//! let path = FilePath::from_parts("mem", "doc", "/notes.txt");
//!
//! assert!(!access.stat(&path).unwrap().exists());
//! access.write_file(&path, b"hi", None).unwrap();
//! assert_eq!(access.stat(&path).unwrap().size, 2);
//! ```

use std::sync::Arc;

use crate::{
    Environment, FileAccess, FileDevice, FileDir, FileLink, FilePath, FilePathInfo, FilePermissions,
    FileRead, FileWrite, FsError, ListDirIter, ListFilter, OsType, Permissions, StatCache,
};

/// A layer that wraps a back end to add functionality.
///
/// Inspired by Tower's `Layer` trait. `layer(self, backend)` consumes both the
/// layer and the back end. Middleware needing higher traits (e.g. [`FileLink`])
/// adds bounds in its trait impls.
pub trait Layer<B> {
    /// The resulting back end type after applying this layer.
    type Backend;

    /// Wrap the given back end with this layer's functionality.
    fn layer(self, backend: B) -> Self::Backend;
}

/// Extension trait for fluent layer composition.
///
/// ```rust
/// use devpath::{FileAccess, Layer, LayerExt};
///
/// fn compose<B: FileAccess, L: Layer<B>>(backend: B, layer: L) -> L::Backend {
///     backend.layer(layer)
/// }
/// ```
pub trait LayerExt: FileAccess + Sized {
    /// Apply a layer to this back end.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Backend {
        layer.layer(self)
    }
}

impl<B: FileAccess> LayerExt for B {}

// ============================================================================
// Stat cache middleware
// ============================================================================

/// Wraps a back end in a [`CachedAccess`] sharing the given cache.
#[derive(Debug, Clone)]
pub struct StatCacheLayer {
    cache: Arc<StatCache>,
}

impl StatCacheLayer {
    /// A layer storing snapshots in `cache`.
    pub fn new(cache: Arc<StatCache>) -> Self {
        Self { cache }
    }
}

impl<B> Layer<B> for StatCacheLayer {
    type Backend = CachedAccess<B>;

    fn layer(self, backend: B) -> Self::Backend {
        CachedAccess {
            inner: backend,
            cache: self.cache,
        }
    }
}

/// Back end whose `stat` goes through a [`StatCache`].
#[derive(Debug)]
pub struct CachedAccess<B> {
    inner: B,
    cache: Arc<StatCache>,
}

impl<B> CachedAccess<B> {
    /// The wrapped back end.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// The cache this wrapper reads from.
    pub fn cache(&self) -> &Arc<StatCache> {
        &self.cache
    }

    fn after<T>(&self, result: Result<T, FsError>, touched: &[&FilePath]) -> Result<T, FsError> {
        // A failed mutation may still have changed something.
        for path in touched {
            self.cache.invalidate(path);
        }
        result
    }

    fn after_tree<T>(
        &self,
        result: Result<T, FsError>,
        touched: &[&FilePath],
    ) -> Result<T, FsError> {
        for path in touched {
            self.cache.invalidate_tree(path);
        }
        result
    }
}

impl<B: FileRead> FileRead for CachedAccess<B> {
    fn stat(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        self.cache.get(path, |p| self.inner.stat(p))
    }

    fn read_file(
        &self,
        path: &FilePath,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<Vec<u8>, FsError> {
        self.inner.read_file(path, limit, offset)
    }
}

impl<B: FileWrite> FileWrite for CachedAccess<B> {
    fn write_file(
        &self,
        path: &FilePath,
        data: &[u8],
        offset: Option<u64>,
    ) -> Result<u64, FsError> {
        self.after(self.inner.write_file(path, data, offset), &[path])
    }

    fn remove_file(&self, path: &FilePath) -> Result<(), FsError> {
        self.after(self.inner.remove_file(path), &[path])
    }

    fn remove_recursively(&self, path: &FilePath) -> Result<(), FsError> {
        self.after_tree(self.inner.remove_recursively(path), &[path])
    }

    fn copy_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        self.after(self.inner.copy_file(from, to), &[to])
    }

    fn rename_file(&self, from: &FilePath, to: &FilePath) -> Result<(), FsError> {
        self.after_tree(self.inner.rename_file(from, to), &[from, to])
    }
}

impl<B: FileDir> FileDir for CachedAccess<B> {
    fn list_directory(&self, path: &FilePath, filter: &ListFilter) -> Result<ListDirIter, FsError> {
        self.inner.list_directory(path, filter)
    }

    fn create_dir(&self, path: &FilePath) -> Result<(), FsError> {
        self.after(self.inner.create_dir(path), &[path])
    }

    fn create_dir_all(&self, path: &FilePath) -> Result<(), FsError> {
        let result = self.inner.create_dir_all(path);
        // Missing ancestors were created too; drop their negative snapshots.
        let mut dir = path.clone();
        loop {
            self.cache.invalidate(&dir);
            let parent = dir.parent_dir();
            if parent.is_empty() || parent.path().len() >= dir.path().len() {
                break;
            }
            dir = parent;
        }
        result
    }
}

impl<B: FileLink> FileLink for CachedAccess<B> {
    fn create_symlink(&self, target: &FilePath, link: &FilePath) -> Result<(), FsError> {
        self.after(self.inner.create_symlink(target, link), &[link])
    }

    fn symlink_target(&self, path: &FilePath) -> Result<FilePath, FsError> {
        self.inner.symlink_target(path)
    }

    fn stat_link(&self, path: &FilePath) -> Result<FilePathInfo, FsError> {
        self.inner.stat_link(path)
    }
}

impl<B: FilePermissions> FilePermissions for CachedAccess<B> {
    fn permissions(&self, path: &FilePath) -> Result<Permissions, FsError> {
        self.inner.permissions(path)
    }

    fn set_permissions(&self, path: &FilePath, permissions: Permissions) -> Result<(), FsError> {
        self.after(self.inner.set_permissions(path, permissions), &[path])
    }
}

impl<B: FileDevice> FileDevice for CachedAccess<B> {
    fn os_type(&self, path: &FilePath) -> OsType {
        self.inner.os_type(path)
    }

    fn environment(&self, path: &FilePath) -> Result<Environment, FsError> {
        self.inner.environment(path)
    }
}
