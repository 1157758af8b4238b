//! # Backend Registry
//!
//! Process-wide table mapping a path's `(scheme, host)` to the back end that
//! performs its I/O.
//!
//! ## Resolution
//!
//! | Path | Result |
//! |------|--------|
//! | local (empty scheme) | the built-in [`LocalFileAccess`], no lookup |
//! | `scheme://host/...` registered for that host | that back end |
//! | `scheme://host/...` registered for the whole scheme | the scheme back end |
//! | anything else | [`FsError::BackendUnavailable`] |
//!
//! Every back end handed out is wrapped in a [`CachedAccess`] sharing the
//! registry's [`StatCache`], so mutations made through the registry always
//! invalidate the snapshots they touch.
//!
//! ## Device hooks
//!
//! [`DeviceHooks`] carries the optional callbacks through which device support
//! plugs in without this crate knowing the transport: display names,
//! same-device checks, local source mapping and opening terminals.
//!
//! ```rust
//! use std::sync::Arc;
//! use devpath::{BackendRegistry, FilePath, FileWrite, FileRead, MemoryFileAccess};
//!
//! let registry = BackendRegistry::new();
//! registry.register("mem", "box", Arc::new(MemoryFileAccess::new()));
//!
//! let path = FilePath::from_string("mem://box/hello.txt");
//! let access = registry.resolve(&path).unwrap();
//! access.write_file(&path, b"hi", None).unwrap();
//! assert_eq!(access.stat(&path).unwrap().size, 2);
//!
//! let other = FilePath::from_string("mem://elsewhere/x");
//! assert!(registry.resolve(&other).is_err());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::{
    CachedAccess, DeviceFileAccess, Environment, FilePath, FsError, LayerExt, LocalFileAccess,
    StatCache, StatCacheConfig, StatCacheLayer,
};

/// Shared, type-erased back end handle.
pub type SharedAccess = Arc<dyn DeviceFileAccess>;

type DisplayNameHook = dyn Fn(&FilePath) -> Option<String> + Send + Sync;
type SameDeviceHook = dyn Fn(&FilePath, &FilePath) -> bool + Send + Sync;
type LocalSourceHook = dyn Fn(&FilePath) -> Option<FilePath> + Send + Sync;
type OpenTerminalHook = dyn Fn(&FilePath, &Environment) -> Result<(), FsError> + Send + Sync;

/// Callbacks installed by whoever provides device support.
///
/// Every hook is optional; the registry falls back to a plain answer when a
/// hook is missing.
#[derive(Default)]
pub struct DeviceHooks {
    display_name: Option<Box<DisplayNameHook>>,
    is_same_device: Option<Box<SameDeviceHook>>,
    local_source: Option<Box<LocalSourceHook>>,
    open_terminal: Option<Box<OpenTerminalHook>>,
}

impl DeviceHooks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Human-readable name of the device owning a path, e.g. a container name.
    pub fn with_display_name<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FilePath) -> Option<String> + Send + Sync + 'static,
    {
        self.display_name = Some(Box::new(hook));
        self
    }

    /// Decide whether two device paths live on the same device.
    pub fn with_is_same_device<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FilePath, &FilePath) -> bool + Send + Sync + 'static,
    {
        self.is_same_device = Some(Box::new(hook));
        self
    }

    /// Map a device path to a local file with the same content, e.g. a mounted source tree.
    pub fn with_local_source<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FilePath) -> Option<FilePath> + Send + Sync + 'static,
    {
        self.local_source = Some(Box::new(hook));
        self
    }

    /// Open an interactive terminal in a directory of a device.
    pub fn with_open_terminal<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FilePath, &Environment) -> Result<(), FsError> + Send + Sync + 'static,
    {
        self.open_terminal = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for DeviceHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHooks")
            .field("display_name", &self.display_name.is_some())
            .field("is_same_device", &self.is_same_device.is_some())
            .field("local_source", &self.local_source.is_some())
            .field("open_terminal", &self.open_terminal.is_some())
            .finish()
    }
}

/// Routes paths to back ends.
///
/// Use [`BackendRegistry::global`] for the process-wide instance that the
/// [`FilePath`] I/O methods go through, or [`BackendRegistry::new`] for an
/// isolated one.
pub struct BackendRegistry {
    hosts: RwLock<HashMap<(String, String), SharedAccess>>,
    schemes: RwLock<HashMap<String, SharedAccess>>,
    hooks: RwLock<Arc<DeviceHooks>>,
    cache: Arc<StatCache>,
    local: SharedAccess,
}

impl BackendRegistry {
    /// An empty registry with a default-sized stat cache.
    pub fn new() -> Self {
        Self::with_cache_config(StatCacheConfig::default())
    }

    /// An empty registry whose stat cache uses `config`.
    pub fn with_cache_config(config: StatCacheConfig) -> Self {
        let cache = Arc::new(StatCache::new(config));
        let local: SharedAccess =
            Arc::new(LocalFileAccess::new().layer(StatCacheLayer::new(Arc::clone(&cache))));
        Self {
            hosts: RwLock::new(HashMap::new()),
            schemes: RwLock::new(HashMap::new()),
            hooks: RwLock::new(Arc::new(DeviceHooks::new())),
            cache,
            local,
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static BackendRegistry {
        static GLOBAL: OnceLock<BackendRegistry> = OnceLock::new();
        GLOBAL.get_or_init(BackendRegistry::new)
    }

    fn wrap(&self, backend: SharedAccess) -> SharedAccess {
        let cached: CachedAccess<SharedAccess> =
            backend.layer(StatCacheLayer::new(Arc::clone(&self.cache)));
        Arc::new(cached)
    }

    /// Route `scheme://host/...` to `backend`, replacing any earlier registration.
    pub fn register(&self, scheme: &str, host: &str, backend: SharedAccess) {
        let wrapped = self.wrap(backend);
        self.hosts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((scheme.to_string(), host.to_string()), wrapped);
        self.cache.clear();
        tracing::debug!(scheme, host, "registered device back end");
    }

    /// Route every host of `scheme` without a host-specific registration to `backend`.
    pub fn register_scheme(&self, scheme: &str, backend: SharedAccess) {
        let wrapped = self.wrap(backend);
        self.schemes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scheme.to_string(), wrapped);
        self.cache.clear();
        tracing::debug!(scheme, "registered scheme back end");
    }

    /// Remove the registration for `scheme://host`. Returns `true` if there was one.
    pub fn unregister(&self, scheme: &str, host: &str) -> bool {
        let removed = self
            .hosts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(scheme.to_string(), host.to_string()))
            .is_some();
        if removed {
            self.cache.clear();
        }
        removed
    }

    /// Remove the scheme-wide registration. Returns `true` if there was one.
    pub fn unregister_scheme(&self, scheme: &str) -> bool {
        let removed = self
            .schemes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scheme)
            .is_some();
        if removed {
            self.cache.clear();
        }
        removed
    }

    /// Back end for `path`.
    ///
    /// # Errors
    ///
    /// [`FsError::BackendUnavailable`] if `path` is a device path nobody registered.
    pub fn resolve(&self, path: &FilePath) -> Result<SharedAccess, FsError> {
        if path.is_local() {
            return Ok(Arc::clone(&self.local));
        }
        let key = (path.scheme().to_string(), path.host().to_string());
        if let Some(found) = self.hosts.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(Arc::clone(found));
        }
        if let Some(found) = self
            .schemes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path.scheme())
        {
            return Ok(Arc::clone(found));
        }
        Err(FsError::BackendUnavailable {
            scheme: key.0,
            host: key.1,
        })
    }

    /// Returns `true` if [`resolve`](Self::resolve) would succeed.
    pub fn is_available(&self, path: &FilePath) -> bool {
        self.resolve(path).is_ok()
    }

    /// The cache shared by every back end this registry hands out.
    pub fn stat_cache(&self) -> &Arc<StatCache> {
        &self.cache
    }

    /// Replace the installed device hooks.
    pub fn set_hooks(&self, hooks: DeviceHooks) {
        *self.hooks.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(hooks);
    }

    fn hooks(&self) -> Arc<DeviceHooks> {
        Arc::clone(&self.hooks.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Display name of the device owning `path`.
    ///
    /// Local paths yield `"Local"`. Without a hook, a device path yields `scheme://host`.
    pub fn display_name(&self, path: &FilePath) -> String {
        if path.is_local() {
            return "Local".to_string();
        }
        let hooks = self.hooks();
        hooks
            .display_name
            .as_ref()
            .and_then(|hook| hook(path))
            .unwrap_or_else(|| format!("{}://{}", path.scheme(), path.host()))
    }

    /// Whether `a` and `b` live on the same device.
    ///
    /// Two local paths always do. Device paths ask the hook, falling back to
    /// comparing scheme and host.
    pub fn is_same_device(&self, a: &FilePath, b: &FilePath) -> bool {
        if a.is_local() || b.is_local() {
            return a.is_local() && b.is_local();
        }
        match &self.hooks().is_same_device {
            Some(hook) => hook(a, b),
            None => a.is_same_location(b),
        }
    }

    /// Local file mirroring `path`, if a hook provides one. Local paths map to themselves.
    pub fn local_source(&self, path: &FilePath) -> Option<FilePath> {
        if path.is_local() {
            return Some(path.clone());
        }
        self.hooks().local_source.as_ref().and_then(|hook| hook(path))
    }

    /// Open a terminal in `dir` with `environment`.
    ///
    /// # Errors
    ///
    /// [`FsError::NotSupported`] when no terminal hook is installed.
    pub fn open_terminal(&self, dir: &FilePath, environment: &Environment) -> Result<(), FsError> {
        match &self.hooks().open_terminal {
            Some(hook) => hook(dir, environment),
            None => Err(FsError::NotSupported {
                operation: "open_terminal",
            }),
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hosts: Vec<String> = self
            .hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(|(scheme, host)| format!("{scheme}://{host}"))
            .collect();
        let schemes: Vec<String> = self
            .schemes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("BackendRegistry")
            .field("hosts", &hosts)
            .field("schemes", &schemes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, FileRead, FileWrite, MemoryFileAccess};

    #[test]
    fn local_paths_need_no_registration() {
        let registry = BackendRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let path = FilePath::from_std_path(dir.path());
        assert!(registry.resolve(&path).unwrap().stat(&path).unwrap().is_dir());
    }

    #[test]
    fn unknown_device_is_unavailable() {
        let registry = BackendRegistry::new();
        let err = registry.resolve(&FilePath::from_string("ssh://nowhere/etc")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(err.to_string().contains("ssh://nowhere"));
    }

    #[test]
    fn host_registration_beats_scheme_registration() {
        let registry = BackendRegistry::new();
        let specific = Arc::new(MemoryFileAccess::new());
        let general = Arc::new(MemoryFileAccess::new());
        registry.register("dev", "one", specific.clone());
        registry.register_scheme("dev", general.clone());

        let one = FilePath::from_string("dev://one/f");
        let two = FilePath::from_string("dev://two/f");
        registry.resolve(&one).unwrap().write_file(&one, b"1", None).unwrap();
        registry.resolve(&two).unwrap().write_file(&two, b"22", None).unwrap();

        assert!(specific.exists(&one).unwrap());
        assert!(!specific.exists(&two).unwrap());
        assert!(general.exists(&two).unwrap());
    }

    #[test]
    fn unregister_makes_device_unavailable() {
        let registry = BackendRegistry::new();
        registry.register("dev", "one", Arc::new(MemoryFileAccess::new()));
        assert!(registry.is_available(&FilePath::from_string("dev://one/")));
        assert!(registry.unregister("dev", "one"));
        assert!(!registry.unregister("dev", "one"));
        assert!(!registry.is_available(&FilePath::from_string("dev://one/")));
    }

    #[test]
    fn resolved_access_shares_the_registry_cache() {
        let registry = BackendRegistry::new();
        registry.register("dev", "one", Arc::new(MemoryFileAccess::new()));
        let path = FilePath::from_string("dev://one/x");
        let access = registry.resolve(&path).unwrap();
        access.stat(&path).unwrap();
        assert_eq!(registry.stat_cache().len(), 1);
        access.write_file(&path, b"x", None).unwrap();
        assert!(registry.stat_cache().is_empty());
    }

    #[test]
    fn hooks_fall_back_without_installation() {
        let registry = BackendRegistry::new();
        let a = FilePath::from_string("dev://one/a");
        let b = FilePath::from_string("dev://one/b");
        let c = FilePath::from_string("dev://two/c");
        assert_eq!(registry.display_name(&a), "dev://one");
        assert_eq!(registry.display_name(&FilePath::from_string("/tmp")), "Local");
        assert!(registry.is_same_device(&a, &b));
        assert!(!registry.is_same_device(&a, &c));
        assert!(registry.local_source(&a).is_none());
        let err = registry.open_terminal(&a, &Environment::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
    }

    #[test]
    fn installed_hooks_are_consulted() {
        let registry = BackendRegistry::new();
        registry.set_hooks(
            DeviceHooks::new()
                .with_display_name(|p| Some(format!("Container {}", p.host())))
                .with_is_same_device(|a, b| a.scheme() == b.scheme())
                .with_local_source(|p| Some(FilePath::from_string("/mnt").path_appended(p.path())))
                .with_open_terminal(|_, _| Ok(())),
        );
        let a = FilePath::from_string("dev://one/src/a.rs");
        let c = FilePath::from_string("dev://two/c");
        assert_eq!(registry.display_name(&a), "Container one");
        assert!(registry.is_same_device(&a, &c));
        assert_eq!(registry.local_source(&a).unwrap(), FilePath::from_string("/mnt/src/a.rs"));
        assert!(registry.open_terminal(&a, &Environment::default()).is_ok());
    }

    #[test]
    fn registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendRegistry>();
        assert_send_sync::<DeviceHooks>();
    }
}
