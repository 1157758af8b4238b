//! Watch facilities: the layer that actually talks to a change-notification source.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::{FilePath, FsError};

/// A source of raw change notifications for individual paths.
///
/// Watches are not recursive: a watched directory reports changes of its
/// direct entries, either with the directory's own path or with the path of
/// the changed entry.
///
/// # Object Safety
///
/// This trait is object-safe; the coordinator holds `Box<dyn WatchFacility>`.
pub trait WatchFacility: Send {
    /// Start watching `path`.
    fn watch(&mut self, path: &FilePath) -> Result<(), FsError>;

    /// Stop watching `path`.
    fn unwatch(&mut self, path: &FilePath) -> Result<(), FsError>;

    /// Paths reported as changed.
    fn receiver(&self) -> &Receiver<FilePath>;
}

#[derive(Debug, Default)]
struct ManualState {
    watch_calls: Vec<FilePath>,
    unwatch_calls: Vec<FilePath>,
    watched: BTreeSet<FilePath>,
    refuse: bool,
}

/// Facility that never touches the OS; changes are injected with [`push`](Self::push).
///
/// Clones share their state, so a test can keep one clone to inspect the calls
/// the coordinator made on another.
#[derive(Debug, Clone)]
pub struct ManualWatchFacility {
    state: Arc<Mutex<ManualState>>,
    tx: Sender<FilePath>,
    rx: Receiver<FilePath>,
}

impl Default for ManualWatchFacility {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualWatchFacility {
    /// A facility watching nothing.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::default(),
            tx,
            rx,
        }
    }

    /// Report a change of `path`.
    pub fn push(&self, path: FilePath) {
        // Our own receiver is alive as long as `self` is.
        let _ = self.tx.send(path);
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every path passed to [`WatchFacility::watch`], in call order.
    pub fn watch_calls(&self) -> Vec<FilePath> {
        self.state().watch_calls.clone()
    }

    /// Every path passed to [`WatchFacility::unwatch`], in call order.
    pub fn unwatch_calls(&self) -> Vec<FilePath> {
        self.state().unwatch_calls.clone()
    }

    /// Paths currently watched, sorted.
    pub fn watched(&self) -> Vec<FilePath> {
        self.state().watched.iter().cloned().collect()
    }

    /// Returns `true` if `path` is currently watched.
    pub fn is_watched(&self, path: &FilePath) -> bool {
        self.state().watched.contains(path)
    }

    /// While set, [`WatchFacility::watch`] fails like an exhausted OS watch table.
    pub fn refuse_watches(&self, refuse: bool) {
        self.state().refuse = refuse;
    }
}

impl WatchFacility for ManualWatchFacility {
    fn watch(&mut self, path: &FilePath) -> Result<(), FsError> {
        let mut state = self.state();
        state.watch_calls.push(path.clone());
        if state.refuse {
            return Err(FsError::IoFailure {
                path: path.clone(),
                reason: "no watch descriptors left".to_string(),
            });
        }
        state.watched.insert(path.clone());
        Ok(())
    }

    fn unwatch(&mut self, path: &FilePath) -> Result<(), FsError> {
        let mut state = self.state();
        state.unwatch_calls.push(path.clone());
        state.watched.remove(path);
        Ok(())
    }

    fn receiver(&self) -> &Receiver<FilePath> {
        &self.rx
    }
}

#[cfg(feature = "watch-notify")]
pub use notify_impl::NotifyWatchFacility;

#[cfg(feature = "watch-notify")]
mod notify_impl {
    use super::*;
    use notify::{RecursiveMode, Watcher};

    /// OS-backed facility built on `notify`. Only local paths can be watched.
    pub struct NotifyWatchFacility {
        watcher: notify::RecommendedWatcher,
        rx: Receiver<FilePath>,
    }

    impl std::fmt::Debug for NotifyWatchFacility {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("NotifyWatchFacility").finish_non_exhaustive()
        }
    }

    fn io_failure(path: &FilePath, err: notify::Error) -> FsError {
        FsError::IoFailure {
            path: path.clone(),
            reason: err.to_string(),
        }
    }

    impl NotifyWatchFacility {
        /// Start the platform watcher.
        pub fn new() -> Result<Self, FsError> {
            let (tx, rx) = crossbeam_channel::unbounded();
            let watcher =
                notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                    Ok(event) => {
                        for path in event.paths {
                            let _ = tx.send(FilePath::from_std_path(&path));
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "file watcher error"),
                })
                .map_err(|e| io_failure(&FilePath::default(), e))?;
            Ok(Self { watcher, rx })
        }

        fn native(path: &FilePath) -> Result<std::path::PathBuf, FsError> {
            path.to_std_path().ok_or(FsError::NotSupported {
                operation: "watch a device path",
            })
        }
    }

    impl WatchFacility for NotifyWatchFacility {
        fn watch(&mut self, path: &FilePath) -> Result<(), FsError> {
            let native = Self::native(path)?;
            self.watcher
                .watch(&native, RecursiveMode::NonRecursive)
                .map_err(|e| io_failure(path, e))
        }

        fn unwatch(&mut self, path: &FilePath) -> Result<(), FsError> {
            let native = Self::native(path)?;
            self.watcher.unwatch(&native).map_err(|e| io_failure(path, e))
        }

        fn receiver(&self) -> &Receiver<FilePath> {
            &self.rx
        }
    }
}
