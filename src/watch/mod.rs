//! # Watch Coordination
//!
//! Many logical watchers, one registration per path with the underlying
//! [`WatchFacility`].
//!
//! ## Overview
//!
//! Watchers belong to a numbered group. Each group owns one facility, created
//! with the group's first [`Watcher`] and dropped with its last. Inside a group
//! every path is reference counted: the facility sees `watch` when the count
//! goes from 0 to 1 and `unwatch` when it drops back to 0.
//!
//! | Behavior | Rule |
//! |----------|------|
//! | ceiling | at most [`WatchConfig::ceiling`] facility watches per process; more fail with [`FsError::TooManyWatches`] |
//! | directory changes | debounced per directory for [`WatchConfig::debounce`] |
//! | vanished files | the parent directory is watched until the file reappears |
//! | [`WatchMode::NotifyOnModifiedTimestampChange`] | a change is only reported if the modification time moved |
//! | postponed | notifications are buffered, deduplicated, and delivered on resume |
//!
//! ## Example
//!
//! ```rust
//! use devpath::{FilePath, ManualWatchFacility, WatchConfig, WatchCoordinator};
//! use std::sync::Arc;
//!
//! let facility = ManualWatchFacility::new();
//! let shared = facility.clone();
//! let coordinator = Arc::new(WatchCoordinator::new(WatchConfig::default(), move || {
//!     Ok(Box::new(shared.clone()) as Box<dyn devpath::WatchFacility>)
//! }));
//!
//! let file = FilePath::from_string("/tmp/devpath-watch-doc");
//! let first = coordinator.watcher(0).unwrap();
//! let second = coordinator.watcher(0).unwrap();
//! first.add_directory(&file).unwrap();
//! second.add_directory(&file).unwrap();
//! assert_eq!(facility.watch_calls().len(), 1);
//! ```

mod facility;

#[cfg(feature = "watch-notify")]
pub use facility::NotifyWatchFacility;
pub use facility::{ManualWatchFacility, WatchFacility};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::{Receiver, Sender};

use crate::{BackendRegistry, FilePath, FsError};

/// Identifies a group of watchers sharing one facility.
pub type WatchGroup = u32;

/// Ceiling used when the open-file limit cannot be determined.
const FALLBACK_CEILING: usize = 4096;

#[cfg(unix)]
fn open_file_limit() -> Option<usize> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit only writes into the struct we pass.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 || limit.rlim_cur == libc::RLIM_INFINITY {
        return None;
    }
    usize::try_from(limit.rlim_cur).ok()
}

#[cfg(not(unix))]
fn open_file_limit() -> Option<usize> {
    None
}

/// Tuning for a [`WatchCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Directory changes within this window are reported once.
    pub debounce: Duration,
    /// Maximum number of facility watches, across all groups.
    pub ceiling: usize,
}

impl Default for WatchConfig {
    /// 100 ms debounce; half the process open-file limit as ceiling.
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            ceiling: open_file_limit().map_or(FALLBACK_CEILING, |n| (n / 2).max(1)),
        }
    }
}

/// When a watched file's change is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WatchMode {
    /// Every change.
    #[default]
    NotifyOnAnyChange,
    /// Only changes that moved the modification time.
    NotifyOnModifiedTimestampChange,
}

/// Delivered to a [`Watcher`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchNotification {
    /// A watched file changed, vanished, or reappeared.
    FileChanged(FilePath),
    /// The entries of a watched directory changed.
    DirectoryChanged(FilePath),
}

impl WatchNotification {
    /// The path the notification is about.
    pub fn path(&self) -> &FilePath {
        match self {
            WatchNotification::FileChanged(path) | WatchNotification::DirectoryChanged(path) => {
                path
            }
        }
    }
}

// ============================================================================
// Registry state
// ============================================================================

#[derive(Debug)]
struct FileState {
    subscribers: usize,
    modified: Option<SystemTime>,
    vanished: bool,
    // whether a watch is held on the file, or on its parent while vanished
    holds_watch: bool,
}

#[derive(Debug)]
struct Subscriber {
    sender: Sender<WatchNotification>,
    files: HashMap<FilePath, WatchMode>,
    dirs: HashSet<FilePath>,
}

struct Group {
    facility: Box<dyn WatchFacility>,
    // every path registered with the facility, with the number of reasons to keep it
    os_refs: HashMap<FilePath, usize>,
    files: HashMap<FilePath, FileState>,
    dirs: HashMap<FilePath, usize>,
    subscribers: HashMap<u64, Subscriber>,
    pending_dirs: HashMap<FilePath, Instant>,
}

impl Group {
    fn acquire(
        &mut self,
        path: &FilePath,
        os_watches: &mut usize,
        ceiling: usize,
    ) -> Result<(), FsError> {
        if let Some(count) = self.os_refs.get_mut(path) {
            *count += 1;
            return Ok(());
        }
        if *os_watches >= ceiling {
            tracing::warn!(path = %path, limit = ceiling, "declining watch, ceiling reached");
            return Err(FsError::TooManyWatches {
                path: path.clone(),
                limit: ceiling,
            });
        }
        self.facility.watch(path)?;
        self.os_refs.insert(path.clone(), 1);
        *os_watches += 1;
        Ok(())
    }

    fn release(&mut self, path: &FilePath, os_watches: &mut usize) {
        match self.os_refs.get_mut(path) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.os_refs.remove(path);
                *os_watches = os_watches.saturating_sub(1);
                if let Err(err) = self.facility.unwatch(path) {
                    tracing::debug!(path = %path, error = %err, "unwatch failed");
                }
            }
            None => {}
        }
    }

    /// Whether changes reported for `path` concern a directory we watch.
    fn watches_as_directory(&self, path: &FilePath) -> bool {
        self.dirs.contains_key(path) || self.vanished_children(path).next().is_some()
    }

    fn vanished_children<'a>(
        &'a self,
        dir: &'a FilePath,
    ) -> impl Iterator<Item = &'a FilePath> + 'a {
        self.files
            .iter()
            .filter(move |(file, state)| state.vanished && file.parent_dir() == *dir)
            .map(|(file, _)| file)
    }

    fn deliver(&self, notification: &WatchNotification, timestamp_changed: bool) {
        for subscriber in self.subscribers.values() {
            let wanted = match notification {
                WatchNotification::FileChanged(path) => match subscriber.files.get(path) {
                    Some(WatchMode::NotifyOnAnyChange) => true,
                    Some(WatchMode::NotifyOnModifiedTimestampChange) => timestamp_changed,
                    None => false,
                },
                WatchNotification::DirectoryChanged(path) => subscriber.dirs.contains(path),
            };
            if wanted {
                let _ = subscriber.sender.send(notification.clone());
            }
        }
    }
}

#[derive(Debug)]
struct Buffered {
    group: WatchGroup,
    notification: WatchNotification,
    timestamp_changed: bool,
}

#[derive(Default)]
struct State {
    groups: HashMap<WatchGroup, Group>,
    os_watches: usize,
    next_id: u64,
    postponed: bool,
    buffered: Vec<Buffered>,
}

impl State {
    fn emit(
        &mut self,
        group: WatchGroup,
        notification: WatchNotification,
        timestamp_changed: bool,
    ) {
        if self.postponed {
            match self
                .buffered
                .iter_mut()
                .find(|b| b.group == group && b.notification == notification)
            {
                Some(existing) => existing.timestamp_changed |= timestamp_changed,
                None => self.buffered.push(Buffered {
                    group,
                    notification,
                    timestamp_changed,
                }),
            }
            return;
        }
        if let Some(g) = self.groups.get(&group) {
            g.deliver(&notification, timestamp_changed);
        }
    }
}

type FacilityFactory = dyn Fn() -> Result<Box<dyn WatchFacility>, FsError> + Send + Sync;

/// Shares facility watches among [`Watcher`]s.
pub struct WatchCoordinator {
    config: WatchConfig,
    factory: Box<FacilityFactory>,
    state: Mutex<State>,
}

impl std::fmt::Debug for WatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("WatchCoordinator")
            .field("config", &self.config)
            .field("groups", &state.groups.len())
            .field("os_watches", &state.os_watches)
            .field("postponed", &state.postponed)
            .finish()
    }
}

impl WatchCoordinator {
    /// A coordinator creating one facility per group with `factory`.
    pub fn new<F>(config: WatchConfig, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn WatchFacility>, FsError> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            state: Mutex::default(),
        }
    }

    /// The process-wide coordinator.
    ///
    /// With the `watch-notify` feature it watches through the OS and runs a
    /// dispatcher thread; otherwise it uses [`ManualWatchFacility`].
    pub fn global() -> &'static Arc<WatchCoordinator> {
        static GLOBAL: OnceLock<Arc<WatchCoordinator>> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            #[cfg(feature = "watch-notify")]
            let coordinator = Arc::new(WatchCoordinator::new(WatchConfig::default(), || {
                Ok(Box::new(NotifyWatchFacility::new()?) as Box<dyn WatchFacility>)
            }));
            #[cfg(not(feature = "watch-notify"))]
            let coordinator = Arc::new(WatchCoordinator::new(WatchConfig::default(), || {
                Ok(Box::new(ManualWatchFacility::new()) as Box<dyn WatchFacility>)
            }));
            if let Err(err) = coordinator.start_dispatcher() {
                tracing::warn!(error = %err, "could not start watch dispatcher");
            }
            coordinator
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A new logical watcher in `group`, creating the group's facility if needed.
    pub fn watcher(self: &Arc<Self>, group: WatchGroup) -> Result<Watcher, FsError> {
        let mut state = self.lock();
        if !state.groups.contains_key(&group) {
            let facility = (self.factory)()?;
            tracing::debug!(group, "created watch group");
            state.groups.insert(
                group,
                Group {
                    facility,
                    os_refs: HashMap::new(),
                    files: HashMap::new(),
                    dirs: HashMap::new(),
                    subscribers: HashMap::new(),
                    pending_dirs: HashMap::new(),
                },
            );
        }
        let id = state.next_id;
        state.next_id += 1;
        let (sender, receiver) = crossbeam_channel::unbounded();
        if let Some(g) = state.groups.get_mut(&group) {
            g.subscribers.insert(
                id,
                Subscriber {
                    sender,
                    files: HashMap::new(),
                    dirs: HashSet::new(),
                },
            );
        }
        Ok(Watcher {
            coordinator: Arc::clone(self),
            group,
            id,
            receiver,
        })
    }

    /// Number of paths registered with facilities, across all groups.
    pub fn os_watch_count(&self) -> usize {
        self.lock().os_watches
    }

    /// Number of live groups.
    pub fn group_count(&self) -> usize {
        self.lock().groups.len()
    }

    fn add_file(
        &self,
        group: WatchGroup,
        id: u64,
        path: &FilePath,
        mode: WatchMode,
    ) -> Result<(), FsError> {
        let info = path.info().ok();
        let exists = info.as_ref().is_some_and(|i| i.exists());
        let modified = info.filter(|i| i.exists()).map(|i| i.last_modified);

        let mut guard = self.lock();
        let State { groups, os_watches, .. } = &mut *guard;
        let Some(g) = groups.get_mut(&group) else {
            return Ok(());
        };
        let already = g
            .subscribers
            .get(&id)
            .is_some_and(|s| s.files.contains_key(path));
        if !already {
            if !g.files.contains_key(path) {
                let target = if exists { path.clone() } else { path.parent_dir() };
                g.acquire(&target, os_watches, self.config.ceiling)?;
                g.files.insert(
                    path.clone(),
                    FileState {
                        subscribers: 0,
                        modified,
                        vanished: !exists,
                        holds_watch: true,
                    },
                );
            }
            if let Some(state) = g.files.get_mut(path) {
                state.subscribers += 1;
            }
            tracing::debug!(group, path = %path, "watching file");
        }
        if let Some(subscriber) = g.subscribers.get_mut(&id) {
            subscriber.files.insert(path.clone(), mode);
        }
        Ok(())
    }

    fn remove_file(&self, group: WatchGroup, id: u64, path: &FilePath) {
        let mut guard = self.lock();
        let State { groups, os_watches, .. } = &mut *guard;
        if let Some(g) = groups.get_mut(&group) {
            Self::drop_file(g, id, path, os_watches);
        }
    }

    fn drop_file(g: &mut Group, id: u64, path: &FilePath, os_watches: &mut usize) {
        let removed = g
            .subscribers
            .get_mut(&id)
            .and_then(|s| s.files.remove(path))
            .is_some();
        if !removed {
            return;
        }
        let Some(state) = g.files.get_mut(path) else {
            return;
        };
        state.subscribers -= 1;
        if state.subscribers > 0 {
            return;
        }
        let (vanished, holds_watch) = (state.vanished, state.holds_watch);
        g.files.remove(path);
        if holds_watch {
            let target = if vanished { path.parent_dir() } else { path.clone() };
            g.release(&target, os_watches);
        }
        tracing::debug!(path = %path, "stopped watching file");
    }

    fn add_directory(&self, group: WatchGroup, id: u64, path: &FilePath) -> Result<(), FsError> {
        let mut guard = self.lock();
        let State { groups, os_watches, .. } = &mut *guard;
        let Some(g) = groups.get_mut(&group) else {
            return Ok(());
        };
        if g.subscribers.get(&id).is_some_and(|s| s.dirs.contains(path)) {
            return Ok(());
        }
        if !g.dirs.contains_key(path) {
            g.acquire(path, os_watches, self.config.ceiling)?;
            tracing::debug!(group, path = %path, "watching directory");
        }
        *g.dirs.entry(path.clone()).or_insert(0) += 1;
        if let Some(subscriber) = g.subscribers.get_mut(&id) {
            subscriber.dirs.insert(path.clone());
        }
        Ok(())
    }

    fn remove_directory(&self, group: WatchGroup, id: u64, path: &FilePath) {
        let mut guard = self.lock();
        let State { groups, os_watches, .. } = &mut *guard;
        if let Some(g) = groups.get_mut(&group) {
            Self::drop_directory(g, id, path, os_watches);
        }
    }

    fn drop_directory(g: &mut Group, id: u64, path: &FilePath, os_watches: &mut usize) {
        let removed = g.subscribers.get_mut(&id).is_some_and(|s| s.dirs.remove(path));
        if !removed {
            return;
        }
        let Some(count) = g.dirs.get_mut(path) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            g.dirs.remove(path);
            g.pending_dirs.remove(path);
            g.release(path, os_watches);
            tracing::debug!(path = %path, "stopped watching directory");
        }
    }

    fn release_watcher(&self, group: WatchGroup, id: u64) {
        let mut guard = self.lock();
        let State { groups, os_watches, .. } = &mut *guard;
        let Some(g) = groups.get_mut(&group) else {
            return;
        };
        if let Some(subscriber) = g.subscribers.get(&id) {
            let files: Vec<FilePath> = subscriber.files.keys().cloned().collect();
            let dirs: Vec<FilePath> = subscriber.dirs.iter().cloned().collect();
            for file in &files {
                Self::drop_file(g, id, file, os_watches);
            }
            for dir in &dirs {
                Self::drop_directory(g, id, dir, os_watches);
            }
        }
        g.subscribers.remove(&id);
        if g.subscribers.is_empty() {
            if let Some(g) = groups.remove(&group) {
                *os_watches = os_watches.saturating_sub(g.os_refs.len());
            }
            tracing::debug!(group, "dropped watch group");
        }
    }

    // ------------------------------------------------------------------
    // Event processing
    // ------------------------------------------------------------------

    /// Process a change of `path` reported by the facility of `group`.
    ///
    /// File changes are delivered at once; directory changes wait for
    /// [`flush_due_at`](Self::flush_due_at).
    pub fn handle_event_at(&self, group: WatchGroup, path: &FilePath, now: Instant) {
        BackendRegistry::global().stat_cache().invalidate(path);

        let (watched_file, dirs, candidates) = {
            let state = self.lock();
            let Some(g) = state.groups.get(&group) else {
                return;
            };
            let watched_file = g.files.get(path).is_some_and(|s| !s.vanished);
            // Facilities may report an entry's path instead of its directory's.
            let dirs: Vec<FilePath> = [path.clone(), path.parent_dir()]
                .into_iter()
                .filter(|d| !d.is_empty() && g.watches_as_directory(d))
                .collect();
            let candidates: Vec<FilePath> = dirs
                .iter()
                .flat_map(|d| g.vanished_children(d).cloned().collect::<Vec<_>>())
                .collect();
            (watched_file, dirs, candidates)
        };

        // Stat outside the lock.
        let stat = |p: &FilePath| {
            BackendRegistry::global().stat_cache().invalidate(p);
            p.info().ok().filter(|i| i.exists()).map(|i| i.last_modified)
        };
        let current = watched_file.then(|| stat(path));
        let reappeared: Vec<(FilePath, Option<SystemTime>)> = candidates
            .into_iter()
            .filter_map(|file| stat(&file).map(|m| (file, Some(m))))
            .collect();

        let mut guard = self.lock();
        let ceiling = self.config.ceiling;
        let mut emitted = Vec::new();
        {
            let State { groups, os_watches, .. } = &mut *guard;
            let Some(g) = groups.get_mut(&group) else {
                return;
            };
            if let Some(current) = current {
                let vanish = current.is_none() && g.files.get(path).is_some_and(|s| !s.vanished);
                if vanish {
                    let parent = path.parent_dir();
                    g.release(path, os_watches);
                    let holds_watch = match g.acquire(&parent, os_watches, ceiling) {
                        Ok(()) => true,
                        Err(err) => {
                            tracing::warn!(
                                path = %path,
                                error = %err,
                                "cannot watch for reappearance"
                            );
                            false
                        }
                    };
                    if let Some(state) = g.files.get_mut(path) {
                        state.vanished = true;
                        state.holds_watch = holds_watch;
                        state.modified = None;
                    }
                    tracing::debug!(path = %path, "watched file vanished");
                    emitted.push((WatchNotification::FileChanged(path.clone()), true));
                } else if let Some(state) = g.files.get_mut(path).filter(|s| !s.vanished) {
                    let changed = state.modified != current;
                    state.modified = current;
                    emitted.push((WatchNotification::FileChanged(path.clone()), changed));
                }
            }

            for (file, modified) in reappeared {
                let vanished = g.files.get(&file).filter(|s| s.vanished);
                let Some(held_parent) = vanished.map(|s| s.holds_watch) else {
                    continue;
                };
                if let Err(err) = g.acquire(&file, os_watches, ceiling) {
                    tracing::warn!(path = %file, error = %err, "cannot re-attach watch");
                    continue;
                }
                if held_parent {
                    g.release(&file.parent_dir(), os_watches);
                }
                if let Some(state) = g.files.get_mut(&file) {
                    state.vanished = false;
                    state.holds_watch = true;
                    state.modified = modified;
                }
                tracing::debug!(path = %file, "watched file reappeared");
                emitted.push((WatchNotification::FileChanged(file), true));
            }

            for dir in dirs {
                if g.dirs.contains_key(&dir) {
                    g.pending_dirs.entry(dir).or_insert(now + self.config.debounce);
                }
            }
        }
        for (notification, timestamp_changed) in emitted {
            guard.emit(group, notification, timestamp_changed);
        }
    }

    /// Deliver directory changes whose debounce window ended at or before `now`.
    pub fn flush_due_at(&self, now: Instant) {
        let mut state = self.lock();
        let mut due = Vec::new();
        for (&group, g) in &mut state.groups {
            let ready: Vec<FilePath> = g
                .pending_dirs
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(dir, _)| dir.clone())
                .collect();
            for dir in ready {
                g.pending_dirs.remove(&dir);
                due.push((group, dir));
            }
        }
        for (group, dir) in due {
            state.emit(group, WatchNotification::DirectoryChanged(dir), true);
        }
    }

    /// Drain every facility and deliver what is due at `now`.
    pub fn poll_at(&self, now: Instant) {
        let reported: Vec<(WatchGroup, FilePath)> = {
            let state = self.lock();
            state
                .groups
                .iter()
                .flat_map(|(&group, g)| g.facility.receiver().try_iter().map(move |p| (group, p)))
                .collect()
        };
        for (group, path) in reported {
            self.handle_event_at(group, &path, now);
        }
        self.flush_due_at(now);
    }

    /// [`poll_at`](Self::poll_at) the current instant.
    pub fn poll(&self) {
        self.poll_at(Instant::now());
    }

    /// Buffer notifications instead of delivering them. Resuming delivers each
    /// buffered notification once.
    pub fn set_postponed(&self, postponed: bool) {
        let mut state = self.lock();
        state.postponed = postponed;
        if postponed {
            return;
        }
        let buffered = std::mem::take(&mut state.buffered);
        tracing::debug!(count = buffered.len(), "delivering postponed notifications");
        for b in buffered {
            if let Some(g) = state.groups.get(&b.group) {
                g.deliver(&b.notification, b.timestamp_changed);
            }
        }
    }

    /// Returns `true` while notifications are postponed.
    pub fn is_postponed(&self) -> bool {
        self.lock().postponed
    }

    /// Poll on a background thread until the coordinator is dropped.
    pub fn start_dispatcher(self: &Arc<Self>) -> Result<JoinHandle<()>, FsError> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = (self.config.debounce / 2).max(Duration::from_millis(5));
        let handle = std::thread::Builder::new()
            .name("devpath-watch".to_string())
            .spawn(move || {
                loop {
                    std::thread::sleep(interval);
                    let Some(coordinator) = weak.upgrade() else {
                        break;
                    };
                    coordinator.poll();
                }
            })?;
        Ok(handle)
    }
}

// ============================================================================
// Watcher handle
// ============================================================================

/// One logical subscriber. Dropping it removes all of its watches.
#[derive(Debug)]
pub struct Watcher {
    coordinator: Arc<WatchCoordinator>,
    group: WatchGroup,
    id: u64,
    receiver: Receiver<WatchNotification>,
}

impl Watcher {
    /// The group this watcher belongs to.
    pub fn group(&self) -> WatchGroup {
        self.group
    }

    /// Watch a file. A missing file is watched for creation through its parent.
    ///
    /// # Errors
    ///
    /// [`FsError::TooManyWatches`] when the ceiling is reached, or the facility's error.
    pub fn add_file(&self, path: &FilePath, mode: WatchMode) -> Result<(), FsError> {
        self.coordinator.add_file(self.group, self.id, path, mode)
    }

    /// Watch several files, stopping at the first failure.
    pub fn add_files(&self, paths: &[FilePath], mode: WatchMode) -> Result<(), FsError> {
        paths.iter().try_for_each(|p| self.add_file(p, mode))
    }

    /// Stop watching a file.
    pub fn remove_file(&self, path: &FilePath) {
        self.coordinator.remove_file(self.group, self.id, path);
    }

    /// Watch the entries of a directory.
    pub fn add_directory(&self, path: &FilePath) -> Result<(), FsError> {
        self.coordinator.add_directory(self.group, self.id, path)
    }

    /// Stop watching a directory.
    pub fn remove_directory(&self, path: &FilePath) {
        self.coordinator.remove_directory(self.group, self.id, path);
    }

    fn with_subscriber<T>(&self, f: impl FnOnce(&Subscriber) -> T) -> Option<T> {
        let state = self.coordinator.lock();
        state
            .groups
            .get(&self.group)
            .and_then(|g| g.subscribers.get(&self.id))
            .map(f)
    }

    /// Files watched by this watcher, sorted.
    pub fn files(&self) -> Vec<FilePath> {
        let mut files = self
            .with_subscriber(|s| s.files.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        files.sort();
        files
    }

    /// Directories watched by this watcher, sorted.
    pub fn directories(&self) -> Vec<FilePath> {
        let mut dirs = self
            .with_subscriber(|s| s.dirs.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        dirs.sort();
        dirs
    }

    /// Returns `true` if this watcher watches the file `path`.
    pub fn watches_file(&self, path: &FilePath) -> bool {
        self.with_subscriber(|s| s.files.contains_key(path)).unwrap_or(false)
    }

    /// Returns `true` if this watcher watches the directory `path`.
    pub fn watches_directory(&self, path: &FilePath) -> bool {
        self.with_subscriber(|s| s.dirs.contains(path)).unwrap_or(false)
    }

    /// Notifications for this watcher.
    pub fn receiver(&self) -> &Receiver<WatchNotification> {
        &self.receiver
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.coordinator.release_watcher(self.group, self.id);
    }
}
