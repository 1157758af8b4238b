//! # Stat Cache
//!
//! Bounded, TTL-based cache from [`FilePath`] to [`FilePathInfo`].
//!
//! ## Overview
//!
//! Listing a directory and then asking each entry for its type, size and
//! modification time produces storms of identical stat calls, which hurt most on
//! remote devices. The cache coalesces them: [`StatCache::get`] returns a fresh
//! cached snapshot or calls the supplied retrieval function and stores its result.
//!
//! ## Guarantees
//!
//! | Property | Behavior |
//! |----------|----------|
//! | Expiry | Entries older than [`StatCacheConfig::ttl`] are refetched |
//! | Bound | At most [`StatCacheConfig::capacity`] entries; least recently used goes first |
//! | Invalidation | After [`StatCache::invalidate`] the next `get` always retrieves |
//! | Locking | The lock is never held while the retrieval function runs |
//!
//! Two callers missing on the same path at the same time may both retrieve. The
//! results are idempotent snapshots, so the second store wins harmlessly. A
//! retrieval that overlaps an invalidation is returned to its caller but not
//! stored.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::{FilePath, FilePathInfo, FsError};

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatCacheConfig {
    /// Maximum number of cached paths.
    pub capacity: usize,
    /// How long a snapshot stays valid.
    pub ttl: Duration,
}

impl Default for StatCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatCacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that called the retrieval function.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
}

#[derive(Debug)]
struct Slot {
    info: FilePathInfo,
    expires: Instant,
    tick: u64,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<FilePath, Slot>,
    // recency tick -> path, oldest first
    recency: BTreeMap<u64, FilePath>,
    tick: u64,
    generation: u64,
    stats: StatCacheStats,
}

impl Inner {
    fn touch(&mut self, path: &FilePath) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(slot) = self.slots.get_mut(path) {
            self.recency.remove(&slot.tick);
            slot.tick = tick;
            self.recency.insert(tick, path.clone());
        }
    }

    fn remove(&mut self, path: &FilePath) -> bool {
        match self.slots.remove(path) {
            Some(slot) => {
                self.recency.remove(&slot.tick);
                true
            }
            None => false,
        }
    }
}

/// Thread-safe stat snapshot cache.
///
/// ```rust
/// use devpath::{FilePath, FilePathInfo, StatCache};
///
/// let cache = StatCache::default();
/// let path = FilePath::from_string("/etc/hosts");
/// let mut calls = 0;
/// for _ in 0..3 {
///     cache.get(&path, |_| { calls += 1; Ok(FilePathInfo::not_found()) }).unwrap();
/// }
/// assert_eq!(calls, 1);
/// ```
#[derive(Debug, Default)]
pub struct StatCache {
    config: StatCacheConfig,
    inner: Mutex<Inner>,
}

impl StatCache {
    /// A cache with the given limits.
    pub fn new(config: StatCacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The limits in effect.
    pub fn config(&self) -> StatCacheConfig {
        self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached snapshot of `path`, or the result of `retrieve` stored with a fresh expiry.
    ///
    /// Errors from `retrieve` are passed through and not cached.
    pub fn get<F>(&self, path: &FilePath, retrieve: F) -> Result<FilePathInfo, FsError>
    where
        F: FnOnce(&FilePath) -> Result<FilePathInfo, FsError>,
    {
        self.get_at(path, Instant::now(), retrieve)
    }

    fn get_at<F>(&self, path: &FilePath, now: Instant, retrieve: F) -> Result<FilePathInfo, FsError>
    where
        F: FnOnce(&FilePath) -> Result<FilePathInfo, FsError>,
    {
        let generation = {
            let mut inner = self.lock();
            let fresh = inner
                .slots
                .get(path)
                .filter(|slot| slot.expires > now)
                .map(|slot| slot.info);
            if let Some(info) = fresh {
                inner.stats.hits += 1;
                inner.touch(path);
                return Ok(info);
            }
            inner.stats.misses += 1;
            inner.generation
        };

        let info = retrieve(path)?;

        let mut inner = self.lock();
        if inner.generation == generation {
            self.store(&mut inner, path, info, now);
        }
        Ok(info)
    }

    fn store(&self, inner: &mut Inner, path: &FilePath, info: FilePathInfo, now: Instant) {
        if self.config.capacity == 0 {
            return;
        }
        inner.remove(path);
        while inner.slots.len() >= self.config.capacity {
            let Some((_, oldest)) = inner.recency.pop_first() else {
                break;
            };
            inner.slots.remove(&oldest);
            inner.stats.evictions += 1;
            tracing::trace!(path = %oldest, "stat cache eviction");
        }
        inner.tick += 1;
        let tick = inner.tick;
        inner.recency.insert(tick, path.clone());
        inner.slots.insert(
            path.clone(),
            Slot {
                info,
                expires: now + self.config.ttl,
                tick,
            },
        );
    }

    /// Store a snapshot obtained elsewhere, e.g. from a directory listing.
    pub fn insert(&self, path: &FilePath, info: FilePathInfo) {
        let mut inner = self.lock();
        self.store(&mut inner, path, info, Instant::now());
    }

    /// Drop any cached snapshot of `path`.
    pub fn invalidate(&self, path: &FilePath) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.remove(path);
    }

    /// Drop `path` and everything cached below it.
    pub fn invalidate_tree(&self, path: &FilePath) {
        let mut inner = self.lock();
        inner.generation += 1;
        let doomed: Vec<FilePath> = inner
            .slots
            .keys()
            .filter(|p| *p == path || p.is_child_of(path))
            .cloned()
            .collect();
        for p in &doomed {
            inner.remove(p);
        }
        if !doomed.is_empty() {
            tracing::debug!(path = %path, count = doomed.len(), "stat cache tree invalidated");
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.slots.clear();
        inner.recency.clear();
    }

    /// Number of cached paths, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit, miss and eviction counts since creation.
    pub fn stats(&self) -> StatCacheStats {
        self.lock().stats
    }
}
