//! Lazy, per-key memoization of parsed manifests.
//!
//! Each key owns a slot. Populated slots are read without locking; the first
//! caller to find a slot empty takes the slot's load lock, and concurrent callers
//! for the same key wait on that lock and then read the stored value. A failed
//! load leaves the slot empty, so the next caller retries.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::comparisons::ComparisonTable;
use crate::index::{MasterFileIndex, TemplateIndex};
use crate::protocol::Protocol;

struct Slot<V> {
    value: OnceLock<Arc<V>>,
    loading: Mutex<()>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: OnceLock::new(),
            loading: Mutex::new(()),
        }
    }
}

/// Single-flight cache from `K` to shared, immutable `V`.
pub struct LoadCache<K, V> {
    slots: DashMap<K, Arc<Slot<V>>>,
    loads: AtomicUsize,
    hits: AtomicUsize,
}

impl<K, V> Default for LoadCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
            loads: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }
}

impl<K, V> LoadCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `load` at most once per key.
    pub fn get_or_try_load<E, F>(&self, key: &K, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        // Clone the slot out so no map shard lock is held while loading. Existing
        // slots only need the shard's read lock.
        let existing = self.slots.get(key).map(|slot| Arc::clone(slot.value()));
        let slot = match existing {
            Some(slot) => slot,
            None => Arc::clone(self.slots.entry(key.clone()).or_default().value()),
        };

        if let Some(value) = slot.value.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(value));
        }

        let _guard = slot.loading.lock();
        if let Some(value) = slot.value.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(value));
        }

        let value = Arc::new(load()?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        // Only the lock holder sets the slot, so this cannot already be full.
        let _ = slot.value.set(Arc::clone(&value));
        Ok(value)
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.slots
            .get(key)
            .and_then(|slot| slot.value.get().cloned())
    }

    /// Every populated entry.
    pub fn values(&self) -> Vec<Arc<V>> {
        self.slots
            .iter()
            .filter_map(|entry| entry.value().value.get().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().value.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Drop every entry and zero the counters.
    pub fn clear(&self) {
        self.slots.clear();
        self.loads.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
    }
}

/// Key of a cached template index or comparison table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Shared by every protocol that resolves to this file.
    Manifest(PathBuf),
    /// Private to one protocol.
    Protocol(Protocol, PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub master_loads: usize,
    pub template_loads: usize,
    pub comparison_loads: usize,
    pub hits: usize,
    pub entries: usize,
}

impl CacheStats {
    pub fn total_loads(&self) -> usize {
        self.master_loads + self.template_loads + self.comparison_loads
    }
}

/// All memoized state of one [`crate::Database`].
#[derive(Default)]
pub struct QueryCache {
    pub(crate) master: LoadCache<PathBuf, MasterFileIndex>,
    pub(crate) templates: LoadCache<CacheKey, TemplateIndex>,
    pub(crate) comparisons: LoadCache<CacheKey, ComparisonTable>,
}

impl QueryCache {
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            master_loads: self.master.loads(),
            template_loads: self.templates.loads(),
            comparison_loads: self.comparisons.loads(),
            hits: self.master.hits() + self.templates.hits() + self.comparisons.hits(),
            entries: self.master.len() + self.templates.len() + self.comparisons.len(),
        }
    }

    pub fn clear(&self) {
        self.master.clear();
        self.templates.clear();
        self.comparisons.clear();
    }
}
