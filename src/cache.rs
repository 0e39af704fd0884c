//! Shared caches.
//!
//! Provides a thread-safe LRU wrapper with hit/miss accounting, and the
//! [`SignerCache`] used by block headers to skip repeated public-key recovery.
//! Caches are plain values: whoever builds the block pipeline creates one and
//! hands out `Arc` clones.
use crate::types::{Address, Bytes32};
use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Lookup counters of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe LRU cache.
///
/// A plain mutex rather than a read/write lock: LRU reads promote the entry,
/// so every access mutates.
pub struct ThreadSafeCache<K: Hash + Eq, V> {
    cache: Mutex<LruCache<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> ThreadSafeCache<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Create a new LRU cache with specified capacity. Zero is treated as one.
    pub fn new_lru(capacity: usize) -> Self {
        let capacity_nz = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity_nz)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a value and mark it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.cache.lock().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert a value, evicting the least recently used entry when full.
    pub fn put(&self, key: K, value: V) {
        self.cache.lock().put(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cache.lock().contains(key)
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Recovered block signers keyed by the hash of the fully signed header.
pub type SignerCache = ThreadSafeCache<Bytes32, Address>;

impl SignerCache {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "creating signer cache");
        Self::new_lru(capacity)
    }
}

impl Default for SignerCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
