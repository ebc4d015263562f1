//! Per-server item cache with LRU eviction.
//!
//! The cache stores no payload, only the presence of an item key, and is used
//! as a hit/miss oracle when a request is admitted:
//! - [`ItemCache::lookup`] checks presence without touching recency
//! - [`ItemCache::insert`] runs on completion, refreshing or adding the key
//!   and evicting the least recently used key on overflow

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Bounded key-presence cache for a single server.
#[derive(Debug, Clone)]
pub struct ItemCache {
    /// `None` for a zero-capacity cache, which never holds anything.
    entries: Option<LruCache<u64, ()>>,
    /// Lookups that found the key.
    pub hits: u64,
    /// Lookups that did not find the key.
    pub misses: u64,
    /// Keys pushed out to make room.
    pub evictions: u64,
}

/// Statistics snapshot for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub len: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
}

impl ItemCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.cap().get())
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is cached. Recency is left unchanged.
    pub fn lookup(&mut self, key: u64) -> bool {
        let present = self.contains(key);
        if present {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        present
    }

    /// Presence check that neither counts nor touches recency.
    pub fn contains(&self, key: u64) -> bool {
        self.entries.as_ref().is_some_and(|e| e.contains(&key))
    }

    /// Mark `key` present as the most recently used entry.
    pub fn insert(&mut self, key: u64) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        // `push` hands back the displaced pair: either the old entry for the
        // same key or the evicted LRU entry.
        if let Some((displaced, ())) = entries.push(key, ()) {
            if displaced != key {
                self.evictions += 1;
            }
        }
    }

    /// Key that the next overflowing insert would evict.
    pub fn least_recent(&self) -> Option<u64> {
        self.entries
            .as_ref()
            .and_then(|e| e.peek_lru().map(|(key, _)| *key))
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity(),
            len: self.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: self.hit_rate(),
            evictions: self.evictions,
        }
    }
}
