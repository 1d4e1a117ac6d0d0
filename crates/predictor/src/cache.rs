//! Fingerprint-keyed prediction memoization
//!
//! Entries go from absent to present exactly once per fingerprint and are
//! never invalidated. Two optional behaviours sit on top of that:
//! a size bound (least recently used evicted first) and full-key
//! verification, which turns a 32-bit fingerprint collision into a miss.

use crate::config::CacheConfig;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: f32,
    /// Full encoded vector, kept only when keys are verified
    key: Option<Box<[f32]>>,
}

/// Outcome of probing the cache
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup {
    Hit(f32),
    Miss,
    /// Fingerprint present but the stored vector differs
    Collision,
}

/// Fingerprint → prediction map
#[derive(Debug)]
pub struct PredictionCache {
    entries: LruCache<u32, CacheEntry>,
    verify_keys: bool,
}

impl PredictionCache {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = match config.max_entries {
            Some(max) => LruCache::new(NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN)),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            verify_keys: config.verify_keys,
        }
    }

    /// Unbounded cache without key verification
    pub fn unbounded() -> Self {
        Self::new(&CacheConfig::default())
    }

    /// Probe `fingerprint`; a hit marks the entry as most recently used
    pub fn lookup(&mut self, fingerprint: u32, key: &[f32]) -> Lookup {
        match self.entries.get(&fingerprint) {
            None => Lookup::Miss,
            Some(entry) => match &entry.key {
                Some(stored) if !same_bits(stored, key) => Lookup::Collision,
                _ => Lookup::Hit(entry.value),
            },
        }
    }

    /// Store `value` under `fingerprint`, returning the evicted fingerprint if any
    pub fn insert(&mut self, fingerprint: u32, key: &[f32], value: f32) -> Option<u32> {
        let entry = CacheEntry {
            value,
            key: self.verify_keys.then(|| key.into()),
        };
        match self.entries.push(fingerprint, entry) {
            // replaced in place
            Some((old, _)) if old == fingerprint => None,
            Some((evicted, _)) => Some(evicted),
            None => None,
        }
    }

    /// Presence check that leaves the recency order alone
    pub fn contains(&self, fingerprint: u32) -> bool {
        self.entries.contains(&fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn same_bits(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Lock-free cache counters
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub scorer_calls: AtomicU64,
    pub collisions: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheMetrics {
    pub fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            scorer_calls: self.scorer_calls.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries,
        }
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub scorer_calls: u64,
    pub collisions: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hits over total lookups, 0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
