//! Scoped TTL cache.
//!
//! A small least-recently-used cache where every entry also expires after
//! a fixed time-to-live. Capacity and TTL are constructor arguments, so
//! each consumer owns an explicitly-scoped instance instead of sharing a
//! module-level static.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// LRU cache with per-entry expiry.
///
/// Eviction scans linearly for the oldest access; for the small working
/// sets this crate keeps (per-individual summaries), that beats
/// maintaining a linked list.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
    access_counter: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    last_access: u64,
    inserted_at: Instant,
}

impl<K: Eq + Hash + Clone, V> TtlCache<K, V> {
    /// Create a cache holding up to `capacity` entries, each valid for
    /// `ttl` after insertion.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: HashMap::with_capacity(capacity),
            access_counter: 0,
        }
    }

    /// Get a live value, updating its access time. Expired entries are
    /// removed on the way out.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted_at.elapsed() >= self.ttl {
                self.entries.remove(key);
                return None;
            }
        }
        if let Some(entry) = self.entries.get_mut(key) {
            self.access_counter += 1;
            entry.last_access = self.access_counter;
            Some(&entry.value)
        } else {
            None
        }
    }

    /// Insert a value, evicting the least recently used entry if at
    /// capacity. Re-inserting an existing key restarts its TTL.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(entry) = self.entries.get_mut(&key) {
            self.access_counter += 1;
            entry.value = value;
            entry.last_access = self.access_counter;
            entry.inserted_at = Instant::now();
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }

        self.access_counter += 1;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: self.access_counter,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove a specific key.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_counter = 0;
    }

    /// Number of stored entries, expired ones included until touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a live (non-expired) entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() < self.ttl)
    }

    fn evict_oldest(&mut self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest_key {
            self.entries.remove(&key);
        }
    }
}
