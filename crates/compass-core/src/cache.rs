//! Version-tagged value cache
//!
//! One generic cache covers both parsed trees and dependency tables: a map
//! from file identity to a value stamped with the source revision it was
//! computed from. A hit requires an exact revision match; stale entries are
//! evicted before recomputation. Capacity is bounded with LRU eviction.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

#[derive(Debug)]
struct CacheEntry<V> {
    revision: u64,
    last_used: u64,
    value: Arc<V>,
}

#[derive(Debug)]
pub struct VersionedCache<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash + Clone, V> VersionedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached value only when its revision matches exactly.
    /// A revision mismatch evicts the stale entry.
    pub fn get(&mut self, key: &K, revision: u64) -> Option<Arc<V>> {
        match self.entries.get_mut(key) {
            Some(entry) if entry.revision == revision => {
                self.tick += 1;
                entry.last_used = self.tick;
                Some(Arc::clone(&entry.value))
            }
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: K, revision: u64, value: Arc<V>) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_least_recently_used();
        }
        self.tick += 1;
        self.entries.insert(
            key,
            CacheEntry {
                revision,
                last_used: self.tick,
                value,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_least_recently_used(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
