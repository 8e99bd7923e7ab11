use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Default LRU-K parameter and default residency bound (§4.3).
pub const DEFAULT_K: usize = 4;
pub const DEFAULT_CAPACITY: usize = 8192;

struct Entry<V> {
    value: V,
    dirty: bool,
    history: VecDeque<u64>,
}

/// An LRU-K page cache keyed by an opaque key (typically a file offset).
///
/// The source ties eviction directly to a write-back closure captured by
/// `this`; Rust's aliasing rules make that self-referential shape awkward
/// (the closure would need `&mut` access to the very struct that owns the
/// cache). Instead, mutation methods here return evicted entries to the
/// caller, who performs the write-back — [`crate::cached_file::CachedPagedFile`]
/// is the component responsible for that, preserving the same "write back
/// dirty pages on eviction/flush" semantics (§4.3–§4.4).
pub struct LruKCache<K, V> {
    k: usize,
    capacity: usize,
    clock: u64,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruKCache<K, V> {
    pub fn new(k: usize, capacity: usize) -> Self {
        assert!(k >= 1, "K must be at least 1");
        Self {
            k,
            capacity,
            clock: 0,
            entries: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_K, DEFAULT_CAPACITY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// The oldest of the last K access timestamps, or 0 if fewer than K
    /// accesses have been recorded (§4.3: such entries are strictly
    /// evictable before any K-hot page).
    fn kth_access(entry: &Entry<V>, k: usize) -> u64 {
        if entry.history.len() < k {
            0
        } else {
            *entry.history.front().unwrap()
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let k = self.k;
        let entry = self.entries.get_mut(key)?;
        self.clock += 1;
        entry.history.push_back(self.clock);
        if entry.history.len() > k {
            entry.history.pop_front();
        }
        Some(entry.value.clone())
    }

    /// Inserts or updates `key`, returning an evicted `(key, value)` pair if
    /// residency exceeded `capacity` as a result (the caller must write it
    /// back if it was dirty before discarding it).
    pub fn put(&mut self, key: K, value: V, dirty: bool) -> Option<(K, V, bool)> {
        self.clock += 1;
        let clock = self.clock;
        let k = self.k;
        let entry = self.entries.entry(key).or_insert_with(|| Entry {
            value: value.clone(),
            dirty: false,
            history: VecDeque::new(),
        });
        entry.value = value;
        entry.dirty = entry.dirty || dirty;
        entry.history.push_back(clock);
        if entry.history.len() > k {
            entry.history.pop_front();
        }

        if self.entries.len() > self.capacity {
            self.evict()
        } else {
            None
        }
    }

    pub fn mark_dirty(&mut self, key: &K) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.dirty = true;
        }
    }

    fn evict(&mut self) -> Option<(K, V, bool)> {
        let k = self.k;
        let victim_key = self
            .entries
            .iter()
            .min_by_key(|(_, e)| Self::kth_access(e, k))
            .map(|(key, _)| key.clone())?;
        let entry = self.entries.remove(&victim_key)?;
        Some((victim_key, entry.value, entry.dirty))
    }

    /// Drains every dirty entry for write-back, marking all entries clean.
    /// Mirrors `flush()` in §4.3.
    pub fn drain_dirty(&mut self) -> Vec<(K, V)> {
        let mut out = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            if entry.dirty {
                out.push((key.clone(), entry.value.clone()));
                entry.dirty = false;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residency_bound_triggers_eviction() {
        let mut cache: LruKCache<i32, i32> = LruKCache::new(2, 2);
        assert!(cache.put(1, 10, false).is_none());
        assert!(cache.put(2, 20, false).is_none());
        let evicted = cache.put(3, 30, false);
        assert!(evicted.is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn dirty_until_flushed() {
        let mut cache: LruKCache<i32, i32> = LruKCache::new(4, 8);
        cache.put(1, 10, true);
        let dirty = cache.drain_dirty();
        assert_eq!(dirty, vec![(1, 10)]);
        assert!(cache.drain_dirty().is_empty());
    }

    #[test]
    fn cold_entries_evicted_before_hot_ones() {
        let mut cache: LruKCache<i32, i32> = LruKCache::new(2, 2);
        cache.put(1, 10, false);
        cache.get(&1);
        cache.get(&1); // key 1 now has 2 recorded accesses (K-hot)
        cache.put(2, 20, false); // key 2 has fewer than K accesses -> evictable first
        let evicted = cache.put(3, 30, false).unwrap();
        assert_eq!(evicted.0, 2);
    }
}
