use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

struct Entry<V> {
    value: Arc<V>,
    refcount: usize,
    last_used: u64,
}

/// A keyed cache of `Arc<V>` values with a soft capacity: entries with a
/// zero refcount are evicted oldest-first once the live entry count
/// exceeds `capacity`. Entries still checked out (`refcount > 0`) are
/// never evicted, so capacity is advisory, not a hard bound — going over
/// it just logs rather than failing, matching the original's
/// "log and keep going" policy for transient over-subscription.
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity,
            entries: HashMap::new(),
        }
    }

    pub fn increase_capacity(&mut self, capacity: usize) {
        if capacity > self.capacity {
            self.capacity = capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached value for `key`, building it with `build` on a
    /// miss, and incrementing its refcount. Callers must pair this with
    /// [`Self::release`] once they are done with the value.
    pub fn get(&mut self, key: K, build: impl FnOnce() -> V) -> Arc<V> {
        let now = colorscreen_core::ids::next_id();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.refcount += 1;
            entry.last_used = now;
            return entry.value.clone();
        }

        self.evict_if_over_capacity();

        let value = Arc::new(build());
        self.entries.insert(
            key,
            Entry {
                value: value.clone(),
                refcount: 1,
                last_used: now,
            },
        );
        value
    }

    /// Decrements the refcount of `key`, making it eligible for eviction
    /// again once it reaches zero.
    pub fn release(&mut self, key: &K) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.refcount = entry.refcount.saturating_sub(1);
        }
    }

    /// Drops every entry with a zero refcount, regardless of capacity.
    pub fn prune(&mut self) {
        self.entries.retain(|_, e| e.refcount > 0);
    }

    fn evict_if_over_capacity(&mut self) {
        if self.entries.len() < self.capacity {
            return;
        }
        let victim = self
            .entries
            .iter()
            .filter(|(_, e)| e.refcount == 0)
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone());

        match victim {
            Some(k) => {
                self.entries.remove(&k);
            }
            None => {
                tracing::warn!(
                    capacity = self.capacity,
                    live = self.entries.len(),
                    "cache over capacity but every entry is checked out; growing instead of evicting"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once_and_reuses_on_hit() {
        let mut cache: LruCache<u32, String> = LruCache::new(4);
        let mut builds = 0;
        let a = cache.get(1, || {
            builds += 1;
            "a".to_string()
        });
        let b = cache.get(1, || {
            builds += 1;
            "a".to_string()
        });
        assert_eq!(*a, *b);
        assert_eq!(builds, 1);
    }

    #[test]
    fn evicts_oldest_unreferenced_entry_over_capacity() {
        let mut cache: LruCache<u32, u32> = LruCache::new(2);
        cache.get(1, || 1);
        cache.release(&1);
        cache.get(2, || 2);
        cache.release(&2);
        // Over capacity: key 1 is the oldest with refcount 0, gets evicted.
        cache.get(3, || 3);
        cache.release(&3);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn checked_out_entries_survive_eviction_pressure() {
        let mut cache: LruCache<u32, u32> = LruCache::new(1);
        let _held = cache.get(1, || 1);
        cache.get(2, || 2);
        assert_eq!(cache.len(), 2);
    }
}
