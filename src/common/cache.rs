//! Bounded concurrent map used for live runs, deployed workflows and
//! per-run executor scratch values.

use moka::sync::Cache;

/// Thread-safe in-memory cache with a fixed capacity.
///
/// Entries beyond the capacity are evicted by moka's policy, so callers
/// must only store values that can be recovered or that are short-lived.
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Cache::new(capacity as u64),
        }
    }

    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    pub fn contains(
        &self,
        key: &K,
    ) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes the entry and hands it back to the caller.
    pub fn take(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn remove(
        &self,
        key: &K,
    ) {
        self.entries.invalidate(key);
    }

    pub fn iter(&self) -> moka::sync::Iter<'_, K, V> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::MemCache;

    #[test]
    fn test_take_removes_entry() {
        let cache: MemCache<String, u32> = MemCache::new(8);
        cache.set("a".to_string(), 1);
        assert!(cache.contains(&"a".to_string()));
        assert_eq!(cache.take(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"a".to_string()), None);
    }
}
