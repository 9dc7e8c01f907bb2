//! Pluggable map backends for the in-memory record set.
//!
//! Implement [`MapBackend`] to bring your own map. The order that
//! [`iter_snapshot`](MapBackend::iter_snapshot) yields is the order
//! [`find_all`](crate::ProductStore::find_all) returns and the order records
//! are written to disk:
//!
//! - [`OrderedMap`] (default): insertion order.
//! - `dashmap::DashMap`, `parking_lot::RwLock<HashMap>`: unspecified.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// Trait a map must satisfy to hold a store's records.
///
/// Every method works with owned values so the store's API stays uniform
/// regardless of how the backend keeps things internally.
pub trait MapBackend<K, V>: Send + Sync
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Insert a key-value pair, returning the previous value if any.
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Look up a value by key.
    fn get(&self, key: &K) -> Option<V>;

    /// Remove a key, returning its value if it was present.
    fn remove(&self, key: &K) -> Option<V>;

    /// Snapshot of all entries. Must not hold locks once returned.
    fn iter_snapshot(&self) -> Vec<(K, V)>;

    /// Number of entries.
    fn map_len(&self) -> usize;

    /// Check if a key exists without cloning the value.
    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

// ---- OrderedMap ----------------------------------------------------------------

/// Map that remembers insertion order. Replacing the value of an existing key
/// keeps its original position.
#[derive(Debug)]
pub struct OrderedMap<K, V> {
    inner: RwLock<Ordered<K, V>>,
}

#[derive(Debug)]
struct Ordered<K, V> {
    values: HashMap<K, V>,
    order: Vec<K>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Ordered {
                values: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }
}

impl<K, V> MapBackend<K, V> for OrderedMap<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn insert(&self, key: K, value: V) -> Option<V> {
        let mut guard = self.inner.write();
        let prev = guard.values.insert(key.clone(), value);
        if prev.is_none() {
            guard.order.push(key);
        }
        prev
    }

    fn get(&self, key: &K) -> Option<V> {
        self.inner.read().values.get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.write();
        let prev = guard.values.remove(key);
        if prev.is_some() {
            guard.order.retain(|k| k != key);
        }
        prev
    }

    fn iter_snapshot(&self) -> Vec<(K, V)> {
        let guard = self.inner.read();
        guard
            .order
            .iter()
            .filter_map(|k| guard.values.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    fn map_len(&self) -> usize {
        self.inner.read().values.len()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.inner.read().values.contains_key(key)
    }
}

// ---- DashMap -------------------------------------------------------------------

impl<K, V> MapBackend<K, V> for dashmap::DashMap<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn insert(&self, key: K, value: V) -> Option<V> {
        dashmap::DashMap::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        dashmap::DashMap::get(self, key).map(|r| r.value().clone())
    }

    fn remove(&self, key: &K) -> Option<V> {
        dashmap::DashMap::remove(self, key).map(|(_, v)| v)
    }

    // collected before returning so no shard guard outlives the call
    fn iter_snapshot(&self) -> Vec<(K, V)> {
        self.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn map_len(&self) -> usize {
        self.len()
    }

    fn contains_key(&self, key: &K) -> bool {
        dashmap::DashMap::contains_key(self, key)
    }
}

// ---- RwLock<HashMap> -----------------------------------------------------------

impl<K, V> MapBackend<K, V> for RwLock<HashMap<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.write().remove(key)
    }

    fn iter_snapshot(&self) -> Vec<(K, V)> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn map_len(&self) -> usize {
        self.read().len()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }
}
