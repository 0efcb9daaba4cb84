use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    fetched_at: Instant,
    data: V,
}

/// A generic TTL-keyed cache with a reader/writer split.
///
/// Invariants: a miss never returns stale data; invalidation is idempotent.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `Some(data)` if a fresh entry exists, `None` on miss or stale
    /// age. Reader-locked.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    /// Replaces (or inserts) the entry for `key`. Writer-locked.
    pub fn put(&self, key: K, data: V) {
        let mut entries = self.entries.write();
        entries.insert(
            key,
            Entry {
                fetched_at: Instant::now(),
                data,
            },
        );
    }

    /// Removes the entry for `key`, if any. Idempotent: invalidating an
    /// absent key is a no-op, not an error.
    pub fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write();
        entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
