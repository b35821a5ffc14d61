//! Fixed-capacity memo cache
//!
//! Key normalization and recipient canonicalization are pure functions that
//! get called with the same handful of inputs over and over (every header on
//! every row, every whitelist entry for every recipient). `BoundedCache`
//! remembers recent results with a hard cap on how many it holds.
//!
//! Eviction is least recently used, delegated to [`lru::LruCache`].

use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Least-recently-used cache holding at most `capacity` entries
#[derive(Debug)]
pub struct BoundedCache<K: Hash + Eq, V> {
    entries: Option<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    /// Create an empty cache; a capacity of zero disables caching
    pub fn new(capacity: usize) -> Self {
        BoundedCache {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.cap().get())
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    pub fn get_or_insert_with<Q, F>(&mut self, key: &Q, compute: F) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> V,
    {
        let Some(entries) = self.entries.as_mut() else {
            return compute();
        };
        if let Some(value) = entries.get(key) {
            return value.clone();
        }
        let value = compute();
        entries.put(key.to_owned(), value.clone());
        value
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }
}

/// Run `compute` through a shared cache guarded by a mutex
///
/// A poisoned lock only means another caller panicked mid-update; cached
/// values are still valid results of a pure function, so the guard is reused.
pub fn memoize<Q, V, F>(cache: &Mutex<BoundedCache<Q::Owned, V>>, key: &Q, compute: F) -> V
where
    Q: Hash + Eq + ToOwned + ?Sized,
    Q::Owned: Hash + Eq + Borrow<Q>,
    V: Clone,
    F: FnOnce() -> V,
{
    let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(key, compute)
}
