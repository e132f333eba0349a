//! LRU Read Cache
//!
//! [`LruTable`] keeps the most recently used entries of another table in
//! memory. Writes go straight through to the inner table; reads are served
//! from memory when possible and cached on the way back otherwise.
//!
//! The cache holds a subset of the data, so `size`, `iter` and `scan_prefix`
//! always go to the inner table.
//!
//! Do not put an `LruTable` on top of a
//! [`TtlTable`](crate::cache::ttl::TtlTable): a cached entry would keep being
//! served after the TTL table has expired it.

use crate::error::Result;
use crate::table::{check_key, Iter, Table};
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

#[derive(Debug)]
struct LruState {
    cache: LruCache<String, Bytes>,
    /// Bumped by every write; a read-through only caches its result if no
    /// write happened while it was reading the inner table.
    epoch: u64,
}

impl LruState {
    fn put(&mut self, key: &str, value: Bytes) {
        if let Some((evicted, _)) = self.cache.push(key.to_owned(), value) {
            if evicted != key {
                trace!(key = %evicted, "Evicted least recently used entry");
            }
        }
    }
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub cached: usize,
}

/// A [`Table`] that caches up to `capacity` recently used entries of another.
#[derive(Debug)]
pub struct LruTable<T> {
    inner: T,
    state: Mutex<LruState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Table> LruTable<T> {
    pub fn new(inner: T, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            state: Mutex::new(LruState {
                cache: LruCache::new(capacity),
                epoch: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.state.lock().cache.cap()
    }

    /// Number of entries currently held in memory.
    pub fn cached_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cached: self.cached_len(),
        }
    }
}

impl<T: Table> Table for LruTable<T> {
    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        check_key(key)?;
        let epoch = {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.cache.pop(key);
            state.epoch
        };
        self.inner.insert(key, value.clone())?;

        // A later write may have landed in the inner table first.
        let mut state = self.state.lock();
        if state.epoch == epoch {
            state.put(key, value);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        check_key(key)?;
        let epoch = {
            let mut state = self.state.lock();
            if let Some(value) = state.cache.get(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value.clone());
            }
            state.epoch
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = self.inner.get(key)?;

        let mut state = self.state.lock();
        if state.epoch == epoch {
            state.put(key, value.clone());
        }
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.cache.pop(key);
        }
        self.inner.delete(key)
    }

    fn size(&self) -> Result<usize> {
        self.inner.size()
    }

    fn iter(&self) -> Result<Iter> {
        self.inner.iter()
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
        self.inner.scan_prefix(prefix)
    }
}
