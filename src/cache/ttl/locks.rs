//! Per-key mutual exclusion.
//!
//! Writers to the same key must not interleave their marker updates, or a key
//! could end up with two live markers. Rather than one lock for the whole
//! table, keys hash onto a fixed set of mutexes: two operations on different
//! keys only contend when their keys share a shard.

use parking_lot::{Mutex, MutexGuard};
use std::hash::{DefaultHasher, Hash, Hasher};

const NUM_SHARDS: usize = 64;

#[derive(Debug)]
pub(crate) struct KeyLocks {
    shards: Vec<Mutex<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    #[inline]
    fn shard_index(key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    /// Blocks until the caller holds exclusive access to `key`.
    ///
    /// Only one key may be locked at a time per thread.
    pub fn lock(&self, key: &str) -> MutexGuard<'_, ()> {
        self.shards[Self::shard_index(key)].lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let _guard = locks.lock("hot");
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let locks = KeyLocks::new();
        drop(locks.lock("a"));
        let _again = locks.lock("a");
    }
}
