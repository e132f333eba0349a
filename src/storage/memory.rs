//! Sharded In-Memory Table
//!
//! A concurrent map split into independent shards, each behind its own
//! `RwLock`. Keys are distributed across shards by hash, so writers to
//! different keys rarely contend.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MemTable                             │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ BTreeMap│ │ BTreeMap│ │ BTreeMap│ │ BTreeMap│           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Shards hold ordered maps so prefix scans can seek instead of filtering
//! every key. A scan takes each shard's read lock in turn, copies the matching
//! range and merges the pieces into one sorted snapshot.

use crate::error::{Error, Result};
use crate::table::{check_key, Iter, Table};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of shards for the table.
/// More shards = less lock contention, but more memory overhead.
const NUM_SHARDS: usize = 64;

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<BTreeMap<String, Bytes>>,
}

/// An in-memory [`Table`].
///
/// Fast and safe for concurrent use, but nothing survives the process.
///
/// # Example
///
/// ```
/// use kvtable::storage::MemTable;
/// use kvtable::Table;
/// use bytes::Bytes;
///
/// let table = MemTable::new();
/// table.insert("name", Bytes::from("Ariz")).unwrap();
/// assert_eq!(table.get("name").unwrap(), Bytes::from("Ariz"));
/// ```
pub struct MemTable {
    shards: Vec<Shard>,

    /// Statistics: total number of keys
    key_count: AtomicU64,

    /// Statistics: total get operations
    get_count: AtomicU64,

    /// Statistics: total insert operations
    insert_count: AtomicU64,

    /// Statistics: total delete operations
    delete_count: AtomicU64,
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTable")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            insert_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn get_shard(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Returns operation statistics.
    pub fn stats(&self) -> TableStats {
        TableStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            insert_ops: self.insert_count.load(Ordering::Relaxed),
            delete_ops: self.delete_count.load(Ordering::Relaxed),
        }
    }

    /// Removes every key.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.data.write().clear();
        }
        self.key_count.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self, prefix: &str) -> Vec<(String, Bytes)> {
        let mut items = Vec::new();
        for shard in &self.shards {
            let data = shard.data.read();
            items.extend(
                data.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                    .take_while(|(key, _)| key.starts_with(prefix))
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }
        items.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        items
    }
}

impl Table for MemTable {
    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        check_key(key)?;
        self.insert_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(key).data.write();
        if data.insert(key.to_owned(), value).is_none() {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        check_key(key)?;
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let data = self.get_shard(key).data.read();
        data.get(key).cloned().ok_or(Error::NotFound)
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.delete_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(key).data.write();
        if data.remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn size(&self) -> Result<usize> {
        Ok(self.key_count.load(Ordering::Relaxed) as usize)
    }

    fn iter(&self) -> Result<Iter> {
        self.scan_prefix("")
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
        Ok(Box::new(self.snapshot(prefix).into_iter().map(Ok)))
    }

    fn size_prefix(&self, prefix: &str) -> Result<usize> {
        if prefix.is_empty() {
            return self.size();
        }
        let count = self
            .shards
            .iter()
            .map(|shard| {
                shard
                    .data
                    .read()
                    .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                    .take_while(|(key, _)| key.starts_with(prefix))
                    .count()
            })
            .sum();
        Ok(count)
    }
}

/// Table statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Total get operations
    pub get_ops: u64,
    /// Total insert operations
    pub insert_ops: u64,
    /// Total delete operations
    pub delete_ops: u64,
}
