//! The generic table interface
//!
//! Every backend and every decorator in the crate implements [`Table`], so
//! they stack freely:
//!
//! ```text
//! ┌────────────────────────────┐
//! │         TypedTable         │   serde values over bytes
//! └─────────────┬──────────────┘
//!               ▼
//! ┌────────────────────────────┐
//! │          TtlTable          │   self-expiring entries
//! └─────────────┬──────────────┘
//!               ▼
//! ┌────────────────────────────┐
//! │         Namespaced         │   one named partition
//! └─────────────┬──────────────┘
//!               ▼
//! ┌────────────────────────────┐
//! │ MemTable │ SledTable │ ... │   the storage engine
//! └────────────────────────────┘
//! ```
//!
//! [`LruTable`](crate::cache::LruTable) can sit anywhere in the stack except
//! above a `TtlTable`: its cached copies would outlive their TTL.
//!
//! Keys are non-empty strings and values are opaque bytes. Implementations
//! must be safe for concurrent use.

pub mod namespace;
pub mod typed;

pub use namespace::Namespaced;
pub use typed::TypedTable;

use crate::error::{Error, Result};
use bytes::Bytes;
use std::sync::Arc;

/// A lazy, finite sequence of key/value pairs.
///
/// The iterator reflects the table as it was when it was created; writes made
/// afterwards may or may not be visible depending on the backend.
pub type Iter = Box<dyn Iterator<Item = Result<(String, Bytes)>> + Send>;

/// A keyed store of byte values.
pub trait Table: Send + Sync {
    /// Writes the value under the key, replacing any previous value.
    fn insert(&self, key: &str, value: Bytes) -> Result<()>;

    /// Returns the value for the key, or [`Error::NotFound`].
    fn get(&self, key: &str) -> Result<Bytes>;

    /// Removes the key. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Number of key/value pairs in the table.
    fn size(&self) -> Result<usize>;

    /// Iterates over all key/value pairs.
    fn iter(&self) -> Result<Iter>;

    /// Iterates over the pairs whose key starts with `prefix`, in ascending
    /// key order. Keys are returned in full, prefix included.
    fn scan_prefix(&self, prefix: &str) -> Result<Iter>;

    /// Number of pairs whose key starts with `prefix`.
    fn size_prefix(&self, prefix: &str) -> Result<usize> {
        let mut count = 0;
        for item in self.scan_prefix(prefix)? {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

impl<T: Table + ?Sized> Table for Arc<T> {
    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn size(&self) -> Result<usize> {
        (**self).size()
    }

    fn iter(&self) -> Result<Iter> {
        (**self).iter()
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
        (**self).scan_prefix(prefix)
    }

    fn size_prefix(&self, prefix: &str) -> Result<usize> {
        (**self).size_prefix(prefix)
    }
}

/// Rejects the empty key.
#[inline]
pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        Err(Error::EmptyKey)
    } else {
        Ok(())
    }
}
