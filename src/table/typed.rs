//! Typed access to a byte table through a [`Codec`].

use crate::codec::Codec;
use crate::error::Result;
use crate::table::Table;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Wraps a [`Table`] so callers read and write serde values instead of bytes.
///
/// # Example
///
/// ```
/// use kvtable::codec::JsonCodec;
/// use kvtable::storage::MemTable;
/// use kvtable::table::TypedTable;
///
/// let table = TypedTable::new(MemTable::new(), JsonCodec);
/// table.insert("answer", &42u32).unwrap();
/// assert_eq!(table.get::<u32>("answer").unwrap(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct TypedTable<T, C> {
    table: T,
    codec: C,
}

impl<T: Table, C: Codec> TypedTable<T, C> {
    pub fn new(table: T, codec: C) -> Self {
        Self { table, codec }
    }

    pub fn inner(&self) -> &T {
        &self.table
    }

    pub fn insert<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<()> {
        let data = self.codec.encode(value)?;
        self.table.insert(key, data)
    }

    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<V> {
        let data = self.table.get(key)?;
        self.codec.decode(&data).inspect_err(|e| {
            debug!(key, codec = self.codec.name(), error = %e, "Failed to decode stored value");
        })
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.table.delete(key)
    }

    pub fn size(&self) -> Result<usize> {
        self.table.size()
    }

    /// Iterates over all pairs, decoding each value as `V`.
    pub fn iter<V: DeserializeOwned>(
        &self,
    ) -> Result<impl Iterator<Item = Result<(String, V)>> + '_> {
        let iter = self.table.iter()?;
        Ok(iter.map(move |item| {
            let (key, data) = item?;
            let value = self.codec.decode(&data)?;
            Ok((key, value))
        }))
    }
}
