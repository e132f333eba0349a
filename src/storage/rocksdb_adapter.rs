//! Persistent table on top of RocksDB (feature `rocksdb`).

use crate::error::{Error, Result};
use crate::table::{check_key, Iter, Table};
use bytes::Bytes;
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A [`Table`] backed by a RocksDB database.
#[derive(Debug, Clone)]
pub struct RocksTable {
    db: Arc<DB>,
}

impl RocksTable {
    /// Opens (or creates) a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened rocksdb database");
        Ok(Self { db: Arc::new(db) })
    }

    /// Collects the pairs under `prefix`. RocksDB iterators borrow the
    /// database, so scans are materialised before they are handed out.
    fn collect_prefix(&self, prefix: &str) -> Result<Vec<(String, Bytes)>> {
        let mut items = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| Error::corrupt(String::from_utf8_lossy(&key), e.to_string()))?;
            items.push((key, Bytes::from(value.to_vec())));
        }
        Ok(items)
    }
}

impl Table for RocksTable {
    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        check_key(key)?;
        self.db.put(key.as_bytes(), &value)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        check_key(key)?;
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Bytes::from(data)),
            None => Err(Error::NotFound),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.db.delete(key.as_bytes())?;
        Ok(())
    }

    fn size(&self) -> Result<usize> {
        self.size_prefix("")
    }

    fn iter(&self) -> Result<Iter> {
        self.scan_prefix("")
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
        let items = self.collect_prefix(prefix)?;
        Ok(Box::new(items.into_iter().map(Ok)))
    }

    fn size_prefix(&self, prefix: &str) -> Result<usize> {
        let mut count = 0;
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}
