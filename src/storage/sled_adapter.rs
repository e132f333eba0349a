//! Persistent table on top of the `sled` embedded engine.

use crate::error::{Error, Result};
use crate::table::{check_key, Iter, Table};
use bytes::Bytes;
use std::path::Path;
use tracing::{debug, info};

/// Tree used when a table is opened straight from a path.
const DEFAULT_TREE: &str = "kvtable";

/// A [`Table`] stored in one `sled` tree.
///
/// Several tables can share one database by opening different trees with
/// [`SledTable::from_db`].
#[derive(Debug, Clone)]
pub struct SledTable {
    tree: sled::Tree,
}

impl SledTable {
    /// Opens (or creates) a database at `path` and uses its default tree.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!(path = %path.display(), "Opened sled database");
        Self::from_db(&db, DEFAULT_TREE)
    }

    /// Uses the tree `name` of an already opened database.
    pub fn from_db(db: &sled::Db, name: &str) -> Result<Self> {
        let tree = db.open_tree(name)?;
        Ok(Self { tree })
    }

    /// Flushes dirty buffers to disk, returning the number of bytes written.
    pub fn flush(&self) -> Result<usize> {
        let written = self.tree.flush()?;
        debug!(bytes = written, "sled tree flushed");
        Ok(written)
    }
}

fn decode_key(key: &[u8]) -> Result<String> {
    String::from_utf8(key.to_vec())
        .map_err(|e| Error::corrupt(String::from_utf8_lossy(key), e.to_string()))
}

impl Table for SledTable {
    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        check_key(key)?;
        self.tree.insert(key.as_bytes(), value.as_ref())?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        check_key(key)?;
        match self.tree.get(key.as_bytes())? {
            Some(ivec) => Ok(Bytes::copy_from_slice(&ivec)),
            None => Err(Error::NotFound),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }

    fn size(&self) -> Result<usize> {
        Ok(self.tree.len())
    }

    fn iter(&self) -> Result<Iter> {
        self.scan_prefix("")
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
        let iter = self.tree.scan_prefix(prefix.as_bytes()).map(|item| {
            let (key, value) = item?;
            Ok((decode_key(&key)?, Bytes::copy_from_slice(&value)))
        });
        Ok(Box::new(iter))
    }
}
