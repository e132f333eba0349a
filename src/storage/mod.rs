//! Storage Backends
//!
//! Concrete [`Table`](crate::Table) implementations over the supported
//! engines:
//!
//! - [`MemTable`]: sharded in-memory map, nothing persisted
//! - [`SledTable`]: LSM-style embedded engine `sled`
//! - `RocksTable`: RocksDB, behind the `rocksdb` feature
//!
//! All of them are safe for concurrent use and return keys in ascending order
//! from prefix scans, which the TTL table relies on to walk its slot index.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;
pub mod sled_adapter;

pub use memory::{MemTable, TableStats};
#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::RocksTable;
pub use sled_adapter::SledTable;
