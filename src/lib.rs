//! # kvtable - Self-Expiring Key-Value Tables
//!
//! kvtable layers caching behaviour on top of any ordered key-value engine.
//! Its centrepiece is [`TtlTable`], a table whose entries disappear a fixed
//! time after they were last written, without the caller ever deleting them.
//!
//! ## Features
//!
//! - **Pluggable Storage**: anything implementing [`Table`]; in-memory,
//!   sled and (behind the `rocksdb` feature) RocksDB adapters are included
//! - **TTL Expiry**: refresh-on-write lifetimes, enforced lazily on read and
//!   reclaimed in the background by a Tokio sweeper task
//! - **Restart Safe**: the sweep position is persisted in the table itself
//! - **Decorators**: namespaces, serde-typed values and an LRU read cache
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              kvtable                                │
//! │                                                                     │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐ │
//! │  │  TypedTable  │──>│   TtlTable   │──>│        Namespaced        │ │
//! │  │ (serde+Codec)│   │  (KeyLocks)  │   │    (name/ key prefix)    │ │
//! │  └──────────────┘   └──────┬───────┘   └────────────┬─────────────┘ │
//! │                            │                        ▼               │
//! │                            │           ┌──────────────────────────┐ │
//! │                            │           │   MemTable │ SledTable   │ │
//! │                            │           │   RocksTable             │ │
//! │                            │           └──────────────────────────┘ │
//! │                            ▼                        ▲               │
//! │                  ┌───────────────────┐              │               │
//! │                  │      Sweeper      │──────────────┘               │
//! │                  │ (Background Task) │                              │
//! │                  └───────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use kvtable::{MemTable, Namespaced, Table, TtlConfig, TtlTable};
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> kvtable::Result<()> {
//! let engine = Arc::new(MemTable::new());
//! let shutdown = CancellationToken::new();
//!
//! let sessions = TtlTable::new(
//!     Namespaced::new(Arc::clone(&engine), "sessions")?,
//!     TtlConfig::new(Duration::from_secs(60), Duration::from_secs(6)),
//!     &shutdown,
//! )?;
//! sessions.insert("alice", Bytes::from("token"))?;
//! assert_eq!(sessions.size()?, 1);
//!
//! shutdown.cancel();
//! sessions.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`table`]: the [`Table`] trait, namespaces and typed access
//! - [`storage`]: storage engine adapters
//! - [`cache`]: the TTL table and the LRU cache
//! - [`codec`]: value encodings for [`TypedTable`]
//! - [`clock`]: time sources for the TTL table
//! - [`error`]: the crate error type

pub mod cache;
pub mod clock;
pub mod codec;
pub mod error;
pub mod storage;
pub mod table;

// Re-export commonly used types for convenience
pub use cache::{LruTable, TtlConfig, TtlTable};
pub use error::{Error, Result};
pub use storage::{MemTable, SledTable};
pub use table::{Iter, Namespaced, Table, TypedTable};

/// Version of kvtable
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
