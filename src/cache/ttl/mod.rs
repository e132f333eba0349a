//! Self-Expiring TTL Table
//!
//! [`TtlTable`] wraps any [`Table`] and forgets entries that have not been
//! rewritten within `time_to_live`. Callers never delete anything to make
//! that happen.
//!
//! ## How It Works
//!
//! Time is cut into slots of `prune_interval`. Every live key has exactly one
//! marker, in the slot of its latest insert; re-inserting a key moves its
//! marker forward. Expiry happens two ways:
//!
//! 1. **Lazy**: reads compare the record's write time with the clock, so a
//!    dead entry is never returned, even before the sweeper reaches it
//! 2. **Active**: a background sweeper walks whole slots once they are past
//!    the TTL, removing markers and their records
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          TtlTable                            │
//! │   insert/get/delete ──▶ KeyLocks (64 shards) ──┐             │
//! │                                                ▼             │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │                  underlying Table                    │   │
//! │   │  data:<key>   slot:<S>:<key>   meta:prune_pointer    │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! │                                                ▲             │
//! │                   Sweeper (Tokio task) ────────┘             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The underlying table should be dedicated to one TTL table (use
//! [`Namespaced`](crate::table::Namespaced) to share an engine), and owned by a
//! single process.
//!
//! ## Example
//!
//! ```
//! use kvtable::cache::ttl::{TtlConfig, TtlTable};
//! use kvtable::storage::MemTable;
//! use kvtable::Table;
//! use bytes::Bytes;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> kvtable::Result<()> {
//! let shutdown = CancellationToken::new();
//! let config = TtlConfig::new(Duration::from_secs(30), Duration::from_secs(3));
//! let sessions = TtlTable::new(MemTable::new(), config, &shutdown)?;
//!
//! sessions.insert("session:42", Bytes::from("token"))?;
//! assert_eq!(sessions.get("session:42")?, Bytes::from("token"));
//!
//! shutdown.cancel();
//! # Ok(())
//! # }
//! ```

pub mod config;
mod index;
mod locks;
pub mod sweeper;

pub use config::TtlConfig;
pub use sweeper::{SweepReport, SweeperState};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::table::{check_key, Iter, Table};
use bytes::Bytes;
use index::{Record, Schedule, DATA_PREFIX, PRUNE_POINTER_KEY};
use locks::KeyLocks;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sweeper::Sweeper;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// State shared between callers and the sweeper task.
#[derive(Debug)]
pub(crate) struct Core<T> {
    table: T,
    schedule: Schedule,
    prune_interval: Duration,
    locks: KeyLocks,
    clock: Arc<dyn Clock>,
    /// Highest fully swept slot, updated once the sweep has persisted it
    pointer: AtomicI64,
    /// Held for the length of a sweep so two sweeps never overlap
    sweep_lock: Mutex<()>,
}

/// A [`Table`] whose entries expire `time_to_live` after their last insert.
#[derive(Debug)]
pub struct TtlTable<T: Table + 'static> {
    core: Arc<Core<T>>,
    sweeper: Sweeper,
}

impl<T: Table + 'static> TtlTable<T> {
    /// Wraps `table` and starts the background sweeper on the current Tokio
    /// runtime. The sweeper stops when `cancel` fires or the table is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(table: T, config: TtlConfig, cancel: &CancellationToken) -> Result<Self> {
        Self::with_clock(table, config, cancel, Arc::new(SystemClock))
    }

    /// Like [`TtlTable::new`], reading time from `clock`.
    pub fn with_clock(
        table: T,
        config: TtlConfig,
        cancel: &CancellationToken,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let schedule = Schedule::new(config.time_to_live, config.prune_interval);
        let pointer = load_pointer(&table, &schedule, clock.now_nanos())?;
        info!(
            ttl_ms = config.time_to_live.as_millis() as u64,
            prune_interval_ms = config.prune_interval.as_millis() as u64,
            pointer,
            "TTL table opened"
        );

        let core = Arc::new(Core {
            table,
            schedule,
            prune_interval: config.prune_interval,
            locks: KeyLocks::new(),
            clock,
            pointer: AtomicI64::new(pointer),
            sweep_lock: Mutex::new(()),
        });
        let sweeper = Sweeper::start(Arc::clone(&core), cancel);
        Ok(Self { core, sweeper })
    }

    /// Returns the wrapped table.
    pub fn inner(&self) -> &T {
        &self.core.table
    }

    /// Highest slot the sweeper has fully processed. Never waits for a
    /// sweep in progress.
    pub fn prune_pointer(&self) -> i64 {
        self.core.pointer.load(Ordering::Acquire)
    }

    /// Current lifecycle state of the background sweeper.
    pub fn sweeper_state(&self) -> SweeperState {
        self.sweeper.state()
    }

    /// Runs one sweep immediately on the calling thread.
    ///
    /// The background sweeper does the same work every prune interval; this
    /// is for callers that want storage reclaimed right now.
    pub fn sweep_now(&self) -> SweepReport {
        self.core.sweep(&CancellationToken::new())
    }

    /// Stops the background sweeper and waits for it to finish its current
    /// slot. The table stays usable; expired entries are still hidden.
    pub async fn shutdown(&self) {
        self.sweeper.shutdown().await;
    }
}

fn load_pointer<T: Table>(table: &T, schedule: &Schedule, now: u64) -> Result<i64> {
    match table.get(PRUNE_POINTER_KEY) {
        Ok(raw) => {
            let pointer = index::decode_pointer(&raw)?;
            debug!(pointer, "Resuming from persisted prune pointer");
            Ok(pointer)
        }
        Err(Error::NotFound) => {
            // Nothing written before now can need sweeping.
            let pointer = schedule.slot_of(now) - 1;
            table.insert(PRUNE_POINTER_KEY, index::encode_pointer(pointer))?;
            debug!(pointer, "Initialised prune pointer");
            Ok(pointer)
        }
        Err(e) => Err(e),
    }
}

impl<T: Table> Core<T> {
    fn read_record(&self, key: &str) -> Result<Option<Record>> {
        match self.table.get(&index::data_key(key)) {
            Ok(raw) => Record::decode(key, raw).map(Some),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        let _guard = self.locks.lock(key);
        let now = self.clock.now_nanos();
        let slot = self.schedule.slot_of(now);

        // An undecodable old record has no slot we can trust; its marker is
        // harmless since the sweeper re-checks the record it points at.
        let previous = match self.read_record(key) {
            Ok(record) => record.map(|r| self.schedule.slot_of(r.written_at)),
            Err(Error::Corrupt { .. }) => None,
            Err(e) => return Err(e),
        };

        // New marker first: a crash part way leaves an extra marker, never a
        // key without one.
        self.table.insert(&index::marker_key(slot, key), Bytes::new())?;
        let record = Record {
            written_at: now,
            value,
        };
        self.table.insert(&index::data_key(key), record.encode())?;
        if let Some(old) = previous.filter(|&old| old != slot) {
            self.table.delete(&index::marker_key(old, key))?;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        let record = self.read_record(key)?.ok_or(Error::NotFound)?;
        let now = self.clock.now_nanos();
        if self.schedule.is_expired(record.written_at, now) {
            self.expire(key, now)?;
            return Err(Error::NotFound);
        }
        Ok(record.value)
    }

    /// Removes `key` if it is still expired once the key lock is held.
    fn expire(&self, key: &str, now: u64) -> Result<()> {
        let _guard = self.locks.lock(key);
        if let Some(record) = self.read_record(key)? {
            if self.schedule.is_expired(record.written_at, now) {
                self.table.delete(&index::data_key(key))?;
                let slot = self.schedule.slot_of(record.written_at);
                self.table.delete(&index::marker_key(slot, key))?;
                trace!(key, "Lazily expired key");
            }
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.locks.lock(key);
        let slot = match self.read_record(key) {
            Ok(Some(record)) => Some(self.schedule.slot_of(record.written_at)),
            Ok(None) => return Ok(()),
            Err(Error::Corrupt { .. }) => None,
            Err(e) => return Err(e),
        };
        self.table.delete(&index::data_key(key))?;
        if let Some(slot) = slot {
            self.table.delete(&index::marker_key(slot, key))?;
        }
        Ok(())
    }

    fn size(&self) -> Result<usize> {
        let now = self.clock.now_nanos();
        let mut live = 0;
        let mut expired = Vec::new();
        for item in self.table.scan_prefix(DATA_PREFIX)? {
            let (full, raw) = item?;
            let key = &full[DATA_PREFIX.len()..];
            // Not counted; `get` on the key still reports the corruption.
            let record = match Record::decode(key, raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable record");
                    continue;
                }
            };
            if self.schedule.is_expired(record.written_at, now) {
                expired.push(key.to_owned());
            } else {
                live += 1;
            }
        }
        for key in expired {
            self.expire(&key, now)?;
        }
        Ok(live)
    }

    fn scan(&self, prefix: &str) -> Result<Iter> {
        let now = self.clock.now_nanos();
        let schedule = self.schedule;
        let iter = self.table.scan_prefix(&index::data_key(prefix))?;
        Ok(Box::new(iter.filter_map(move |item| {
            let (mut key, raw) = match item {
                Ok(item) => item,
                Err(e) => return Some(Err(e)),
            };
            key.drain(..DATA_PREFIX.len());
            match Record::decode(&key, raw) {
                Ok(record) if schedule.is_expired(record.written_at, now) => None,
                Ok(record) => Some(Ok((key, record.value))),
                Err(e) => Some(Err(e)),
            }
        })))
    }
}

impl<T: Table + 'static> Table for TtlTable<T> {
    /// Writes the entry and restarts its TTL.
    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        check_key(key)?;
        self.core.insert(key, value)
    }

    /// Returns the entry, or [`Error::NotFound`] if it is absent or has
    /// outlived its TTL. An expired entry is deleted on the spot.
    fn get(&self, key: &str) -> Result<Bytes> {
        check_key(key)?;
        self.core.get(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.core.delete(key)
    }

    /// Counts live entries, deleting any expired ones it passes.
    fn size(&self) -> Result<usize> {
        self.core.size()
    }

    /// Iterates over live entries as of the moment of the call.
    fn iter(&self) -> Result<Iter> {
        self.core.scan("")
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
        self.core.scan(prefix)
    }
}
