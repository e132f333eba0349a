//! Wall-clock sources.
//!
//! Expiry state is persisted, so it is measured in wall-clock time (nanoseconds
//! since the Unix epoch) rather than `Instant`, which means nothing across a
//! restart. The [`Clock`] trait lets tests move time by hand.

use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of the current wall-clock time.
pub trait Clock: Debug + Send + Sync + 'static {
    /// Nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to a table and
/// keep another to advance it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Arc<Mutex<u64>>,
}

impl ManualClock {
    /// Starts the clock at `start` past the epoch.
    pub fn new(start: Duration) -> Self {
        Self {
            nanos: Arc::new(Mutex::new(start.as_nanos() as u64)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.nanos.lock() += by.as_nanos() as u64;
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        *self.nanos.lock()
    }
}
