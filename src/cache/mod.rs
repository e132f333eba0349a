//! Table decorators that manage entry lifetime.
//!
//! - [`ttl`]: entries expire a fixed time after their last write
//! - [`lru`]: a bounded in-memory read cache

pub mod lru;
pub mod ttl;

pub use lru::{CacheStats, LruTable};
pub use ttl::{SweepReport, SweeperState, TtlConfig, TtlTable};
