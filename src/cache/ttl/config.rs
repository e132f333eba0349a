//! TTL table configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Configuration for a [`TtlTable`](super::TtlTable).
///
/// Serialises with millisecond fields so it can sit in a host application's
/// config file:
///
/// ```
/// use kvtable::cache::ttl::TtlConfig;
/// use std::time::Duration;
///
/// let config: TtlConfig =
///     serde_json::from_str(r#"{"time_to_live_ms": 2000, "prune_interval_ms": 200}"#).unwrap();
/// assert_eq!(config.time_to_live, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlConfig {
    /// How long an entry lives after its last insert (default: 60s)
    #[serde(rename = "time_to_live_ms", with = "millis")]
    pub time_to_live: Duration,

    /// Period of the background sweep, and width of one slot (default: 6s)
    #[serde(rename = "prune_interval_ms", with = "millis")]
    pub prune_interval: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            time_to_live: Duration::from_secs(60),
            prune_interval: Duration::from_secs(6),
        }
    }
}

impl TtlConfig {
    pub fn new(time_to_live: Duration, prune_interval: Duration) -> Self {
        Self {
            time_to_live,
            prune_interval,
        }
    }

    /// Checks the durations make sense together.
    ///
    /// Entries may outlive their TTL by up to about one prune interval, so an
    /// interval coarser than a tenth of the TTL is allowed but logged.
    pub fn validate(&self) -> Result<()> {
        if self.time_to_live.is_zero() {
            return Err(Error::InvalidConfig("time_to_live must be non-zero".into()));
        }
        if self.prune_interval.is_zero() {
            return Err(Error::InvalidConfig("prune_interval must be non-zero".into()));
        }
        if self.prune_interval > self.time_to_live {
            return Err(Error::InvalidConfig(format!(
                "prune_interval ({:?}) must not exceed time_to_live ({:?})",
                self.prune_interval, self.time_to_live
            )));
        }
        if self.prune_interval > self.time_to_live / 10 {
            warn!(
                ttl_ms = self.time_to_live.as_millis() as u64,
                prune_interval_ms = self.prune_interval.as_millis() as u64,
                "Prune interval is coarse relative to the TTL; expired entries may linger"
            );
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
