//! Key layout and record encoding for the TTL table.
//!
//! Everything the TTL table stores lives in three reserved namespaces of the
//! underlying table:
//!
//! ```text
//! data:<key>                       -> written_at (u64 BE nanos) ++ value
//! slot:<S, 20 digits>:<key>        -> (empty)          one marker per live key
//! meta:prune_pointer               -> i64 BE           highest fully swept slot
//! ```
//!
//! The slot of a key is derived from the `written_at` stamp in its data
//! record, so an insert learns which marker to retire from the same read that
//! fetches the old record. Slot numbers are zero padded so that ordered
//! engines return markers in slot order.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::Duration;

pub(crate) const DATA_PREFIX: &str = "data:";
pub(crate) const SLOT_PREFIX: &str = "slot:";
pub(crate) const PRUNE_POINTER_KEY: &str = "meta:prune_pointer";

/// Width of the zero padded slot number in marker keys.
const SLOT_WIDTH: usize = 20;

/// Length of the `written_at` header on data records.
const HEADER_LEN: usize = 8;

pub(crate) fn data_key(key: &str) -> String {
    format!("{DATA_PREFIX}{key}")
}

pub(crate) fn slot_prefix(slot: i64) -> String {
    format!("{SLOT_PREFIX}{slot:0width$}:", width = SLOT_WIDTH)
}

pub(crate) fn marker_key(slot: i64, key: &str) -> String {
    let mut marker = slot_prefix(slot);
    marker.push_str(key);
    marker
}

/// Splits a marker key into its slot and the caller's key.
pub(crate) fn parse_marker(marker: &str) -> Option<(i64, &str)> {
    let rest = marker.strip_prefix(SLOT_PREFIX)?;
    let (slot, key) = rest.split_once(':')?;
    if slot.len() != SLOT_WIDTH || key.is_empty() {
        return None;
    }
    Some((slot.parse().ok()?, key))
}

/// A data record: the caller's value stamped with its write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    pub written_at: u64,
    pub value: Bytes,
}

impl Record {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.value.len());
        buf.put_u64(self.written_at);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    pub fn decode(key: &str, mut data: Bytes) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::corrupt(
                key,
                format!("record is {} bytes, shorter than its header", data.len()),
            ));
        }
        let written_at = data.get_u64();
        Ok(Self {
            written_at,
            value: data,
        })
    }
}

pub(crate) fn encode_pointer(slot: i64) -> Bytes {
    Bytes::copy_from_slice(&slot.to_be_bytes())
}

pub(crate) fn decode_pointer(data: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = data
        .try_into()
        .map_err(|_| Error::corrupt(PRUNE_POINTER_KEY, format!("{} bytes", data.len())))?;
    Ok(i64::from_be_bytes(bytes))
}

/// Slot arithmetic for one table's TTL and prune interval.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Schedule {
    ttl_nanos: u64,
    interval_nanos: u64,
}

impl Schedule {
    pub fn new(time_to_live: Duration, prune_interval: Duration) -> Self {
        Self {
            ttl_nanos: time_to_live.as_nanos() as u64,
            interval_nanos: (prune_interval.as_nanos() as u64).max(1),
        }
    }

    /// The slot a moment falls into.
    #[inline]
    pub fn slot_of(&self, nanos: u64) -> i64 {
        (nanos / self.interval_nanos) as i64
    }

    /// A record written at `written_at` is dead from `written_at + ttl` on.
    #[inline]
    pub fn is_expired(&self, written_at: u64, now: u64) -> bool {
        now >= written_at.saturating_add(self.ttl_nanos)
    }

    /// Highest slot whose every entry has expired at `now`.
    ///
    /// Slot `s` ends at `(s + 1) * interval`, so its last possible write has
    /// expired once `(s + 1) * interval + ttl <= now`.
    pub fn cutoff(&self, now: u64) -> i64 {
        self.slot_of(now.saturating_sub(self.ttl_nanos)) - 1
    }
}
