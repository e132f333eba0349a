//! Value codecs
//!
//! Tables store opaque bytes. A [`Codec`] turns typed values into those bytes
//! and back, and is what [`TypedTable`](crate::table::TypedTable) uses.

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An encoding between serde values and bytes.
pub trait Codec: Send + Sync {
    /// Encodes a value into bytes.
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Bytes>;

    /// Decodes bytes back into a value.
    fn decode<V: DeserializeOwned>(&self, data: &[u8]) -> Result<V>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Compact binary encoding via `bincode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Bytes> {
        bincode::serialize(value)
            .map(Bytes::from)
            .map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<V: DeserializeOwned>(&self, data: &[u8]) -> Result<V> {
        bincode::deserialize(data).map_err(|e| Error::Codec(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "bincode"
    }
}

/// Human readable encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<V: DeserializeOwned>(&self, data: &[u8]) -> Result<V> {
        serde_json::from_slice(data).map_err(|e| Error::Codec(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
