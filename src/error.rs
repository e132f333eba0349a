//! Error types shared by every table in the crate.
//!
//! Backends translate their own failures into [`Error::Backend`] and the
//! decorators pass them through untouched, so a caller always sees the
//! engine's original error behind the `source()` chain.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when operating on a table.
#[derive(Debug, Error)]
pub enum Error {
    /// The key was the empty string
    #[error("key cannot be empty")]
    EmptyKey,

    /// No value is associated with the key, or it has expired
    #[error("key not found")]
    NotFound,

    /// A stored record could not be decoded
    #[error("corrupt record for key {key:?}: {reason}")]
    Corrupt { key: String, reason: String },

    /// A value could not be encoded or decoded by a codec
    #[error("codec error: {0}")]
    Codec(String),

    /// A configuration value was rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Opaque failure of the underlying storage engine
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub(crate) fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Backend(Box::new(err))
    }
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Backend(Box::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Backend(Box::new(err))
    }
}
