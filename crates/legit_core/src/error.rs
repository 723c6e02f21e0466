//! Error types shared across the crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Oid;

/// Result alias used throughout `legit_core`.
pub type Result<T> = std::result::Result<T, LegitError>;

/// Errors produced while talking to the store or driving a session.
#[derive(Debug, Error)]
pub enum LegitError {
    /// A round-trip to the version store failed.
    #[error("Store error at {}: {source}", path.display())]
    Store {
        /// Virtual path that was being read or written.
        path: PathBuf,
        /// Underlying I/O error reported by the store.
        #[source]
        source: io::Error,
    },

    /// The head pointer exists but holds no OID.
    #[error("Head pointer is empty")]
    EmptyHead,

    /// An OID that cannot be turned into a commit path.
    #[error("Invalid object id: {0:?}")]
    InvalidOid(String),

    /// The serialized history failed decoding or validation.
    #[error("Corrupt history: {0}")]
    CorruptHistory(String),

    /// Checkout of a commit that is not part of the published history.
    #[error("Commit not found in history: {0}")]
    UnknownCommit(Oid),

    /// The session was cancelled while the operation was in flight.
    #[error("Session cancelled")]
    Cancelled,
}

impl LegitError {
    pub(crate) fn store(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LegitError::Store {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by [`crate::config::LegitConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized.
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No platform config directory is available.
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// A field holds a value the session cannot work with.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
