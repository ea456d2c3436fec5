//! Error types for avswap-engine
//!
//! Only `StoreUnavailable`, `InvalidLocator` and `NoIdentity` ever reach a
//! caller. `ElementNotFound` and `PlaybackRejected` are absorbed inside the
//! engine, and `DanglingSelection` is healed before the operation returns.

use thiserror::Error;

use crate::host::HostError;
use crate::model::TrackId;

/// Main error type for avswap-engine
#[derive(Error, Debug)]
pub enum Error {
    /// A persistence operation failed; the named user action did not complete
    #[error("Could not {action}: {source}")]
    StoreUnavailable {
        action: &'static str,
        #[source]
        source: avswap_common::Error,
    },

    /// No playback element under the current root (transient)
    #[error("No playback element found")]
    ElementNotFound,

    /// The platform refused to start the shadow audio (transient)
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// A persisted selection references a track that no longer exists
    #[error("Selection references missing track {track_id}")]
    DanglingSelection { track_id: TrackId },

    /// The host supplied a locator that cannot be normalized
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// A host media call failed
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// A store-backed transition was requested before any content identity was loaded
    #[error("No content identity loaded")]
    NoIdentity,
}

impl Error {
    pub(crate) fn store(action: &'static str, source: avswap_common::Error) -> Self {
        Error::StoreUnavailable { action, source }
    }

    /// Whether the error is an expected, self-resolving condition
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::ElementNotFound | Error::PlaybackRejected(_))
    }
}

/// Convenience Result type using avswap-engine Error
pub type Result<T> = std::result::Result<T, Error>;
