//! Error types for the playback engine
//!
//! Sequencing exhaustion ("no next/prev track") is not an error anywhere in
//! this crate; it is `Option::None`. Errors are reserved for pipeline
//! failures, collaborator failures, and corrupt session payloads.

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Pipeline reported a missing decoder/codec for the current source
    #[error("Missing codec for: {uri}")]
    MissingCodec { uri: String },

    /// Any other decode/pipeline failure
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// No album available for playback
    #[error("No album available")]
    NoAlbumAvailable,

    /// Session payload could not be decoded
    #[error("Session error: {0}")]
    Session(#[from] serde_json::Error),

    /// Session payload has a schema version this build does not know
    #[error("Unsupported session version: {0}")]
    SessionVersion(u32),

    /// Catalog/provider failure
    #[error(transparent)]
    Core(#[from] aria_core::CoreError),

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
