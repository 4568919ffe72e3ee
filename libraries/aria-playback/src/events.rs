//! Playback events
//!
//! Typed events emitted by the player for UI and other collaborators.
//! Events are queued in emission order and drained by the single consumer
//! via [`crate::Player::take_events`]; handlers therefore run synchronously
//! on the thread that drains, FIFO per emission.

use crate::types::PlayerState;
use aria_core::types::{AlbumId, TrackId};
use serde::{Deserialize, Serialize};

/// Events emitted by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// The current track changed
    CurrentChanged {
        /// New current track (None = nothing loaded)
        track_id: Option<TrackId>,
    },

    /// The computed next track changed
    NextChanged { track_id: Option<TrackId> },

    /// The computed previous track changed
    PrevChanged { track_id: Option<TrackId> },

    /// The queue overlay changed (append/insert/remove/clear/consume)
    QueueChanged {
        /// New queue length
        length: usize,
    },

    /// An album was appended to the playback set
    PlaybackAdded { album_id: AlbumId },

    /// An existing playback set entry absorbed more tracks
    PlaybackUpdated { album_id: AlbumId },

    /// The playback set was replaced wholesale
    PlaybackSetted { album_ids: Vec<AlbumId> },

    /// An album left the playback set
    PlaybackRemoved { album_id: AlbumId },

    /// Player state changed (playing/paused/stopped/loading)
    StatusChanged { state: PlayerState },

    /// A track's duration became known/changed
    DurationChanged { track_id: TrackId },

    /// Playback position was seeked
    Seeked { position_ms: u64 },

    /// A web track needs its URI resolved by the embedding runtime
    ///
    /// The completion must come back through
    /// `Player::complete_web_resolution` with the same token; stale tokens
    /// are discarded.
    WebResolveRequested { track_id: TrackId, token: u64 },

    /// The pipeline hit a source it has no decoder for; an install attempt
    /// should be made by the embedder
    CodecInstallRequested { uri: String },

    /// User-visible playback error
    Error { message: String },
}
