//! Versioned session persistence
//!
//! The session is an explicit, versioned schema (not an opaque object
//! dump): current track id, queue order, playback set as ordered album ids
//! with per-album track-id lists, the `(is_playing, was_party)` pair, and
//! the last playback position. Restoring re-hydrates through the catalog;
//! any decoding failure aborts the restore silently (logged, never fatal).

use crate::error::Result;
use aria_core::types::{AlbumId, TrackId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Current schema version
pub const SESSION_VERSION: u32 = 1;

/// One playback set entry as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAlbum {
    /// Album id
    pub id: AlbumId,

    /// Track ids loaded for this entry, in play order
    pub track_ids: Vec<TrackId>,
}

/// Persisted player session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Schema version; restores reject unknown versions
    pub version: u32,

    /// Track that was playing/loaded
    pub current_track_id: Option<TrackId>,

    /// Last playback position in milliseconds
    pub position_ms: u64,

    /// Queue overlay, in order
    pub queue: Vec<TrackId>,

    /// Playback set, in order
    pub albums: Vec<SessionAlbum>,

    /// Whether playback was running
    pub is_playing: bool,

    /// Whether party mode was on
    pub was_party: bool,
}

impl SessionState {
    /// An empty current-version session
    pub fn empty() -> Self {
        Self {
            version: SESSION_VERSION,
            current_track_id: None,
            position_ms: 0,
            queue: Vec::new(),
            albums: Vec::new(),
            is_playing: false,
            was_party: false,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON, rejecting unknown schema versions
    pub fn from_json(payload: &str) -> Result<Self> {
        let state: SessionState = serde_json::from_str(payload)?;
        if state.version != SESSION_VERSION {
            warn!("unknown session version {}", state.version);
            return Err(crate::error::PlaybackError::SessionVersion(state.version));
        }
        Ok(state)
    }
}
