//! Core types for the playback engine

use crate::transition::TransitionSettings;
use serde::{Deserialize, Serialize};

/// Player state
///
/// Lifecycle: `Stopped → Loading → Playing ⇄ Paused`, back to `Loading` on
/// every track change, and straight to `Stopped` on unrecoverable pipeline
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// No track loaded
    Stopped,

    /// Loading/buffering a track
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

/// Repeat mode, read by strategies and auto-continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Stop when the playback set ends
    None,

    /// Loop the current track
    Track,

    /// Loop the entire playback set
    All,

    /// When the set ends, append an album by artist similarity
    AutoSimilar,

    /// When the set ends, append a random album from the catalog
    AutoRandom,
}

impl RepeatMode {
    /// Whether this mode extends the playback set instead of stopping
    pub fn is_auto_continuation(self) -> bool {
        matches!(self, RepeatMode::AutoSimilar | RepeatMode::AutoRandom)
    }
}

/// Configuration for the player
///
/// The numeric tunables here are product decisions, not correctness
/// invariants, which is why they live in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Transition (gapless/crossfade) settings
    pub transition: TransitionSettings,

    /// Initial repeat mode (default: None)
    pub repeat: RepeatMode,

    /// `previous()` restarts the current track instead of going back when
    /// the position is past this threshold (default: 2000 ms)
    pub prev_restart_threshold_ms: u64,

    /// Numerator of the per-listen popularity increment; each listen adds
    /// `max(1, popularity_max_count / album_track_count)` (default: 10)
    pub popularity_max_count: u32,

    /// Batch size requested from the catalog/providers by auto-continuation
    /// (default: 5)
    pub continuation_batch: usize,

    /// Number of albums pulled from the rating/selection query when party
    /// mode is switched on (default: 20)
    pub party_limit: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            transition: TransitionSettings::default(),
            repeat: RepeatMode::None,
            prev_restart_threshold_ms: 2_000,
            popularity_max_count: 10,
            continuation_batch: 5,
            party_limit: 20,
        }
    }
}
