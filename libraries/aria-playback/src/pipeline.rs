//! Platform-agnostic playback pipeline trait
//!
//! A pipeline is one decode→volume→sink chain. The transition engine owns
//! two of them and alternates which one feeds the output device. Platform
//! crates implement this against their audio stack; pipeline failures are
//! asynchronous and reach the player through `Player::on_pipeline_error`.

use std::time::Duration;

/// Classification of pipeline failures
///
/// Missing decoders get an install attempt; everything else is surfaced to
/// the user. Neither is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// The source needs a codec the platform does not have
    MissingCodec,

    /// Any other decode/output failure
    Other,
}

/// One decode→volume→sink chain
pub trait Pipeline: Send {
    /// Point the pipeline at a new source
    ///
    /// Implies stopping whatever was loaded before.
    fn set_source(&mut self, uri: &str);

    /// Pre-queue the source to switch to when the current one ends
    ///
    /// This is the gapless handoff: platforms wire it to their "about to
    /// finish" notification so the switch happens without an audible gap.
    fn preload_next(&mut self, uri: &str);

    /// Drop any pre-queued source
    fn clear_preload(&mut self);

    /// Start playback of the current source
    fn play(&mut self);

    /// Pause without losing position
    fn pause(&mut self);

    /// Resume after pause
    fn resume(&mut self);

    /// Stop and release the source
    fn stop(&mut self);

    /// Seek within the current source
    fn seek(&mut self, position: Duration);

    /// Set this chain's volume (0.0 - 1.0)
    ///
    /// Only the transition engine touches a slot's volume, so ramps can run
    /// from a timer without racing other writers.
    fn set_volume(&mut self, gain: f32);

    /// Current chain volume
    fn volume(&self) -> f32;

    /// Current playback position
    fn position(&self) -> Duration;

    /// Duration of the current source
    fn duration(&self) -> Duration;

    /// Whether the chain is currently playing
    fn is_playing(&self) -> bool;

    /// URI of the current source, if any
    fn current_uri(&self) -> Option<&str>;
}
