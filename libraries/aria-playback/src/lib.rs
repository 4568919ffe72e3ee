//! Aria Player - Playback Engine
//!
//! Playback sequencing and seamless transitions for Aria Player.
//!
//! This crate provides:
//! - Playback set management (ordered albums, adjacent-merge invariant)
//! - Queue overlay (user-ordered tracks that pre-empt sequencing)
//! - Linear and shuffle sequencing with exact history replay
//! - Auto-continuation (random/similar albums when the set would end)
//! - A two-slot transition engine (gapless handoff and crossfades)
//! - The player coordinator with its typed event surface
//! - Versioned session persistence
//!
//! # Architecture
//!
//! `aria-playback` is platform-agnostic: audio decoding and output live
//! behind the [`Pipeline`] trait, the media library behind the
//! `aria_core::Catalog` trait. The embedder owns the event loop, calls
//! player methods from it, forwards pipeline notifications
//! (`on_stream_started`, `on_about_to_finish`, `on_stream_ended`,
//! `on_pipeline_error`), and drives [`Player::tick`] from a periodic timer
//! for the crossfade ramps.
//!
//! # Example
//!
//! ```rust,no_run
//! use aria_playback::{PlaybackConfig, Player};
//! # use aria_playback::Pipeline;
//! # use std::time::Duration;
//! # struct NullPipeline;
//! # impl Pipeline for NullPipeline {
//! #     fn set_source(&mut self, _uri: &str) {}
//! #     fn preload_next(&mut self, _uri: &str) {}
//! #     fn clear_preload(&mut self) {}
//! #     fn play(&mut self) {}
//! #     fn pause(&mut self) {}
//! #     fn resume(&mut self) {}
//! #     fn stop(&mut self) {}
//! #     fn seek(&mut self, _position: Duration) {}
//! #     fn set_volume(&mut self, _gain: f32) {}
//! #     fn volume(&self) -> f32 { 1.0 }
//! #     fn position(&self) -> Duration { Duration::ZERO }
//! #     fn duration(&self) -> Duration { Duration::ZERO }
//! #     fn is_playing(&self) -> bool { false }
//! #     fn current_uri(&self) -> Option<&str> { None }
//! # }
//! # fn catalog() -> Box<dyn aria_core::Catalog> { unimplemented!() }
//!
//! let mut player = Player::new(
//!     PlaybackConfig::default(),
//!     catalog(),
//!     Box::new(NullPipeline),
//!     Box::new(NullPipeline),
//! );
//!
//! // player.play_albums(albums, None);
//! // player.next();
//! for event in player.take_events() {
//!     // forward to the UI
//!     let _ = event;
//! }
//! ```

mod continuation;
mod error;
mod events;
mod history;
mod pipeline;
mod playback_set;
mod player;
mod queue;
mod sequencing;
mod session;
mod transition;
pub mod types;

// Public exports
pub use continuation::AutoContinuation;
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use history::ShuffleHistory;
pub use pipeline::{Pipeline, PipelineErrorKind};
pub use playback_set::{PlaybackSet, SetChange};
pub use player::Player;
pub use queue::QueueOverlay;
pub use sequencing::{LinearStrategy, SequencingStrategy, ShuffleStrategy};
pub use session::{SessionAlbum, SessionState, SESSION_VERSION};
pub use transition::{FadeCurve, Handoff, TickOutcome, TransitionEngine, TransitionSettings};
pub use types::{PlaybackConfig, PlayerState, RepeatMode};
