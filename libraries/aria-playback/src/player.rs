//! Player coordinator - core orchestration
//!
//! Wires the queue overlay, the sequencing strategies, auto-continuation
//! and the transition engine together, and maintains the
//! current/next/previous track pointers. All methods are called from the
//! embedder's single event loop; the pointers are recomputed synchronously
//! inside every mutating operation, so observers never see a stale pair.

use crate::{
    continuation::AutoContinuation,
    error::Result,
    events::PlayerEvent,
    pipeline::{Pipeline, PipelineErrorKind},
    playback_set::{PlaybackSet, SetChange},
    queue::QueueOverlay,
    sequencing::{LinearStrategy, SequencingStrategy, ShuffleStrategy},
    session::{SessionAlbum, SessionState, SESSION_VERSION},
    transition::{TransitionEngine, TransitionSettings},
    types::{PlaybackConfig, PlayerState, RepeatMode},
};
use aria_core::traits::{Catalog, ScrobbleListener, SimilarityProvider};
use aria_core::types::{Album, AlbumId, Track, TrackFlags, TrackId};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

/// Central playback coordination
///
/// Sequencing order on every recompute: stop-after marker, then the queue
/// overlay, then the active strategy, then auto-continuation. The "no
/// track" sentinel is `None` end to end.
pub struct Player {
    // State
    config: PlaybackConfig,
    state: PlayerState,
    current: Option<Track>,
    next: Option<Track>,
    prev: Option<Track>,
    stop_after: Option<TrackId>,
    started_at: Option<DateTime<Utc>>,

    // Collections
    set: PlaybackSet,
    queue: QueueOverlay,

    // Sequencing
    linear: LinearStrategy,
    shuffle_strategy: ShuffleStrategy,
    shuffle: bool,
    party: bool,
    repeat: RepeatMode,
    continuation: AutoContinuation,

    // Output
    engine: TransitionEngine,

    // Collaborators
    catalog: Box<dyn Catalog>,
    providers: Vec<Box<dyn SimilarityProvider>>,
    scrobblers: Vec<Box<dyn ScrobbleListener>>,

    // Event queue for UI synchronization
    pending_events: Vec<PlayerEvent>,

    // Generation counter invalidating in-flight web resolutions
    load_generation: u64,

    // The next stream-start report belongs to a transition this side
    // already accounted for (proactive crossfade)
    suppress_stream_start: bool,
}

impl Player {
    /// Create a player over two pipeline slots and a catalog
    pub fn new(
        config: PlaybackConfig,
        catalog: Box<dyn Catalog>,
        pipeline_a: Box<dyn Pipeline>,
        pipeline_b: Box<dyn Pipeline>,
    ) -> Self {
        let engine = TransitionEngine::new(pipeline_a, pipeline_b, config.transition.clone());
        let continuation = AutoContinuation::new(config.continuation_batch);
        let repeat = config.repeat;

        Self {
            config,
            state: PlayerState::Stopped,
            current: None,
            next: None,
            prev: None,
            stop_after: None,
            started_at: None,
            set: PlaybackSet::new(),
            queue: QueueOverlay::new(),
            linear: LinearStrategy,
            shuffle_strategy: ShuffleStrategy::new(),
            shuffle: false,
            party: false,
            repeat,
            continuation,
            engine,
            catalog,
            providers: Vec::new(),
            scrobblers: Vec::new(),
            pending_events: Vec::new(),
            load_generation: 0,
            suppress_stream_start: false,
        }
    }

    /// Register a similarity provider for AUTO_SIMILAR continuation
    pub fn register_provider(&mut self, provider: Box<dyn SimilarityProvider>) {
        self.providers.push(provider);
    }

    /// Register a scrobble listener
    pub fn register_scrobbler(&mut self, scrobbler: Box<dyn ScrobbleListener>) {
        self.scrobblers.push(scrobbler);
    }

    /// Drain pending events, FIFO in emission order
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ===== State queries =====

    /// Current player state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Currently loaded track
    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Computed next track
    pub fn next_track(&self) -> Option<&Track> {
        self.next.as_ref()
    }

    /// Computed previous track
    pub fn prev_track(&self) -> Option<&Track> {
        self.prev.as_ref()
    }

    /// The playback set
    pub fn playback_set(&self) -> &PlaybackSet {
        &self.set
    }

    /// Queued track ids in order
    pub fn queued_tracks(&self) -> &[TrackId] {
        self.queue.track_ids()
    }

    /// 1-based queue position of a track, for UI numbering
    pub fn queue_position_of(&self, track_id: &TrackId) -> Option<usize> {
        self.queue.position_of(track_id)
    }

    /// Whether shuffle is on
    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    /// Whether party mode is on
    pub fn is_party(&self) -> bool {
        self.party
    }

    /// Current repeat mode
    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    /// Playback position of the active pipeline
    pub fn position(&self) -> Duration {
        self.engine.position()
    }

    // ===== Playback set =====

    /// Atomically replace the playback set
    ///
    /// An empty set is reported to the user ("no album available") and
    /// stops playback; it is never an error.
    pub fn set_albums(&mut self, albums: Vec<Album>) {
        let change = self.set.set_albums(albums);
        self.apply_set_changes(vec![change]);

        if self.set.is_empty() {
            warn!("no album available");
            self.emit(PlayerEvent::Error {
                message: "No album available".to_string(),
            });
            self.halt();
            return;
        }

        // Wholesale replacement resets shuffle pass state and history
        self.shuffle_strategy.reset(&self.set);
        self.recompute();
    }

    /// Replace the playback set and start playing
    ///
    /// Starts from `start` when given, otherwise from the strategy's first
    /// pick.
    pub fn play_albums(&mut self, albums: Vec<Album>, start: Option<TrackId>) {
        self.set_albums(albums);
        if self.set.is_empty() {
            return;
        }

        let track = start
            .and_then(|id| self.set.find_track(&id).cloned())
            .or_else(|| self.strategy_next_from(None));
        if let Some(track) = track {
            self.load(track);
            self.recompute();
        }
    }

    /// Append albums to the playback set (adjacent duplicates merge)
    pub fn add_albums(&mut self, albums: Vec<Album>) {
        let changes = self.set.add_albums(albums);
        if changes.is_empty() {
            return;
        }
        self.apply_set_changes(changes);
        self.shuffle_strategy.sync(&self.set);
        self.recompute();
    }

    /// Remove an album from the playback set
    ///
    /// If it holds the current track, playback advances to a track outside
    /// the album first (or stops when there is none).
    pub fn remove_album(&mut self, album_id: &AlbumId) {
        let removed_tracks: Vec<TrackId> = self
            .set
            .album(album_id)
            .map(Album::track_ids)
            .unwrap_or_default();
        let current_affected = self
            .current
            .as_ref()
            .is_some_and(|c| &c.album_id == album_id);

        // In linear mode the follow-up must be decided while the album is
        // still in the set, or recovery would restart from the beginning
        let mut follow_up = None;
        if current_affected && !self.shuffle_active() {
            follow_up = self.next_outside_album(album_id);
        }

        let changes = self.set.remove_album(album_id);
        if changes.is_empty() {
            return;
        }
        self.apply_set_changes(changes);

        let mut queue_changed = false;
        for track_id in &removed_tracks {
            queue_changed |= self.queue.remove(track_id);
        }
        if queue_changed {
            self.emit_queue_changed();
        }

        self.shuffle_strategy.sync(&self.set);

        if current_affected {
            if self.shuffle_active() {
                follow_up = self.strategy_next_from(None);
            }
            match follow_up {
                Some(track) => {
                    self.load(track);
                    self.recompute();
                }
                None => self.halt(),
            }
        } else {
            self.recompute();
        }
    }

    /// Remove several albums by id
    pub fn remove_albums(&mut self, album_ids: &[AlbumId]) {
        for id in album_ids {
            self.remove_album(id);
        }
    }

    /// Remove one track from an album in the playback set
    ///
    /// An entry emptied by the removal leaves the set, reported as an
    /// album removal.
    pub fn remove_track_from_album(&mut self, track_id: &TrackId, album_id: &AlbumId) {
        let current_affected = self.current.as_ref().is_some_and(|c| &c.id == track_id);

        let changes = self.set.remove_track(track_id, album_id);
        if changes.is_empty() {
            return;
        }
        self.apply_set_changes(changes);

        if self.queue.remove(track_id) {
            self.emit_queue_changed();
        }
        self.shuffle_strategy.sync(&self.set);

        if current_affected {
            self.set_next();
            match self.next.clone() {
                Some(track) => {
                    self.load(track);
                    self.recompute();
                }
                None => self.halt(),
            }
        } else {
            self.recompute();
        }
    }

    // ===== Queue overlay =====

    /// Append a track to the queue (re-queueing moves it to the tail)
    pub fn queue_append(&mut self, track_id: TrackId) {
        self.queue.append(track_id);
        self.emit_queue_changed();
        self.recompute();
    }

    /// Insert a track into the queue at a position
    pub fn queue_insert(&mut self, track_id: TrackId, pos: usize) {
        self.queue.insert(track_id, pos);
        self.emit_queue_changed();
        self.recompute();
    }

    /// Remove a track from the queue
    pub fn queue_remove(&mut self, track_id: &TrackId) {
        if self.queue.remove(track_id) {
            self.emit_queue_changed();
            self.recompute();
        }
    }

    /// Clear the queue
    pub fn queue_clear(&mut self) {
        if !self.queue.is_empty() {
            self.queue.clear();
            self.emit_queue_changed();
            self.recompute();
        }
    }

    // ===== Modes =====

    /// Set the repeat mode
    pub fn set_repeat(&mut self, mode: RepeatMode) {
        if self.repeat != mode {
            self.repeat = mode;
            self.recompute();
        }
    }

    /// Toggle shuffle
    ///
    /// Turning shuffle off clears the shuffle history; turning it on starts
    /// a fresh pass seeded with the current track.
    pub fn set_shuffle(&mut self, on: bool) {
        if self.shuffle == on {
            return;
        }
        self.shuffle = on;
        self.shuffle_strategy.reset(&self.set);
        if on {
            if let Some(current) = self.current.clone() {
                self.shuffle_strategy.on_track_started(&current);
            }
        }
        self.recompute();
    }

    /// Toggle party mode
    ///
    /// Party rebuilds the playback set from the catalog's rating/selection
    /// query and then behaves as shuffle.
    pub fn set_party(&mut self, on: bool) -> Result<()> {
        if self.party == on {
            return Ok(());
        }

        if on {
            let albums = self.catalog.party_albums(self.config.party_limit)?;
            self.party = true;
            self.set_albums(albums);
            if self.set.is_empty() {
                return Ok(());
            }
            if let Some(track) = self.strategy_next_from(None) {
                self.load(track);
                self.recompute();
            }
        } else {
            self.party = false;
            self.recompute();
        }
        Ok(())
    }

    /// Set or clear the stop-after marker
    ///
    /// When it names the currently playing track the next pointer is forced
    /// to the sentinel immediately.
    pub fn stop_after(&mut self, track_id: Option<TrackId>) {
        self.stop_after = track_id;
        self.set_next();
    }

    // ===== Transport =====

    /// Load a track into the transition engine
    ///
    /// Web tracks are handed to the embedder for URI resolution first; the
    /// stream starts when the resolution completes with a live token.
    pub fn load(&mut self, track: Track) {
        self.load_generation += 1;
        self.suppress_stream_start = false;
        self.set_state(PlayerState::Loading);

        let changed = self.current.as_ref() != Some(&track);
        self.current = Some(track.clone());
        if changed {
            self.emit(PlayerEvent::CurrentChanged {
                track_id: Some(track.id.clone()),
            });
        }

        if track.needs_web_resolution() {
            debug!("requesting web resolution for {}", track.id);
            self.emit(PlayerEvent::WebResolveRequested {
                track_id: track.id,
                token: self.load_generation,
            });
            return;
        }

        self.engine.load(&track.uri);
    }

    /// Completion callback for a web URI resolution
    ///
    /// Results carrying a stale token (the player stopped or changed track
    /// in the meantime) are discarded, not retried. A failed resolution
    /// skips the album.
    pub fn complete_web_resolution(
        &mut self,
        token: u64,
        result: std::result::Result<String, String>,
    ) {
        if token != self.load_generation {
            debug!("discarding stale web resolution (token {token})");
            return;
        }

        match result {
            Ok(uri) => {
                if let Some(current) = &mut self.current {
                    current.uri = uri.clone();
                }
                self.engine.load(&uri);
            }
            Err(err) => {
                let Some(current) = self.current.clone() else {
                    return;
                };
                warn!("web resolution for {} failed: {err}; skipping album", current.id);
                match self.next_outside_album(&current.album_id) {
                    Some(track) => {
                        self.load(track);
                        self.recompute();
                    }
                    None => self.halt(),
                }
            }
        }
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        match self.state {
            PlayerState::Paused => {
                self.engine.resume();
                self.set_state(PlayerState::Playing);
            }
            PlayerState::Stopped => {
                let track = self
                    .current
                    .clone()
                    .or_else(|| self.strategy_next_from(None));
                if let Some(track) = track {
                    self.load(track);
                    self.recompute();
                }
            }
            PlayerState::Playing | PlayerState::Loading => {}
        }
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.engine.pause();
            self.set_state(PlayerState::Paused);
        }
    }

    /// Toggle between playing and paused
    pub fn toggle_pause(&mut self) {
        match self.state {
            PlayerState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Stop playback and clear the playback set (the queue survives)
    pub fn stop(&mut self) {
        self.halt();
        if !self.set.is_empty() {
            self.set.clear();
            self.emit(PlayerEvent::PlaybackSetted {
                album_ids: Vec::new(),
            });
        }
        self.shuffle_strategy.reset(&self.set);
    }

    /// Seek within the current track
    pub fn seek(&mut self, position_ms: u64) {
        let Some(current) = &self.current else {
            return;
        };
        let clamped = if current.duration_ms > 0 {
            position_ms.min(current.duration_ms)
        } else {
            position_ms
        };
        self.engine.seek(Duration::from_millis(clamped));
        self.emit(PlayerEvent::Seeked {
            position_ms: clamped,
        });
    }

    /// Skip to the computed next track
    pub fn next(&mut self) {
        self.finish_current();
        match self.next.clone() {
            Some(track) => {
                self.load(track);
                self.recompute();
            }
            None => self.halt(),
        }
    }

    /// Go to the computed previous track
    ///
    /// Past the configured position threshold this restarts the current
    /// track instead.
    pub fn prev(&mut self) {
        let position_ms = self.engine.position().as_millis() as u64;
        if position_ms > self.config.prev_restart_threshold_ms {
            self.seek(0);
            return;
        }

        match self.prev.clone() {
            Some(track) => {
                self.finish_current();
                self.load(track);
                self.recompute();
            }
            None => self.seek(0),
        }
    }

    // ===== Stream lifecycle (driven by the platform) =====

    /// The pipeline started streaming the loaded track
    pub fn on_stream_started(&mut self) {
        if self.suppress_stream_start {
            // The pointers already advanced when the proactive crossfade
            // fired; this report is that same transition surfacing
            self.suppress_stream_start = false;
            return;
        }
        if self.state == PlayerState::Playing {
            // No load in flight: this is the pipeline's own gapless switch
            // into the pre-queued next track
            self.finish_current();
            let Some(next) = self.next.clone() else {
                return;
            };
            self.current = Some(next.clone());
            self.emit(PlayerEvent::CurrentChanged {
                track_id: Some(next.id),
            });
        }
        self.stream_started_bookkeeping();
    }

    /// The pipeline is about to finish its source (gapless pre-queue point)
    pub fn on_about_to_finish(&mut self) {
        self.engine.handle_about_to_finish();
    }

    /// The pipeline reached end of stream with nothing pre-queued
    pub fn on_stream_ended(&mut self) {
        self.finish_current();
        match self.next.clone() {
            Some(track) => {
                self.load(track);
                self.recompute();
            }
            None => self.halt(),
        }
    }

    /// The pipeline failed
    ///
    /// Missing codecs trigger an install request; everything else surfaces
    /// as a user-visible error. Neither is retried.
    pub fn on_pipeline_error(&mut self, kind: PipelineErrorKind, message: &str) {
        warn!("pipeline error: {message}");
        match kind {
            PipelineErrorKind::MissingCodec => {
                let uri = self
                    .current
                    .as_ref()
                    .map(|t| t.uri.clone())
                    .unwrap_or_default();
                self.emit(PlayerEvent::CodecInstallRequested { uri });
            }
            PipelineErrorKind::Other => {
                self.emit(PlayerEvent::Error {
                    message: message.to_string(),
                });
            }
        }
        self.halt();
    }

    /// Advance ramps and the proactive crossfade check
    ///
    /// Drive this from a periodic timer (~50 ms). When the remaining-time
    /// check fades into the prepared next track, the pointers advance here.
    pub fn tick(&mut self, delta: Duration) {
        let outcome = self.engine.tick(delta);
        if outcome.next_started.is_some() {
            self.finish_current();
            if let Some(next) = self.next.clone() {
                self.current = Some(next.clone());
                self.emit(PlayerEvent::CurrentChanged {
                    track_id: Some(next.id),
                });
                self.suppress_stream_start = true;
                self.stream_started_bookkeeping();
            }
        }
    }

    // ===== Sequencing =====

    /// Recompute the next pointer
    ///
    /// Order: stop-after marker, repeat-track, queue overlay, active
    /// strategy, auto-continuation.
    pub fn set_next(&mut self) {
        let Some(current) = self.current.clone() else {
            return;
        };
        let new_next = self.compute_next(&current);

        if new_next != self.next {
            self.next = new_next;
            self.emit(PlayerEvent::NextChanged {
                track_id: self.next.as_ref().map(|t| t.id.clone()),
            });
        }

        // Keep the engine's prepared next in sync; unresolved web uris are
        // not playable yet
        let uri = self
            .next
            .as_ref()
            .filter(|t| !t.needs_web_resolution())
            .map(|t| t.uri.clone());
        self.engine.prepare_next(uri.as_deref());
    }

    /// Recompute the previous pointer
    ///
    /// The queue never affects backward navigation and the past is fixed,
    /// so neither the overlay nor auto-continuation is consulted.
    pub fn set_prev(&mut self) {
        let Some(current) = self.current.clone() else {
            return;
        };

        let new_prev = if self.shuffle_active() {
            self.shuffle_strategy
                .prev(&self.set, Some(&current), self.repeat)
        } else {
            self.linear.prev(&self.set, Some(&current), self.repeat)
        };

        if new_prev != self.prev {
            self.prev = new_prev;
            self.emit(PlayerEvent::PrevChanged {
                track_id: self.prev.as_ref().map(|t| t.id.clone()),
            });
        }
    }

    // ===== Track metadata =====

    /// A track's duration became known (web streams resolve late)
    pub fn update_track_duration(&mut self, track_id: &TrackId, duration_ms: u64) {
        if let Some(track) = self.set.find_track_mut(track_id) {
            track.duration_ms = duration_ms;
        }
        for slot in [&mut self.current, &mut self.next, &mut self.prev] {
            if let Some(track) = slot {
                if &track.id == track_id {
                    track.duration_ms = duration_ms;
                }
            }
        }
        self.emit(PlayerEvent::DurationChanged {
            track_id: track_id.clone(),
        });
    }

    /// Set or clear a track's loved flag, persisting through the catalog
    pub fn set_track_loved(&mut self, track_id: &TrackId, loved: bool) -> Result<()> {
        self.update_track_flags(track_id, |flags| {
            if loved {
                flags.set(TrackFlags::LOVED);
            } else {
                flags.unset(TrackFlags::LOVED);
            }
        })
    }

    /// Set or clear a track's skipped flag, persisting through the catalog
    ///
    /// Skipped tracks are passed over by shuffle picks while alternatives
    /// remain.
    pub fn set_track_skipped(&mut self, track_id: &TrackId, skipped: bool) -> Result<()> {
        self.update_track_flags(track_id, |flags| {
            if skipped {
                flags.set(TrackFlags::SKIPPED);
            } else {
                flags.unset(TrackFlags::SKIPPED);
            }
        })
    }

    // ===== Session =====

    /// Snapshot the session for persistence
    pub fn save_session(&self) -> SessionState {
        SessionState {
            version: SESSION_VERSION,
            current_track_id: self.current.as_ref().map(|t| t.id.clone()),
            position_ms: self.engine.position().as_millis() as u64,
            queue: self.queue.track_ids().to_vec(),
            albums: self
                .set
                .albums()
                .iter()
                .map(|a| SessionAlbum {
                    id: a.id.clone(),
                    track_ids: a.track_ids(),
                })
                .collect(),
            is_playing: self.state == PlayerState::Playing,
            was_party: self.party,
        }
    }

    /// Restore a session from its JSON payload
    ///
    /// Any decoding failure abandons the restore: the player stays empty
    /// and the failure is only logged.
    pub fn restore_session_json(&mut self, payload: &str) {
        match SessionState::from_json(payload) {
            Ok(state) => self.restore_session(state),
            Err(err) => warn!("session restore abandoned: {err}"),
        }
    }

    /// Restore a previously saved session
    ///
    /// Albums and tracks the catalog no longer knows are dropped silently;
    /// playback resumes at the saved position, paused unless the session
    /// was playing.
    pub fn restore_session(&mut self, state: SessionState) {
        let mut albums = Vec::new();
        for entry in &state.albums {
            match self.catalog.album(&entry.id) {
                Ok(Some(album)) => {
                    let tracks: Vec<Track> = entry
                        .track_ids
                        .iter()
                        .filter_map(|tid| album.tracks.iter().find(|t| &t.id == tid).cloned())
                        .collect();
                    if !tracks.is_empty() {
                        let mut restored = album;
                        restored.tracks = tracks;
                        albums.push(restored);
                    }
                }
                Ok(None) => debug!("album {} no longer in catalog, dropped", entry.id),
                Err(err) => warn!("album {} lookup failed on restore: {err}", entry.id),
            }
        }

        self.party = state.was_party;
        if albums.is_empty() {
            return;
        }
        self.set_albums(albums);

        let mut queue_changed = false;
        for track_id in state.queue {
            if self.set.find_track(&track_id).is_some()
                || matches!(self.catalog.track(&track_id), Ok(Some(_)))
            {
                self.queue.append(track_id);
                queue_changed = true;
            }
        }
        if queue_changed {
            self.emit_queue_changed();
        }

        if let Some(track_id) = state.current_track_id {
            let track = self
                .set
                .find_track(&track_id)
                .cloned()
                .or_else(|| self.catalog.track(&track_id).ok().flatten());
            if let Some(track) = track {
                self.load(track);
                self.seek(state.position_ms);
                if !state.is_playing {
                    self.engine.pause();
                    self.set_state(PlayerState::Paused);
                }
                self.recompute();
            }
        }
    }

    /// Replace the transition settings
    pub fn set_transition_settings(&mut self, settings: TransitionSettings) {
        self.engine.set_settings(settings);
    }

    // ===== Internals =====

    fn emit(&mut self, event: PlayerEvent) {
        self.pending_events.push(event);
    }

    fn emit_queue_changed(&mut self) {
        let length = self.queue.len();
        self.emit(PlayerEvent::QueueChanged { length });
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            self.state = state;
            self.emit(PlayerEvent::StatusChanged { state });
        }
    }

    fn shuffle_active(&self) -> bool {
        self.shuffle || self.party
    }

    fn recompute(&mut self) {
        self.set_next();
        self.set_prev();
    }

    fn apply_set_changes(&mut self, changes: Vec<SetChange>) {
        for change in changes {
            let event = match change {
                SetChange::Added(album_id) => PlayerEvent::PlaybackAdded { album_id },
                SetChange::Updated(album_id) => PlayerEvent::PlaybackUpdated { album_id },
                SetChange::Setted(album_ids) => PlayerEvent::PlaybackSetted { album_ids },
                SetChange::Removed(album_id) => PlayerEvent::PlaybackRemoved { album_id },
            };
            self.emit(event);
        }
    }

    fn strategy_next_from(&mut self, current: Option<&Track>) -> Option<Track> {
        if self.shuffle_active() {
            self.shuffle_strategy.next(&self.set, current, self.repeat)
        } else {
            self.linear.next(&self.set, current, self.repeat)
        }
    }

    fn compute_next(&mut self, current: &Track) -> Option<Track> {
        // Stop-after wins over everything, repeat modes included
        if self.stop_after.as_ref() == Some(&current.id) {
            return None;
        }

        if self.repeat == RepeatMode::Track {
            return Some(current.clone());
        }

        // The queue strictly pre-empts the strategies
        while let Some(track_id) = self.queue.head().cloned() {
            if let Some(track) = self.set.find_track(&track_id).cloned() {
                return Some(track);
            }
            if let Ok(Some(track)) = self.catalog.track(&track_id) {
                return Some(track);
            }
            // The id points at nothing anymore; degrade by dropping it
            debug!("queued track {track_id} no longer resolvable, dropping");
            self.queue.remove(&track_id);
            self.emit_queue_changed();
        }

        if let Some(track) = self.strategy_next_from(Some(current)) {
            return Some(track);
        }

        // Sequence exhausted: auto-continuation may extend the set
        if self.repeat.is_auto_continuation() {
            let current_album = self
                .set
                .album(&current.album_id)
                .cloned()
                .or_else(|| self.catalog.album(&current.album_id).ok().flatten());
            let appended = self.continuation.next_album(
                self.repeat,
                self.catalog.as_ref(),
                &self.providers,
                current_album.as_ref(),
            );
            if let Some(album) = appended {
                debug!("auto-continuation appends album {}", album.id);
                let changes = self.set.add_albums(vec![album]);
                self.apply_set_changes(changes);
                self.shuffle_strategy.sync(&self.set);
                return self.strategy_next_from(Some(current));
            }
        }

        None
    }

    /// First strategy pick outside the given album, deciding while the set
    /// is still intact
    fn next_outside_album(&mut self, album_id: &AlbumId) -> Option<Track> {
        let mut cursor = self.current.clone()?;
        let attempts = self.set.track_count().max(1) * 2;
        for _ in 0..attempts {
            let candidate = self.strategy_next_from(Some(&cursor))?;
            if &candidate.album_id != album_id {
                return Some(candidate);
            }
            if candidate.id == cursor.id {
                return None;
            }
            cursor = candidate;
        }
        None
    }

    /// Common bookkeeping once a stream is actually playing
    fn stream_started_bookkeeping(&mut self) {
        let Some(current) = self.current.clone() else {
            return;
        };

        self.set_state(PlayerState::Playing);
        self.started_at = Some(Utc::now());

        // The queue head is consumed exactly once, now that the track
        // really started
        if self.queue.consume(&current.id) {
            self.emit_queue_changed();
        }

        if self.shuffle_active() {
            self.shuffle_strategy.on_track_started(&current);
        }

        for scrobbler in &self.scrobblers {
            scrobbler.playing_now(&current);
        }

        self.recompute();
    }

    /// Popularity and scrobble bookkeeping for the track being left
    ///
    /// Counts as a listen after half the duration or 240 s, whichever
    /// comes first. Popularity rises uniformly per album listen
    /// (`max_count / track_count`), or by a flat 1 in party mode.
    fn finish_current(&mut self) {
        let Some(started_at) = self.started_at.take() else {
            return;
        };
        let Some(current) = self.current.clone() else {
            return;
        };

        let elapsed = Utc::now()
            .signed_duration_since(started_at)
            .to_std()
            .unwrap_or_default();
        let threshold = (current.duration() / 2).min(Duration::from_secs(240));
        if elapsed < threshold {
            return;
        }

        let amount = if self.party {
            1
        } else {
            let track_count = self
                .set
                .album(&current.album_id)
                .map(Album::len)
                .filter(|count| *count > 0)
                .unwrap_or(1) as u32;
            (self.config.popularity_max_count / track_count).max(1)
        };
        if let Err(err) = self.catalog.increment_popularity(&current.id, amount) {
            warn!("popularity update for {} failed: {err}", current.id);
        }

        for scrobbler in &self.scrobblers {
            scrobbler.listen(&current, started_at);
        }
    }

    /// Stop playing without touching the playback set
    fn halt(&mut self) {
        self.engine.stop_all();
        self.load_generation += 1;
        self.suppress_stream_start = false;
        self.started_at = None;

        if self.current.take().is_some() {
            self.emit(PlayerEvent::CurrentChanged { track_id: None });
        }
        if self.next.take().is_some() {
            self.emit(PlayerEvent::NextChanged { track_id: None });
        }
        if self.prev.take().is_some() {
            self.emit(PlayerEvent::PrevChanged { track_id: None });
        }
        self.set_state(PlayerState::Stopped);
    }

    fn update_track_flags(
        &mut self,
        track_id: &TrackId,
        apply: impl Fn(&mut TrackFlags),
    ) -> Result<()> {
        let flags = match self.set.find_track_mut(track_id) {
            Some(track) => {
                apply(&mut track.flags);
                track.flags
            }
            None => {
                let mut flags = self
                    .catalog
                    .track(track_id)?
                    .map(|t| t.flags)
                    .unwrap_or_default();
                apply(&mut flags);
                flags
            }
        };

        for slot in [&mut self.current, &mut self.next, &mut self.prev] {
            if let Some(track) = slot {
                if &track.id == track_id {
                    track.flags = flags;
                }
            }
        }

        self.catalog.set_track_flags(track_id, flags)?;
        Ok(())
    }
}
