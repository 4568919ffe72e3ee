//! Sequencing strategies: which track comes next/previous
//!
//! Two interchangeable policies behind a common trait:
//! - [`LinearStrategy`] walks the playback set in album/track order.
//! - [`ShuffleStrategy`] randomizes per pass, replaying its own recorded
//!   history exactly when navigating back and forward.
//!
//! Exhaustion is `None`, never an error. The coordinator consults the queue
//! overlay before either strategy and auto-continuation after them.

use crate::history::ShuffleHistory;
use crate::playback_set::PlaybackSet;
use crate::types::RepeatMode;
use aria_core::types::{Album, AlbumId, Track, TrackId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A next/previous policy over the playback set
pub trait SequencingStrategy: Send {
    /// Compute the track that should play after `current`
    fn next(&mut self, set: &PlaybackSet, current: Option<&Track>, repeat: RepeatMode)
        -> Option<Track>;

    /// Compute the track that should play before `current`
    fn prev(&mut self, set: &PlaybackSet, current: Option<&Track>, repeat: RepeatMode)
        -> Option<Track>;

    /// The playback set was replaced wholesale; drop all pass state
    fn reset(&mut self, set: &PlaybackSet);

    /// The playback set gained or lost albums; keep history and pass state
    /// for what survived
    fn sync(&mut self, set: &PlaybackSet);

    /// A track actually started playing
    fn on_track_started(&mut self, track: &Track);
}

/// Album/track-order sequencing
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearStrategy;

impl LinearStrategy {
    fn first_track(set: &PlaybackSet) -> Option<Track> {
        set.albums()
            .iter()
            .find(|a| !a.is_empty())
            .and_then(Album::first_track)
            .cloned()
    }

    fn last_track(set: &PlaybackSet) -> Option<Track> {
        set.albums()
            .iter()
            .rev()
            .find(|a| !a.is_empty())
            .and_then(Album::last_track)
            .cloned()
    }
}

impl SequencingStrategy for LinearStrategy {
    fn next(
        &mut self,
        set: &PlaybackSet,
        current: Option<&Track>,
        repeat: RepeatMode,
    ) -> Option<Track> {
        let albums = set.albums();
        let Some(current) = current else {
            return Self::first_track(set);
        };

        let Some(album_index) = set.index_of(&current.album_id) else {
            // Current album was removed concurrently; fall back to the start
            return Self::first_track(set);
        };

        let album = &albums[album_index];
        match album.position_of(&current.id) {
            Some(pos) if pos + 1 < album.len() => return Some(album.tracks[pos + 1].clone()),
            None => return album.first_track().cloned(),
            _ => {}
        }

        // End of album: scan forward for the first non-empty album,
        // wrapping past the end only when repeating the whole set
        for next_album in &albums[album_index + 1..] {
            if let Some(track) = next_album.first_track() {
                return Some(track.clone());
            }
        }
        if repeat == RepeatMode::All {
            for next_album in &albums[..=album_index] {
                if let Some(track) = next_album.first_track() {
                    return Some(track.clone());
                }
            }
        }

        None
    }

    fn prev(
        &mut self,
        set: &PlaybackSet,
        current: Option<&Track>,
        repeat: RepeatMode,
    ) -> Option<Track> {
        let albums = set.albums();
        let Some(current) = current else {
            return Self::last_track(set);
        };

        let Some(album_index) = set.index_of(&current.album_id) else {
            return Self::last_track(set);
        };

        let album = &albums[album_index];
        match album.position_of(&current.id) {
            Some(pos) if pos > 0 => return Some(album.tracks[pos - 1].clone()),
            None => return album.last_track().cloned(),
            _ => {}
        }

        for prev_album in albums[..album_index].iter().rev() {
            if let Some(track) = prev_album.last_track() {
                return Some(track.clone());
            }
        }
        if repeat == RepeatMode::All {
            for prev_album in albums[album_index..].iter().rev() {
                if let Some(track) = prev_album.last_track() {
                    return Some(track.clone());
                }
            }
        }

        None
    }

    fn reset(&mut self, _set: &PlaybackSet) {}

    fn sync(&mut self, _set: &PlaybackSet) {}

    fn on_track_started(&mut self, _track: &Track) {}
}

/// Randomized sequencing with exact history replay
///
/// A "pass" visits every track in the set exactly once. `to_play` is the
/// album order shuffled once per pass; `not_played` is the subset not yet
/// exhausted; `played` records the tracks already taken per album. Pass
/// state survives set extension (auto-continuation) but not wholesale
/// replacement.
#[derive(Debug, Default)]
pub struct ShuffleStrategy {
    history: ShuffleHistory,
    to_play: Vec<AlbumId>,
    not_played: Vec<AlbumId>,
    played: HashMap<AlbumId, HashSet<TrackId>>,
}

impl ShuffleStrategy {
    /// Create a strategy with empty pass state
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded play order
    pub fn history(&self) -> &ShuffleHistory {
        &self.history
    }

    fn rebuild_pools(&mut self, set: &PlaybackSet) {
        let mut ids: Vec<AlbumId> = Vec::new();
        for album in set.albums() {
            if !ids.contains(&album.id) {
                ids.push(album.id.clone());
            }
        }
        ids.shuffle(&mut rand::thread_rng());
        self.to_play = ids.clone();
        self.not_played = ids;
        self.played.clear();
    }

    /// Tracks of `album_id` not yet played this pass
    fn unplayed_tracks<'a>(&self, set: &'a PlaybackSet, album_id: &AlbumId) -> Vec<&'a Track> {
        let Some(album) = set.album(album_id) else {
            return Vec::new();
        };
        let played = self.played.get(album_id);
        album
            .tracks
            .iter()
            .filter(|t| played.map_or(true, |p| !p.contains(&t.id)))
            .collect()
    }

    fn drop_album(&mut self, album_id: &AlbumId) {
        self.to_play.retain(|id| id != album_id);
        self.not_played.retain(|id| id != album_id);
    }

    /// Random unplayed track from the pools, pruning exhausted albums
    fn pick_random(&mut self, set: &PlaybackSet, repeat: RepeatMode) -> Option<Track> {
        let mut rng = rand::thread_rng();
        let mut pass_reset = false;

        loop {
            if self.not_played.is_empty() {
                self.not_played = self.to_play.clone();
            }
            if self.not_played.is_empty() {
                // Pass complete
                if repeat == RepeatMode::All && !pass_reset {
                    debug!("shuffle pass complete, starting a new pass");
                    self.rebuild_pools(set);
                    pass_reset = true;
                    continue;
                }
                // Keep the history when an auto-continuation mode may still
                // extend the set; otherwise the pass is truly over
                if !repeat.is_auto_continuation() {
                    self.history.clear();
                }
                return None;
            }

            let index = rng.gen_range(0..self.not_played.len());
            let album_id = self.not_played[index].clone();

            let candidates = self.unplayed_tracks(set, &album_id);
            if candidates.is_empty() {
                self.drop_album(&album_id);
                continue;
            }

            // Prefer tracks the user has not flagged as skipped, while
            // alternatives remain
            let fresh: Vec<&Track> = candidates
                .iter()
                .filter(|t| !t.is_skipped())
                .copied()
                .collect();
            let track = if fresh.is_empty() {
                candidates[rng.gen_range(0..candidates.len())]
            } else {
                fresh[rng.gen_range(0..fresh.len())]
            };

            return Some(track.clone());
        }
    }
}

impl SequencingStrategy for ShuffleStrategy {
    fn next(
        &mut self,
        set: &PlaybackSet,
        _current: Option<&Track>,
        repeat: RepeatMode,
    ) -> Option<Track> {
        // Replay what was already decided before rolling new randomness
        if let Some(track_id) = self.history.peek_forward() {
            if let Some(track) = set.find_track(track_id) {
                return Some(track.clone());
            }
        }

        self.pick_random(set, repeat)
    }

    fn prev(
        &mut self,
        set: &PlaybackSet,
        current: Option<&Track>,
        _repeat: RepeatMode,
    ) -> Option<Track> {
        if let Some(track_id) = self.history.peek_back() {
            if let Some(track) = set.find_track(track_id) {
                return Some(track.clone());
            }
        }

        // No recorded past: there is nothing before the beginning
        current.cloned()
    }

    fn reset(&mut self, set: &PlaybackSet) {
        self.rebuild_pools(set);
        self.history.clear();
    }

    fn sync(&mut self, set: &PlaybackSet) {
        let live: HashSet<AlbumId> = set.albums().iter().map(|a| a.id.clone()).collect();

        self.to_play.retain(|id| live.contains(id));
        self.not_played.retain(|id| live.contains(id));
        self.played.retain(|id, _| live.contains(id));

        let mut rng = rand::thread_rng();
        for id in &live {
            if !self.to_play.contains(id) {
                let pos = rng.gen_range(0..=self.to_play.len());
                self.to_play.insert(pos, id.clone());
                let pos = rng.gen_range(0..=self.not_played.len());
                self.not_played.insert(pos, id.clone());
            }
        }
    }

    fn on_track_started(&mut self, track: &Track) {
        self.history.record(&track.id);
        self.played
            .entry(track.album_id.clone())
            .or_default()
            .insert(track.id.clone());
    }
}
