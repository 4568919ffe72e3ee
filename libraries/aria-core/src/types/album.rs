//! Album type

use crate::types::{ArtistId, StorageKind, Track, TrackFlags, TrackId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::AlbumId;

/// An album: an ordered sequence of tracks
///
/// Track order is insertion order (disc/track order). An album with zero
/// tracks is considered removed; holders drop the entry rather than keep an
/// unaddressable shell around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub tracks: Vec<Track>,
    pub artist_ids: Vec<ArtistId>,
    pub storage: StorageKind,
    pub flags: TrackFlags,
}

impl Album {
    /// Create a new album
    pub fn new(id: AlbumId, tracks: Vec<Track>, storage: StorageKind) -> Self {
        Self {
            id,
            tracks,
            artist_ids: Vec::new(),
            storage,
            flags: TrackFlags::empty(),
        }
    }

    /// Builder-style artist id list
    pub fn with_artists(mut self, artist_ids: Vec<ArtistId>) -> Self {
        self.artist_ids = artist_ids;
        self
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// An empty album is treated as removed by its holders
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Position of a track within the album
    pub fn position_of(&self, track_id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == track_id)
    }

    /// Whether the album contains a track
    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.position_of(track_id).is_some()
    }

    /// First track in play order
    pub fn first_track(&self) -> Option<&Track> {
        self.tracks.first()
    }

    /// Last track in play order
    pub fn last_track(&self) -> Option<&Track> {
        self.tracks.last()
    }

    /// All track ids in play order
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    /// Total album duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.tracks.iter().map(|t| t.duration_ms).sum())
    }
}
