/// Collaborator traits for Aria Player
///
/// The playback engine consults these seams synchronously from its event
/// loop; blocking work (network fetches, tag probing) belongs to the
/// embedding runtime, which re-enters the engine through completion
/// callbacks.
use crate::error::Result;
use crate::types::{Album, AlbumId, ArtistId, Track, TrackFlags, TrackId};
use chrono::{DateTime, Utc};

/// Catalog store: the single owner of canonical track/album objects
///
/// Implementers back this with whatever store they have (database, remote
/// library). Lookup failures for ids that vanished concurrently should be
/// reported as `Ok(None)`, not errors — the sequencing layer degrades to
/// "no track" in that case.
pub trait Catalog: Send {
    /// Get an album (with its tracks in play order) by id
    fn album(&self, id: &AlbumId) -> Result<Option<Album>>;

    /// Get the tracks of an album in play order
    fn album_tracks(&self, id: &AlbumId) -> Result<Vec<Track>>;

    /// Get a track by id
    fn track(&self, id: &TrackId) -> Result<Option<Track>>;

    /// A small random batch of albums, excluding the given album
    ///
    /// Used by AUTO_RANDOM continuation.
    fn random_albums(&self, count: usize, exclude: Option<&AlbumId>) -> Result<Vec<Album>>;

    /// Albums selected by the store's rating/selection query
    ///
    /// Used to rebuild the playback set when party mode is switched on.
    fn party_albums(&self, limit: usize) -> Result<Vec<Album>>;

    /// Add to a track's popularity counter
    fn increment_popularity(&self, track_id: &TrackId, amount: u32) -> Result<()>;

    /// Persist a track's loved/skipped flags
    fn set_track_flags(&self, track_id: &TrackId, flags: TrackFlags) -> Result<()>;
}

/// Artist-similarity provider (radio/suggestion services)
///
/// Providers are keyed by name and may be disabled by network-access
/// configuration; disabled providers are skipped.
pub trait SimilarityProvider: Send {
    /// Provider name (stable key)
    fn name(&self) -> &str;

    /// Whether the provider may be queried right now
    fn enabled(&self) -> bool {
        true
    }

    /// Candidate albums for artists similar to the given ones
    fn similar_albums(&self, artist_ids: &[ArtistId]) -> Result<Vec<AlbumId>>;
}

/// Scrobble listener, notified on stream start and track finish
pub trait ScrobbleListener: Send {
    /// The given track just started playing
    fn playing_now(&self, track: &Track);

    /// The given track counts as listened to (started at `started_at`)
    fn listen(&self, track: &Track, started_at: DateTime<Utc>);
}
