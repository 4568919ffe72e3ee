/// Track domain type
use crate::types::{AlbumId, TrackId};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Where a track's audio lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    /// Part of the local collection
    Collection,

    /// External file outside the collection
    External,

    /// Remote/web stream whose URI may need resolving before playback
    Web,

    /// Web track saved into the collection
    Saved,

    /// Ephemeral track, never persisted
    Ephemeral,
}

/// Loved/skipped flag bitset for tracks and albums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackFlags(u8);

impl TrackFlags {
    /// Marked as loved by the user
    pub const LOVED: TrackFlags = TrackFlags(1);

    /// Marked to be skipped during automatic sequencing
    pub const SKIPPED: TrackFlags = TrackFlags(1 << 1);

    /// Empty flag set
    pub fn empty() -> Self {
        Self(0)
    }

    /// Check if a flag is set
    pub fn contains(self, flag: TrackFlags) -> bool {
        self.0 & flag.0 != 0
    }

    /// Set a flag
    pub fn set(&mut self, flag: TrackFlags) {
        self.0 |= flag.0;
    }

    /// Clear a flag
    pub fn unset(&mut self, flag: TrackFlags) {
        self.0 &= !flag.0;
    }

    /// Toggle a flag
    pub fn toggle(&mut self, flag: TrackFlags) {
        self.0 ^= flag.0;
    }
}

/// Audio track
///
/// Refers to its album by id; the catalog store owns the canonical objects.
/// Equality and hashing are by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Owning album (back-reference by id, not ownership)
    pub album_id: AlbumId,

    /// Playback URI (file or remote)
    pub uri: String,

    /// Track duration in milliseconds
    pub duration_ms: u64,

    /// Storage classification
    pub storage: StorageKind,

    /// Loved/skipped flags
    pub flags: TrackFlags,

    /// Play-count-derived popularity
    pub popularity: u32,

    /// User rating (0-5)
    pub rate: Option<u8>,
}

impl Track {
    /// Create a collection track with minimal metadata
    pub fn new(
        id: impl Into<String>,
        album_id: AlbumId,
        uri: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: TrackId::new(id),
            album_id,
            uri: uri.into(),
            duration_ms,
            storage: StorageKind::Collection,
            flags: TrackFlags::empty(),
            popularity: 0,
            rate: None,
        }
    }

    /// Create an ephemeral track with a generated id
    pub fn ephemeral(album_id: AlbumId, uri: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: TrackId::generate(),
            album_id,
            uri: uri.into(),
            duration_ms,
            storage: StorageKind::Ephemeral,
            flags: TrackFlags::empty(),
            popularity: 0,
            rate: None,
        }
    }

    /// Get the track duration as a Duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Whether the playback URI must be resolved through the web layer first
    pub fn needs_web_resolution(&self) -> bool {
        self.storage == StorageKind::Web
    }

    /// Whether automatic sequencing should pass over this track
    pub fn is_skipped(&self) -> bool {
        self.flags.contains(TrackFlags::SKIPPED)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_creation() {
        let track = Track::new("t1", AlbumId::new("a1"), "file:///music/01.flac", 180_000);
        assert_eq!(track.id.as_str(), "t1");
        assert_eq!(track.duration(), Duration::from_secs(180));
        assert_eq!(track.storage, StorageKind::Collection);
    }

    #[test]
    fn equality_is_by_id() {
        let a = Track::new("t1", AlbumId::new("a1"), "file:///one.flac", 100);
        let mut b = Track::new("t1", AlbumId::new("a2"), "file:///two.flac", 200);
        b.popularity = 42;
        assert_eq!(a, b);
    }

    #[test]
    fn ephemeral_tracks_get_unique_ids() {
        let a = Track::ephemeral(AlbumId::new("a1"), "https://radio/1", 0);
        let b = Track::ephemeral(AlbumId::new("a1"), "https://radio/1", 0);
        assert_ne!(a, b);
        assert_eq!(a.storage, StorageKind::Ephemeral);
    }

    #[test]
    fn flag_bitset() {
        let mut flags = TrackFlags::empty();
        assert!(!flags.contains(TrackFlags::LOVED));

        flags.set(TrackFlags::LOVED);
        flags.set(TrackFlags::SKIPPED);
        assert!(flags.contains(TrackFlags::LOVED));
        assert!(flags.contains(TrackFlags::SKIPPED));

        flags.unset(TrackFlags::LOVED);
        assert!(!flags.contains(TrackFlags::LOVED));
        assert!(flags.contains(TrackFlags::SKIPPED));

        flags.toggle(TrackFlags::SKIPPED);
        assert_eq!(flags, TrackFlags::empty());
    }

    #[test]
    fn web_tracks_need_resolution() {
        let mut track = Track::new("t1", AlbumId::new("a1"), "web://abc", 200_000);
        track.storage = StorageKind::Web;
        assert!(track.needs_web_resolution());
    }
}
