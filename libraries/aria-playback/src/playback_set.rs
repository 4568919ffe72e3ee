//! Playback set: the ordered albums currently loaded for playback
//!
//! Invariant: no two adjacent entries share the same album id. Appending an
//! album equal to the last entry merges its tracks into that entry instead
//! of inserting a duplicate. Empty albums never enter the set, and an entry
//! emptied by track removal leaves the set entirely.

use aria_core::types::{Album, AlbumId, Track, TrackId};

/// A change applied to the playback set
///
/// The coordinator maps these to the corresponding playback events.
#[derive(Debug, Clone, PartialEq)]
pub enum SetChange {
    /// Album appended as a new entry
    Added(AlbumId),

    /// Existing entry absorbed more tracks
    Updated(AlbumId),

    /// Whole set replaced
    Setted(Vec<AlbumId>),

    /// Entry dropped
    Removed(AlbumId),
}

/// Ordered list of albums loaded for playback
#[derive(Debug, Clone, Default)]
pub struct PlaybackSet {
    albums: Vec<Album>,
}

impl PlaybackSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self { albums: Vec::new() }
    }

    /// Albums in play order
    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    /// Album ids in play order
    pub fn album_ids(&self) -> Vec<AlbumId> {
        self.albums.iter().map(|a| a.id.clone()).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.albums.len()
    }

    /// Whether the set has no entries
    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    /// Total number of tracks across all entries
    pub fn track_count(&self) -> usize {
        self.albums.iter().map(Album::len).sum()
    }

    /// Index of the first entry with the given id
    pub fn index_of(&self, id: &AlbumId) -> Option<usize> {
        self.albums.iter().position(|a| &a.id == id)
    }

    /// First entry with the given id
    pub fn album(&self, id: &AlbumId) -> Option<&Album> {
        self.albums.iter().find(|a| &a.id == id)
    }

    /// Find a track anywhere in the set
    pub fn find_track(&self, id: &TrackId) -> Option<&Track> {
        self.albums
            .iter()
            .flat_map(|a| a.tracks.iter())
            .find(|t| &t.id == id)
    }

    /// Find a track anywhere in the set, mutably
    pub fn find_track_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        self.albums
            .iter_mut()
            .flat_map(|a| a.tracks.iter_mut())
            .find(|t| &t.id == id)
    }

    /// Append albums, merging each into the last entry when the ids match
    ///
    /// Merging unions track ids: tracks already present in the entry are
    /// skipped. Empty albums are ignored.
    pub fn add_albums(&mut self, albums: Vec<Album>) -> Vec<SetChange> {
        let mut changes = Vec::new();

        for album in albums {
            if album.is_empty() {
                continue;
            }

            match self.albums.last_mut() {
                Some(last) if last.id == album.id => {
                    let mut absorbed = false;
                    for track in album.tracks {
                        if !last.contains(&track.id) {
                            last.tracks.push(track);
                            absorbed = true;
                        }
                    }
                    if absorbed {
                        changes.push(SetChange::Updated(album.id));
                    }
                }
                _ => {
                    changes.push(SetChange::Added(album.id.clone()));
                    self.albums.push(album);
                }
            }
        }

        changes
    }

    /// Atomically replace the whole set
    ///
    /// An empty replacement is valid; the caller is responsible for
    /// reporting "no album available" to the user.
    pub fn set_albums(&mut self, albums: Vec<Album>) -> SetChange {
        self.albums.clear();
        self.add_albums(albums);
        SetChange::Setted(self.album_ids())
    }

    /// Drop every entry with the given id
    pub fn remove_album(&mut self, id: &AlbumId) -> Vec<SetChange> {
        let before = self.albums.len();
        self.albums.retain(|a| &a.id != id);

        if self.albums.len() == before {
            return Vec::new();
        }

        self.merge_adjacent();
        vec![SetChange::Removed(id.clone())]
    }

    /// Drop every entry matching any of the given ids
    pub fn remove_by_ids(&mut self, ids: &[AlbumId]) -> Vec<SetChange> {
        ids.iter().flat_map(|id| self.remove_album(id)).collect()
    }

    /// Remove one track from an entry
    ///
    /// If the entry becomes empty it leaves the set entirely, reported as
    /// a removal; otherwise the entry is reported as updated.
    pub fn remove_track(&mut self, track_id: &TrackId, album_id: &AlbumId) -> Vec<SetChange> {
        let Some(index) = self.index_of(album_id) else {
            return Vec::new();
        };

        let album = &mut self.albums[index];
        let Some(pos) = album.position_of(track_id) else {
            return Vec::new();
        };
        album.tracks.remove(pos);

        if album.is_empty() {
            self.albums.remove(index);
            self.merge_adjacent();
            vec![SetChange::Removed(album_id.clone())]
        } else {
            vec![SetChange::Updated(album_id.clone())]
        }
    }

    /// Clear the set
    pub fn clear(&mut self) {
        self.albums.clear();
    }

    /// Re-establish the adjacent-merge invariant after removals
    fn merge_adjacent(&mut self) {
        let mut i = 0;
        while i + 1 < self.albums.len() {
            if self.albums[i].id == self.albums[i + 1].id {
                let follower = self.albums.remove(i + 1);
                let entry = &mut self.albums[i];
                for track in follower.tracks {
                    if !entry.contains(&track.id) {
                        entry.tracks.push(track);
                    }
                }
            } else {
                i += 1;
            }
        }
    }
}
