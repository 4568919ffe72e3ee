//! Shuffle history: the actual play order during shuffle/party playback
//!
//! Records tracks as they start and keeps a cursor on the one currently
//! playing. "Previous" and a subsequent "next" walk the recorded order
//! exactly, without re-deciding randomness. Reset whenever the playback set
//! is replaced wholesale or shuffle is toggled off.

use aria_core::types::TrackId;

/// Recorded play order with a cursor
#[derive(Debug, Clone, Default)]
pub struct ShuffleHistory {
    entries: Vec<TrackId>,
    cursor: Option<usize>,
}

impl ShuffleHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Track under the cursor
    pub fn current(&self) -> Option<&TrackId> {
        self.cursor.map(|c| &self.entries[c])
    }

    /// Forward neighbor of the cursor, if one was already decided
    pub fn peek_forward(&self) -> Option<&TrackId> {
        let next = self.cursor? + 1;
        self.entries.get(next)
    }

    /// Backward neighbor of the cursor
    pub fn peek_back(&self) -> Option<&TrackId> {
        let cursor = self.cursor?;
        if cursor == 0 {
            None
        } else {
            self.entries.get(cursor - 1)
        }
    }

    /// Record that a track started playing
    ///
    /// Navigation along recorded neighbors only moves the cursor; a track
    /// from outside the recorded order truncates the forward branch and
    /// becomes the new tail.
    pub fn record(&mut self, track_id: &TrackId) {
        if self.current() == Some(track_id) {
            return;
        }
        if self.peek_forward() == Some(track_id) {
            self.cursor = self.cursor.map(|c| c + 1);
            return;
        }
        if self.peek_back() == Some(track_id) {
            self.cursor = self.cursor.map(|c| c - 1);
            return;
        }

        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push(track_id.clone());
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Number of recorded tracks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether anything was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
