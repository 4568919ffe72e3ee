//! Auto-continuation: extending the playback set when sequencing would end
//!
//! Consulted only when the active strategy reports exhaustion and the
//! repeat mode is AUTO_RANDOM or AUTO_SIMILAR. Produces the album to
//! append; the coordinator appends it and re-invokes the strategy once.
//! Failure to find a candidate is not an error — playback simply stops.

use crate::types::RepeatMode;
use aria_core::traits::{Catalog, SimilarityProvider};
use aria_core::types::Album;
use tracing::{debug, warn};

/// Auto-continuation policy
#[derive(Debug, Clone, Copy)]
pub struct AutoContinuation {
    batch_size: usize,
}

impl AutoContinuation {
    /// Create a continuation policy requesting `batch_size` candidates
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Find the album to append, per the repeat mode
    ///
    /// `current_album` is the album of the track playing when the sequence
    /// ran out; it is excluded from random candidates and is the artist
    /// anchor for similarity.
    pub fn next_album(
        &self,
        repeat: RepeatMode,
        catalog: &dyn Catalog,
        providers: &[Box<dyn SimilarityProvider>],
        current_album: Option<&Album>,
    ) -> Option<Album> {
        match repeat {
            RepeatMode::AutoRandom => self.random_album(catalog, current_album),
            RepeatMode::AutoSimilar => self.similar_album(catalog, providers, current_album),
            _ => None,
        }
    }

    fn random_album(&self, catalog: &dyn Catalog, current_album: Option<&Album>) -> Option<Album> {
        let exclude = current_album.map(|a| &a.id);
        let batch = match catalog.random_albums(self.batch_size, exclude) {
            Ok(batch) => batch,
            Err(err) => {
                warn!("random continuation failed: {err}");
                return None;
            }
        };

        batch
            .into_iter()
            .find(|album| !album.is_empty() && Some(&album.id) != exclude)
    }

    fn similar_album(
        &self,
        catalog: &dyn Catalog,
        providers: &[Box<dyn SimilarityProvider>],
        current_album: Option<&Album>,
    ) -> Option<Album> {
        let current_album = current_album?;
        if current_album.artist_ids.is_empty() {
            return None;
        }

        for provider in providers.iter().filter(|p| p.enabled()) {
            let candidates = match provider.similar_albums(&current_album.artist_ids) {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!("similarity provider '{}' failed: {err}", provider.name());
                    continue;
                }
            };

            for album_id in candidates.into_iter().take(self.batch_size) {
                if album_id == current_album.id {
                    continue;
                }
                match catalog.album(&album_id) {
                    Ok(Some(album)) if !album.is_empty() => {
                        debug!(
                            "continuing with album {} from provider '{}'",
                            album.id,
                            provider.name()
                        );
                        return Some(album);
                    }
                    Ok(_) => {}
                    Err(err) => warn!("catalog lookup for {album_id} failed: {err}"),
                }
            }
        }

        None
    }
}
