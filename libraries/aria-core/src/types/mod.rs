//! Domain types for Aria Player

mod album;
mod ids;
mod track;

pub use album::Album;
pub use ids::{AlbumId, ArtistId, TrackId};
pub use track::{StorageKind, Track, TrackFlags};
