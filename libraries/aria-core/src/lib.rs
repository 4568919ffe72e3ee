//! Aria Player Core
//!
//! Domain types, collaborator traits, and error handling for Aria Player.
//!
//! This crate provides the foundational building blocks shared by the
//! playback engine and its embedders:
//! - **Domain Types**: `Track`, `Album`, id newtypes, storage classification
//! - **Collaborator Traits**: `Catalog`, `SimilarityProvider`, `ScrobbleListener`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! The catalog store is the single owner of canonical objects: tracks refer
//! to their album by id, albums carry their tracks by value in play order,
//! and anything else is looked up through the `Catalog` trait.
//!
//! # Example
//!
//! ```rust
//! use aria_core::types::{Album, AlbumId, StorageKind, Track};
//!
//! let album_id = AlbumId::new("album-1");
//! let track = Track::new("track-1", album_id.clone(), "file:///music/01.flac", 215_000);
//! let album = Album::new(album_id, vec![track], StorageKind::Collection);
//! assert_eq!(album.len(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use traits::{Catalog, ScrobbleListener, SimilarityProvider};
pub use types::{Album, AlbumId, ArtistId, StorageKind, Track, TrackFlags, TrackId};
