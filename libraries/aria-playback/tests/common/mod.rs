//! Shared fakes for the integration suites
//!
//! A call-recording pipeline, an in-memory catalog, and a recording
//! scrobbler. Each test binary pulls in what it needs.

#![allow(dead_code)]

use aria_core::error::Result;
use aria_core::traits::{Catalog, ScrobbleListener, SimilarityProvider};
use aria_core::types::{Album, AlbumId, ArtistId, StorageKind, Track, TrackFlags, TrackId};
use aria_playback::Pipeline;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Opt-in test logging: `RUST_LOG=debug cargo test -- --nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ===== Model helpers =====

pub fn make_track(id: &str, album_id: &str, duration_ms: u64) -> Track {
    Track::new(
        id,
        AlbumId::new(album_id),
        format!("file:///music/{album_id}/{id}.flac"),
        duration_ms,
    )
}

pub fn make_album(id: &str, track_ids: &[&str], duration_ms: u64) -> Album {
    let tracks = track_ids
        .iter()
        .map(|tid| make_track(tid, id, duration_ms))
        .collect();
    Album::new(AlbumId::new(id), tracks, StorageKind::Collection)
}

pub fn make_web_album(id: &str, track_ids: &[&str]) -> Album {
    let album_id = AlbumId::new(id);
    let tracks = track_ids
        .iter()
        .map(|tid| {
            let mut track = Track::new(*tid, album_id.clone(), format!("web://{tid}"), 0);
            track.storage = StorageKind::Web;
            track
        })
        .collect();
    Album::new(album_id, tracks, StorageKind::Web)
}

// ===== Pipeline fake =====

#[derive(Debug)]
pub struct SlotState {
    pub uri: Option<String>,
    pub preloaded: Option<String>,
    pub playing: bool,
    pub volume: f32,
    pub position: Duration,
    pub duration: Duration,
}

impl Default for SlotState {
    fn default() -> Self {
        Self {
            uri: None,
            preloaded: None,
            playing: false,
            volume: 1.0,
            position: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }
}

/// Pipeline double backed by shared state the test can poke
#[derive(Clone, Default)]
pub struct FakePipeline {
    state: Arc<Mutex<SlotState>>,
}

impl FakePipeline {
    pub fn new() -> (Self, Arc<Mutex<SlotState>>) {
        let state = Arc::new(Mutex::new(SlotState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl Pipeline for FakePipeline {
    fn set_source(&mut self, uri: &str) {
        let mut s = self.state.lock().unwrap();
        s.uri = Some(uri.to_string());
        s.position = Duration::ZERO;
    }

    fn preload_next(&mut self, uri: &str) {
        self.state.lock().unwrap().preloaded = Some(uri.to_string());
    }

    fn clear_preload(&mut self) {
        self.state.lock().unwrap().preloaded = None;
    }

    fn play(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn resume(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn stop(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.playing = false;
        s.uri = None;
        s.preloaded = None;
    }

    fn seek(&mut self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    fn set_volume(&mut self, gain: f32) {
        self.state.lock().unwrap().volume = gain;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Duration {
        self.state.lock().unwrap().duration
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn current_uri(&self) -> Option<&str> {
        None
    }
}

pub type SlotHandle = Arc<Mutex<SlotState>>;

/// A pipeline pair plus handles to inspect both slots
pub fn pipeline_pair() -> (Box<dyn Pipeline>, Box<dyn Pipeline>, SlotHandle, SlotHandle) {
    let (a, sa) = FakePipeline::new();
    let (b, sb) = FakePipeline::new();
    (Box::new(a), Box::new(b), sa, sb)
}

/// URIs of the slots currently playing (there should rarely be two)
pub fn playing_uris(slots: &[&SlotHandle]) -> Vec<String> {
    slots
        .iter()
        .filter_map(|s| {
            let s = s.lock().unwrap();
            if s.playing {
                s.uri.clone()
            } else {
                None
            }
        })
        .collect()
}

// ===== Catalog fake =====

#[derive(Default)]
struct CatalogInner {
    albums: HashMap<AlbumId, Album>,
    order: Vec<AlbumId>,
    randoms: Vec<Album>,
    party: Vec<Album>,
    popularity: HashMap<TrackId, u32>,
    flags: HashMap<TrackId, TrackFlags>,
}

/// In-memory catalog the tests can seed and inspect
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    inner: Arc<Mutex<CatalogInner>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_album(&self, album: Album) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.order.contains(&album.id) {
            inner.order.push(album.id.clone());
        }
        inner.albums.insert(album.id.clone(), album);
    }

    pub fn set_randoms(&self, albums: Vec<Album>) {
        for album in &albums {
            self.insert_album(album.clone());
        }
        self.inner.lock().unwrap().randoms = albums;
    }

    pub fn set_party(&self, albums: Vec<Album>) {
        for album in &albums {
            self.insert_album(album.clone());
        }
        self.inner.lock().unwrap().party = albums;
    }

    pub fn popularity_of(&self, track_id: &TrackId) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .popularity
            .get(track_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn flags_of(&self, track_id: &TrackId) -> TrackFlags {
        self.inner
            .lock()
            .unwrap()
            .flags
            .get(track_id)
            .copied()
            .unwrap_or_default()
    }
}

impl Catalog for InMemoryCatalog {
    fn album(&self, id: &AlbumId) -> Result<Option<Album>> {
        Ok(self.inner.lock().unwrap().albums.get(id).cloned())
    }

    fn album_tracks(&self, id: &AlbumId) -> Result<Vec<Track>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .albums
            .get(id)
            .map(|a| a.tracks.clone())
            .unwrap_or_default())
    }

    fn track(&self, id: &TrackId) -> Result<Option<Track>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .albums
            .values()
            .flat_map(|a| a.tracks.iter())
            .find(|t| &t.id == id)
            .cloned())
    }

    fn random_albums(&self, count: usize, exclude: Option<&AlbumId>) -> Result<Vec<Album>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .randoms
            .iter()
            .filter(|a| Some(&a.id) != exclude)
            .take(count)
            .cloned()
            .collect())
    }

    fn party_albums(&self, limit: usize) -> Result<Vec<Album>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .party
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    fn increment_popularity(&self, track_id: &TrackId, amount: u32) -> Result<()> {
        *self
            .inner
            .lock()
            .unwrap()
            .popularity
            .entry(track_id.clone())
            .or_insert(0) += amount;
        Ok(())
    }

    fn set_track_flags(&self, track_id: &TrackId, flags: TrackFlags) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .flags
            .insert(track_id.clone(), flags);
        Ok(())
    }
}

// ===== Scrobbler fake =====

#[derive(Clone, Default)]
pub struct RecordingScrobbler {
    pub now_playing: Arc<Mutex<Vec<TrackId>>>,
    pub listened: Arc<Mutex<Vec<(TrackId, DateTime<Utc>)>>>,
}

impl RecordingScrobbler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScrobbleListener for RecordingScrobbler {
    fn playing_now(&self, track: &Track) {
        self.now_playing.lock().unwrap().push(track.id.clone());
    }

    fn listen(&self, track: &Track, started_at: DateTime<Utc>) {
        self.listened
            .lock()
            .unwrap()
            .push((track.id.clone(), started_at));
    }
}

// ===== Similarity provider fake =====

pub struct StaticProvider {
    pub name: String,
    pub enabled: bool,
    pub candidates: Vec<AlbumId>,
}

impl SimilarityProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn similar_albums(&self, _artist_ids: &[ArtistId]) -> Result<Vec<AlbumId>> {
        Ok(self.candidates.clone())
    }
}
