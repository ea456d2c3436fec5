//! Test helper modules for avswap-engine integration tests
//!
//! Provides fake host objects:
//! - FakeNode / FakeDocument: a mutable container tree
//! - FakeVideo: playback element with a real listener registry
//! - FakeBackend / FakeAudio: audio primitive that counts live resources
//! - FlakyStore: TrackStore wrapper with switchable failures

#![allow(dead_code)]

pub mod fake_host;
pub mod flaky_store;

pub use fake_host::{FakeAudioState, FakeBackend, FakeDocument, FakeNode, FakeVideo};
pub use flaky_store::FlakyStore;

use std::sync::Arc;

use avswap_common::config::SyncSettings;
use avswap_engine::{AudioSwapEngine, ContentIdentity, PlaybackEventStream, TrackStore};

/// Engine wired to fake host objects
pub struct Harness {
    pub engine: AudioSwapEngine,
    pub events: PlaybackEventStream,
    pub document: Arc<FakeDocument>,
    pub backend: Arc<FakeBackend>,
    pub video: Arc<FakeVideo>,
}

impl Harness {
    /// Engine over a tree containing one video element
    pub fn new(store: Arc<dyn TrackStore>) -> Self {
        let video = FakeVideo::new(1);
        let document = FakeDocument::with_video(video.clone());
        let backend = FakeBackend::new();
        let (engine, events) = AudioSwapEngine::new(
            &SyncSettings::default(),
            store,
            document.clone(),
            backend.clone(),
        );
        Self {
            engine,
            events,
            document,
            backend,
            video,
        }
    }

    /// Fire an event on the bound fake video and deliver it
    pub fn fire(&mut self, kind: avswap_engine::host::PlaybackEventKind) -> usize {
        self.video.fire(kind);
        self.events.drain_into(&self.engine)
    }

    /// Deliver queued signals
    pub fn pump(&mut self) -> usize {
        self.events.drain_into(&self.engine)
    }
}

pub fn identity(path: &str) -> ContentIdentity {
    ContentIdentity::from_locator(&format!("https://vk.com/{}", path)).expect("valid locator")
}

pub fn payload(bytes: &[u8]) -> avswap_engine::Payload {
    Arc::from(bytes.to_vec())
}
