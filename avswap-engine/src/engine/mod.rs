//! Audio substitution engine
//!
//! `AudioSwapEngine` is the entry point a hosting UI owns. It combines the
//! binding manager, the shadow audio controller and the selection state
//! machine behind one explicit instance; there is no process-wide state.
//!
//! Submodules:
//! - `core`: synchronous runtime state and playback signal routing
//! - `selection`: store-backed selection transitions

mod core;
mod selection;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use avswap_common::config::SyncSettings;
use avswap_common::events::{EngineEvent, EventBus};
use tokio::sync::{broadcast, mpsc};

use crate::binding::{BindOutcome, BindingManager, PlaybackSignal};
use crate::host::{AudioBackend, ElementRef, HostDocument};
use crate::identity::ContentIdentity;
use crate::model::{SelectionState, TrackId};
use crate::shadow::{ReconcileOutcome, ShadowAudioController};
use crate::store::TrackStore;

use self::core::EngineCore;

/// Receiving end of the playback signals sent by binding listeners
pub struct PlaybackEventStream {
    rx: mpsc::UnboundedReceiver<PlaybackSignal>,
}

impl PlaybackEventStream {
    pub async fn recv(&mut self) -> Option<PlaybackSignal> {
        self.rx.recv().await
    }

    /// Deliver every queued signal to `engine` without waiting
    ///
    /// Returns the number of signals handled by the live binding.
    pub fn drain_into(&mut self, engine: &AudioSwapEngine) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.rx.try_recv() {
            if engine.handle_playback_event(signal) {
                handled += 1;
            }
        }
        handled
    }
}

pub struct AudioSwapEngine {
    core: Mutex<EngineCore>,
    store: Arc<dyn TrackStore>,
    document: Arc<dyn HostDocument>,
    events: EventBus,
    /// Serializes selection writes so they land in call order
    persist_gate: tokio::sync::Mutex<()>,
}

impl AudioSwapEngine {
    pub fn new(
        settings: &SyncSettings,
        store: Arc<dyn TrackStore>,
        document: Arc<dyn HostDocument>,
        backend: Arc<dyn AudioBackend>,
    ) -> (Self, PlaybackEventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventBus::default();
        let core = EngineCore::new(
            BindingManager::new(tx),
            ShadowAudioController::new(backend, settings, events.clone()),
            events.clone(),
        );

        (
            Self {
                core: Mutex::new(core),
                store,
                document,
                events,
                persist_gate: tokio::sync::Mutex::new(()),
            },
            PlaybackEventStream { rx },
        )
    }

    fn core(&self) -> MutexGuard<'_, EngineCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SelectionState {
        self.core().state.clone()
    }

    pub fn current_identity(&self) -> Option<ContentIdentity> {
        self.core().identity.clone()
    }

    pub fn has_session(&self) -> bool {
        self.core().shadow.has_session()
    }

    /// Track of the live session and whether its resources are allocated
    pub fn session_info(&self) -> Option<(TrackId, bool)> {
        self.core()
            .shadow
            .session()
            .map(|s| (s.track_id(), s.is_allocated()))
    }

    pub fn binding_generation(&self) -> Option<u64> {
        self.core().binding.current_generation()
    }

    pub fn current_element(&self) -> Option<ElementRef> {
        self.core().binding.current_element().cloned()
    }

    /// The host tree changed; re-locate and bind the playback element
    pub fn on_tree_changed(&self) -> BindOutcome {
        let root = self.document.root();
        self.core().rebind(&root)
    }

    /// Handle one playback signal; returns `false` for stale signals
    pub fn handle_playback_event(&self, signal: PlaybackSignal) -> bool {
        self.core().handle_signal(signal)
    }

    /// Periodic drift check while the bound video plays
    pub fn periodic_reconcile(&self) -> ReconcileOutcome {
        self.core().reconcile()
    }

    /// Release the session, clear the forced mute and unbind
    pub fn shutdown(&self) {
        self.core().shutdown();
    }
}
