//! Engine core - binding, session and selection state under one lock
//!
//! **Responsibilities:**
//! - Apply selection transitions to the runtime (session + forced mute)
//! - Re-bind on tree changes and reconcile right after a new bind
//! - Route playback signals from the live binding to the shadow controller
//!
//! Everything here is synchronous; the async store work lives in
//! `selection.rs` and never runs while the core is locked.

use avswap_common::events::{EngineEvent, EventBus};
use tracing::{debug, info};

use crate::binding::{BindOutcome, BindingManager, PlaybackSignal};
use crate::host::{ElementRef, NodeRef, PlaybackEventKind};
use crate::identity::ContentIdentity;
use crate::model::{Payload, SelectionState, TrackId};
use crate::shadow::{ReconcileOutcome, ShadowAudioController};

pub(crate) struct EngineCore {
    pub(crate) binding: BindingManager,
    pub(crate) shadow: ShadowAudioController,
    pub(crate) state: SelectionState,
    pub(crate) identity: Option<ContentIdentity>,
    pub(crate) events: EventBus,
    /// Incremented by every selection transition
    pub(crate) transitions: u64,
}

impl EngineCore {
    pub(crate) fn new(
        binding: BindingManager,
        shadow: ShadowAudioController,
        events: EventBus,
    ) -> Self {
        Self {
            binding,
            shadow,
            state: SelectionState::Original,
            identity: None,
            events,
            transitions: 0,
        }
    }

    /// Whether a reload started at `transition` for `identity` may still apply
    pub(crate) fn reload_is_current(&self, identity: &ContentIdentity, transition: u64) -> bool {
        self.transitions == transition && self.identity.as_ref() == Some(identity)
    }

    /// Bind to the element under `root`, reconciling once after a new bind
    pub(crate) fn rebind(&mut self, root: &NodeRef) -> BindOutcome {
        let outcome = self.binding.bind(root);
        if let BindOutcome::Bound {
            generation,
            replaced,
        } = outcome
        {
            self.events.emit(EngineEvent::ElementBound {
                generation,
                replaced,
                timestamp: chrono::Utc::now(),
            });
            // The element may already be playing when we attach
            self.reconcile();
        }
        outcome
    }

    pub(crate) fn reconcile(&mut self) -> ReconcileOutcome {
        match self.binding.current_element().cloned() {
            Some(element) => self.shadow.reconcile(element.as_ref()),
            None => ReconcileOutcome::NoSession,
        }
    }

    /// Switch to the original audio
    ///
    /// Returns `true` when the state actually changed.
    pub(crate) fn apply_original(&mut self) -> bool {
        self.transitions += 1;
        let was_custom = self.state.is_custom();
        self.shadow.deactivate();

        if was_custom {
            if let Some(element) = self.binding.current_element() {
                if let Err(e) = element.set_muted(false) {
                    debug!("Could not clear forced mute: {}", e);
                }
            }
        }

        self.state = SelectionState::Original;
        if was_custom {
            info!("Selected original audio");
            self.emit_selection_changed();
        }
        was_custom
    }

    /// Switch to a custom track and start following the bound video
    pub(crate) fn apply_custom(
        &mut self,
        track_id: TrackId,
        name: &str,
        payload: Payload,
        root: &NodeRef,
    ) {
        self.transitions += 1;
        self.state = SelectionState::custom(track_id, name);
        self.shadow.deactivate();
        self.shadow.activate(track_id, payload);
        info!(track_id = %track_id, label = self.state.label(), "Selected custom track");
        self.emit_selection_changed();

        match self.rebind(root) {
            BindOutcome::Bound { .. } => {}
            BindOutcome::Unchanged { .. } | BindOutcome::NotFound => {
                self.reconcile();
            }
        }
    }

    /// Route one playback signal; stale generations are ignored
    pub(crate) fn handle_signal(&mut self, signal: PlaybackSignal) -> bool {
        if !self.binding.is_current(signal.generation) {
            debug!(
                generation = signal.generation,
                current = ?self.binding.current_generation(),
                event = %signal.kind,
                "Dropping signal from stale binding"
            );
            return false;
        }
        let Some(element) = self.binding.current_element().cloned() else {
            return false;
        };
        self.dispatch(&element, signal.kind);
        true
    }

    fn dispatch(&mut self, element: &ElementRef, kind: PlaybackEventKind) {
        let video = element.as_ref();
        match kind {
            PlaybackEventKind::Play
            | PlaybackEventKind::Playing
            | PlaybackEventKind::TimeUpdate => {
                self.shadow.reconcile(video);
            }
            PlaybackEventKind::Pause
            | PlaybackEventKind::Waiting
            | PlaybackEventKind::Stalled
            | PlaybackEventKind::Ended
            | PlaybackEventKind::Emptied => self.shadow.stop(),
            PlaybackEventKind::Seeking => {
                self.shadow.on_seek(video);
            }
            PlaybackEventKind::RateChange => self.shadow.on_rate_change(video),
            PlaybackEventKind::VolumeChange => self.shadow.on_volume_change(video),
        }
    }

    /// Tear everything down
    pub(crate) fn shutdown(&mut self) {
        self.apply_original();
        self.binding.unbind();
    }

    fn emit_selection_changed(&self) {
        self.events.emit(EngineEvent::SelectionChanged {
            content_identity: self.identity.as_ref().map(|i| i.to_string()),
            track_id: self.state.track_id().map(|t| t.0),
            display_name: self.state.label().to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
