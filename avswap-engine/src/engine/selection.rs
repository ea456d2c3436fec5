//! Selection state machine
//!
//! States are `Original` and `Custom(track)`. Every transition is applied to
//! the runtime first, under the core lock, and persisted afterwards. Writes
//! pass through `persist_gate` in call order, so the stored selection for an
//! identity always ends up as the last transition applied to it.
//!
//! Store failures are returned to the caller; the in-memory state always
//! reflects what was actually applied.

use avswap_common::events::EngineEvent;
use tracing::{debug, info, warn};

use super::AudioSwapEngine;
use crate::error::{Error, Result};
use crate::identity::ContentIdentity;
use crate::model::{sort_for_display, AudioTrack, Payload, SelectionState, TrackId};

impl AudioSwapEngine {
    /// Stop substituting and restore the video's own audio
    pub async fn select_original(&self) -> Result<()> {
        let identity = {
            let mut core = self.core();
            core.apply_original();
            core.identity.clone()
        };
        self.persist_selection(identity.as_ref(), None, "save selection")
            .await
    }

    /// Substitute the video's audio with a stored track
    ///
    /// The state switches immediately; persisting the choice happens after.
    pub async fn select_custom(
        &self,
        track_id: TrackId,
        name: &str,
        payload: Payload,
    ) -> Result<()> {
        let root = self.document.root();
        let identity = {
            let mut core = self.core();
            core.apply_custom(track_id, name, payload, &root);
            core.identity.clone()
        };
        self.persist_selection(identity.as_ref(), Some(track_id), "save selection")
            .await
    }

    /// Store a new track for the current content and select it
    pub async fn add_and_select(&self, name: &str, payload: Payload) -> Result<TrackId> {
        let identity = self.current_identity().ok_or(Error::NoIdentity)?;

        let track_id = self
            .store
            .create_track(&identity, name, payload.clone())
            .await
            .map_err(|e| Error::store("add track", e))?;
        info!(track_id = %track_id, identity = %identity, "Added track");

        if !self.is_current_identity(&identity) {
            // Navigated away while storing; select it for the content it belongs to
            self.persist_selection(Some(&identity), Some(track_id), "save selection")
                .await?;
            return Ok(track_id);
        }

        self.select_custom(track_id, name, payload).await?;
        Ok(track_id)
    }

    /// Delete the selected track and fall back to the original audio
    pub async fn delete_current(&self) -> Result<()> {
        let Some(track_id) = self.state().track_id() else {
            debug!("delete_current with original audio selected; nothing to do");
            return Ok(());
        };

        self.store
            .delete_track(track_id)
            .await
            .map_err(|e| Error::store("delete track", e))?;
        info!(track_id = %track_id, "Deleted track");

        if self.state().track_id() == Some(track_id) {
            self.select_original().await
        } else {
            Ok(())
        }
    }

    /// Tracks of the current content, oldest first
    pub async fn list_tracks(&self) -> Result<Vec<AudioTrack>> {
        let identity = self.current_identity().ok_or(Error::NoIdentity)?;
        let mut tracks = self
            .store
            .list_tracks(&identity)
            .await
            .map_err(|e| Error::store("list tracks", e))?;
        sort_for_display(&mut tracks);
        Ok(tracks)
    }

    /// Content identity changed: tear down, then restore the stored selection
    ///
    /// A selection pointing at a deleted track is downgraded to `Original`
    /// and the downgrade is persisted. The stored result is discarded when
    /// another identity change or any selection transition happened while
    /// the store was being read.
    pub async fn reload_for_identity(&self, identity: ContentIdentity) -> Result<SelectionState> {
        let root = self.document.root();
        let transition = {
            let mut core = self.core();
            core.apply_original();
            core.identity = Some(identity.clone());
            core.rebind(&root);
            core.transitions
        };
        info!(identity = %identity, "Reloading selection for content");

        let selected = self
            .store
            .get_selection(&identity)
            .await
            .map_err(|e| Error::store("load selection", e))?;
        if !self.core().reload_is_current(&identity, transition) {
            debug!(identity = %identity, "Superseded while loading selection");
            return Ok(self.state());
        }

        let Some(track_id) = selected else {
            return Ok(SelectionState::Original);
        };

        let track = self
            .store
            .get_track(&identity, track_id)
            .await
            .map_err(|e| Error::store("load track", e))?;

        match track {
            Some(track) => {
                let root = self.document.root();
                let mut core = self.core();
                if !core.reload_is_current(&identity, transition) {
                    debug!(identity = %identity, "Superseded while loading track");
                    return Ok(core.state.clone());
                }
                core.apply_custom(track.id, &track.display_name, track.payload, &root);
                Ok(core.state.clone())
            }
            None => {
                if !self.core().reload_is_current(&identity, transition) {
                    return Ok(self.state());
                }
                warn!(
                    identity = %identity,
                    "{}; reverting to original",
                    Error::DanglingSelection { track_id }
                );
                self.events.emit(EngineEvent::SelectionHealed {
                    content_identity: identity.to_string(),
                    missing_track_id: track_id.0,
                    timestamp: chrono::Utc::now(),
                });
                self.persist_selection(Some(&identity), None, "repair selection")
                    .await?;
                Ok(SelectionState::Original)
            }
        }
    }

    fn is_current_identity(&self, identity: &ContentIdentity) -> bool {
        self.core().identity.as_ref() == Some(identity)
    }

    async fn persist_selection(
        &self,
        identity: Option<&ContentIdentity>,
        track_id: Option<TrackId>,
        action: &'static str,
    ) -> Result<()> {
        let Some(identity) = identity else {
            debug!("No content identity loaded; selection kept in memory only");
            return Ok(());
        };

        let _gate = self.persist_gate.lock().await;
        self.store
            .set_selection(identity, track_id)
            .await
            .map_err(|e| {
                warn!(identity = %identity, "Failed to persist selection: {}", e);
                Error::store(action, e)
            })?;
        debug!(identity = %identity, track_id = ?track_id, "Persisted selection");
        Ok(())
    }
}
