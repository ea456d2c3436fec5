//! Shadow audio controller
//!
//! Owns at most one `ShadowAudioSession`: the substitute audio for the
//! selected track. Playback resources are allocated lazily on the first
//! reconciliation against a playing video and released exactly once, when
//! the session is torn down.
//!
//! **Reconciliation (per playback event and periodic tick):**
//! 1. Force the video muted; the shadow audio is the only audible source
//! 2. Mirror volume, muting the shadow audio when the video volume is zero
//! 3. Snap the shadow position to the video when drift exceeds the tolerance
//! 4. Mirror playback rate
//! 5. Start the shadow audio if it is paused; rejections are retried on the
//!    next reconciliation

use std::sync::Arc;

use avswap_common::config::SyncSettings;
use avswap_common::events::{EngineEvent, EventBus};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::host::{AudioBackend, PlaybackElement, ResourceHandle, ShadowAudio};
use crate::model::{Payload, TrackId};

/// Allocated playback resources of a session
///
/// Declaration order matters: the audio object is dropped before the handle
/// releases the resource it plays from.
struct LiveAudio {
    audio: Box<dyn ShadowAudio>,
    handle: ResourceHandle,
}

impl LiveAudio {
    fn open(backend: &Arc<dyn AudioBackend>, payload: &Payload) -> Result<Self> {
        let handle = ResourceHandle::allocate(Arc::clone(backend), payload)?;
        let audio = handle.open()?;
        Ok(Self { audio, handle })
    }

    fn stop(&mut self) {
        if !self.audio.is_paused() {
            self.audio.pause();
        }
    }
}

impl Drop for LiveAudio {
    fn drop(&mut self) {
        self.audio.pause();
        self.audio.clear_source();
        debug!(resource = ?self.handle.key(), "Releasing shadow audio resource");
    }
}

/// The substitute audio for one selected track
pub struct ShadowAudioSession {
    track_id: TrackId,
    payload: Payload,
    live: Option<LiveAudio>,
    consecutive_rejections: u32,
}

impl ShadowAudioSession {
    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    /// Whether playback resources have been allocated yet
    pub fn is_allocated(&self) -> bool {
        self.live.is_some()
    }

    pub fn consecutive_rejections(&self) -> u32 {
        self.consecutive_rejections
    }
}

/// What a reconciliation did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileOutcome {
    /// No custom track selected
    NoSession,
    /// The video is paused; nothing to follow
    VideoPaused,
    /// Resources could not be allocated for the session
    Unavailable,
    Synced {
        /// Drift in seconds when a snap occurred
        corrected_drift: Option<f64>,
        /// Shadow audio playing after the step
        playing: bool,
    },
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn mirror_volume(audio: &mut dyn ShadowAudio, video: &dyn PlaybackElement) {
    let volume = finite_or_zero(video.volume()).clamp(0.0, 1.0);
    audio.set_volume(volume);
    audio.set_muted(volume == 0.0);
}

pub struct ShadowAudioController {
    backend: Arc<dyn AudioBackend>,
    drift_tolerance_s: f64,
    rejection_notice_threshold: u32,
    events: EventBus,
    session: Option<ShadowAudioSession>,
}

impl ShadowAudioController {
    pub fn new(backend: Arc<dyn AudioBackend>, settings: &SyncSettings, events: EventBus) -> Self {
        Self {
            backend,
            drift_tolerance_s: settings.drift_tolerance_s,
            rejection_notice_threshold: settings.rejection_notice_threshold,
            events,
            session: None,
        }
    }

    /// Prepare a session for `track_id`; resources are allocated on first use
    pub fn activate(&mut self, track_id: TrackId, payload: Payload) {
        if let Some(session) = &self.session {
            if session.track_id == track_id {
                debug!(track_id = %track_id, "Session already active for track");
                return;
            }
            self.deactivate();
        }

        info!(track_id = %track_id, bytes = payload.len(), "Activated shadow audio session");
        self.session = Some(ShadowAudioSession {
            track_id,
            payload,
            live: None,
            consecutive_rejections: 0,
        });
    }

    /// Stop playback, release resources and clear the session
    ///
    /// Returns the track of the session that was torn down, if any.
    pub fn deactivate(&mut self) -> Option<TrackId> {
        let session = self.session.take()?;
        let track_id = session.track_id;
        let was_allocated = session.live.is_some();
        drop(session);

        info!(track_id = %track_id, was_allocated, "Deactivated shadow audio session");
        if was_allocated {
            self.events.emit(EngineEvent::SessionReleased {
                track_id: track_id.0,
                timestamp: chrono::Utc::now(),
            });
        }
        Some(track_id)
    }

    pub fn session(&self) -> Option<&ShadowAudioSession> {
        self.session.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Bring the shadow audio in line with `video`
    pub fn reconcile(&mut self, video: &dyn PlaybackElement) -> ReconcileOutcome {
        let Some(session) = self.session.as_mut() else {
            return ReconcileOutcome::NoSession;
        };
        if video.is_paused() {
            return ReconcileOutcome::VideoPaused;
        }

        if session.live.is_none() {
            match LiveAudio::open(&self.backend, &session.payload) {
                Ok(live) => {
                    info!(
                        track_id = %session.track_id,
                        resource = ?live.handle.key(),
                        "Allocated shadow audio"
                    );
                    session.live = Some(live);
                    self.events.emit(EngineEvent::SessionStarted {
                        track_id: session.track_id.0,
                        timestamp: chrono::Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(track_id = %session.track_id, "Could not open shadow audio: {}", e);
                    return ReconcileOutcome::Unavailable;
                }
            }
        }
        let track_id = session.track_id;
        let Some(live) = session.live.as_mut() else {
            return ReconcileOutcome::Unavailable;
        };

        if !video.is_muted() {
            if let Err(e) = video.set_muted(true) {
                debug!("Could not mute video: {}", e);
            }
        }

        mirror_volume(live.audio.as_mut(), video);

        let video_time = finite_or_zero(video.current_time());
        let drift = (finite_or_zero(live.audio.current_time()) - video_time).abs();
        let mut corrected_drift = None;
        if drift > self.drift_tolerance_s {
            match live.audio.set_current_time(video_time) {
                Ok(()) => {
                    debug!(
                        track_id = %track_id,
                        drift_s = drift,
                        video_time_s = video_time,
                        "Corrected drift"
                    );
                    corrected_drift = Some(drift);
                    self.events.emit(EngineEvent::DriftCorrected {
                        track_id: track_id.0,
                        drift_s: drift,
                        video_time_s: video_time,
                        timestamp: chrono::Utc::now(),
                    });
                }
                Err(e) => debug!("Could not seek shadow audio: {}", e),
            }
        }

        live.audio.set_playback_rate(video.playback_rate());

        if live.audio.is_paused() {
            match live.audio.play().map_err(|e| Error::PlaybackRejected(e.0)) {
                Ok(()) => session.consecutive_rejections = 0,
                Err(e) => {
                    session.consecutive_rejections += 1;
                    debug!(
                        track_id = %track_id,
                        attempts = session.consecutive_rejections,
                        "{}; retrying on next reconciliation",
                        e
                    );
                    if session.consecutive_rejections == self.rejection_notice_threshold {
                        warn!(track_id = %track_id, "Shadow audio playback keeps being rejected");
                        self.events.emit(EngineEvent::PlaybackBlocked {
                            track_id: track_id.0,
                            consecutive_rejections: session.consecutive_rejections,
                            timestamp: chrono::Utc::now(),
                        });
                    }
                }
            }
        }

        ReconcileOutcome::Synced {
            corrected_drift,
            playing: !live.audio.is_paused(),
        }
    }

    /// Stop the shadow audio and jump straight to the video position
    ///
    /// Returns `true` when a live session was resynced.
    pub fn on_seek(&mut self, video: &dyn PlaybackElement) -> bool {
        let Some(live) = self.live_mut() else {
            return false;
        };
        live.stop();
        let target = finite_or_zero(video.current_time());
        match live.audio.set_current_time(target) {
            Ok(()) => {
                debug!(video_time_s = target, "Resynced shadow audio after seek");
                true
            }
            Err(e) => {
                debug!("Could not seek shadow audio: {}", e);
                false
            }
        }
    }

    pub fn on_volume_change(&mut self, video: &dyn PlaybackElement) {
        if let Some(live) = self.live_mut() {
            mirror_volume(live.audio.as_mut(), video);
        }
    }

    pub fn on_rate_change(&mut self, video: &dyn PlaybackElement) {
        if let Some(live) = self.live_mut() {
            live.audio.set_playback_rate(video.playback_rate());
        }
    }

    /// Pause the shadow audio; a no-op when already stopped
    pub fn stop(&mut self) {
        if let Some(live) = self.live_mut() {
            live.stop();
        }
    }

    fn live_mut(&mut self) -> Option<&mut LiveAudio> {
        self.session.as_mut().and_then(|s| s.live.as_mut())
    }
}

impl Drop for ShadowAudioController {
    fn drop(&mut self) {
        self.deactivate();
    }
}
