//! Event types for the avswap event system
//!
//! The engine broadcasts `EngineEvent`s on an `EventBus` so a hosting UI can
//! re-render without polling. Events serialize with a `type` tag for hosts
//! that forward them over a message channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Engine lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Selection state changed
    ///
    /// `track_id` is `None` for the original audio.
    SelectionChanged {
        content_identity: Option<String>,
        track_id: Option<i64>,
        display_name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A playback element was bound (first bind or replacement)
    ElementBound {
        generation: u64,
        replaced: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Shadow audio resources were allocated for a track
    SessionStarted {
        track_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Shadow audio session torn down and its resource handle released
    SessionReleased {
        track_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Shadow audio was snapped to the video position
    DriftCorrected {
        track_id: i64,
        drift_s: f64,
        video_time_s: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A persisted selection referenced a missing track and was downgraded
    SelectionHealed {
        content_identity: String,
        missing_track_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Play attempts keep being rejected (e.g. autoplay policy)
    ///
    /// Informational: the engine keeps retrying on every reconciliation.
    PlaybackBlocked {
        track_id: i64,
        consecutive_rejections: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl EngineEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::SelectionChanged { .. } => "SelectionChanged",
            EngineEvent::ElementBound { .. } => "ElementBound",
            EngineEvent::SessionStarted { .. } => "SessionStarted",
            EngineEvent::SessionReleased { .. } => "SessionReleased",
            EngineEvent::DriftCorrected { .. } => "DriftCorrected",
            EngineEvent::SelectionHealed { .. } => "SelectionHealed",
            EngineEvent::PlaybackBlocked { .. } => "PlaybackBlocked",
        }
    }
}

/// Broadcast bus for engine events
///
/// Events emitted while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, event: EngineEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let delivered = bus.emit(EngineEvent::SessionStarted {
            track_id: 7,
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(delivered, 1);

        match rx.recv().await.unwrap() {
            EngineEvent::SessionStarted { track_id, .. } => assert_eq!(track_id, 7),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(10);
        let delivered = bus.emit(EngineEvent::SessionReleased {
            track_id: 1,
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_serialized_type_tag() {
        let event = EngineEvent::SelectionHealed {
            content_identity: "https://vk.com/video1".to_string(),
            missing_track_id: 3,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["missing_track_id"], 3);
    }
}
