//! Persisted and runtime data types

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identity::ContentIdentity;

/// Opaque audio payload (the raw file contents supplied by the user)
///
/// Shared rather than copied: the same bytes back the stored track, the
/// pending session and the allocated resource.
pub type Payload = Arc<[u8]>;

/// Store-assigned track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A locally supplied audio track attached to one content identity
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub id: TrackId,
    pub content_identity: ContentIdentity,
    pub display_name: String,
    pub payload: Payload,
    /// Milliseconds since epoch, strictly increasing per store
    pub created_at: i64,
}

impl AudioTrack {
    /// Menu row text, falling back to `Track #<id>`
    pub fn label(&self) -> String {
        if self.display_name.trim().is_empty() {
            format!("Track #{}", self.id)
        } else {
            self.display_name.clone()
        }
    }
}

/// Persisted selection for one content identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRecord {
    pub content_identity: ContentIdentity,
    /// `None` means no substitution
    pub selected_track_id: Option<TrackId>,
}

/// Sort tracks for display (oldest first, id breaks ties)
pub fn sort_for_display(tracks: &mut [AudioTrack]) {
    tracks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

/// Which audio source is selected
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    /// No substitution; the video's own audio plays
    #[default]
    Original,
    /// Substitution active for a specific track
    Custom { track_id: TrackId, name: String },
}

impl SelectionState {
    pub const ORIGINAL_LABEL: &'static str = "Original";
    /// Button text for a selected track without a name
    pub const CUSTOM_LABEL: &'static str = "Custom";

    /// Custom state for `track_id`; a blank name shows as `Custom`
    pub fn custom(track_id: TrackId, name: &str) -> Self {
        let name = if name.trim().is_empty() {
            Self::CUSTOM_LABEL.to_string()
        } else {
            name.to_string()
        };
        SelectionState::Custom { track_id, name }
    }

    pub fn track_id(&self) -> Option<TrackId> {
        match self {
            SelectionState::Original => None,
            SelectionState::Custom { track_id, .. } => Some(*track_id),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, SelectionState::Custom { .. })
    }

    /// Label for the UI button
    ///
    /// Unlike `AudioTrack::label`, an unnamed track reads `Custom` here.
    pub fn label(&self) -> &str {
        match self {
            SelectionState::Original => Self::ORIGINAL_LABEL,
            SelectionState::Custom { name, .. } => name,
        }
    }
}
