//! Persistent track and selection storage
//!
//! The engine depends only on the `TrackStore` trait. Implementations must
//! give read-after-write consistency per content identity: a completed
//! `set_selection` for an identity is visible to the next `get_selection`.

use async_trait::async_trait;
use avswap_common::Result;

use crate::identity::ContentIdentity;
use crate::model::{AudioTrack, Payload, TrackId};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryTrackStore;
pub use sqlite::SqliteTrackStore;

#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Store a new track and return its fresh id
    async fn create_track(
        &self,
        identity: &ContentIdentity,
        name: &str,
        payload: Payload,
    ) -> Result<TrackId>;

    /// All tracks for `identity`, in no particular order
    async fn list_tracks(&self, identity: &ContentIdentity) -> Result<Vec<AudioTrack>>;

    /// Delete a track; deleting an absent track succeeds
    async fn delete_track(&self, track_id: TrackId) -> Result<()>;

    async fn get_selection(&self, identity: &ContentIdentity) -> Result<Option<TrackId>>;

    /// Overwrite the selection for `identity` (last write wins)
    async fn set_selection(&self, identity: &ContentIdentity, track_id: Option<TrackId>)
        -> Result<()>;

    /// Look up one track of `identity`
    async fn get_track(
        &self,
        identity: &ContentIdentity,
        track_id: TrackId,
    ) -> Result<Option<AudioTrack>> {
        Ok(self
            .list_tracks(identity)
            .await?
            .into_iter()
            .find(|t| t.id == track_id))
    }
}
