//! In-memory track store
//!
//! For hosts without durable storage and for tests. Same semantics as the
//! SQLite store, including strictly increasing `created_at`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use avswap_common::Result;
use tokio::sync::RwLock;

use super::TrackStore;
use crate::identity::ContentIdentity;
use crate::model::{AudioTrack, Payload, TrackId};

#[derive(Default)]
struct Inner {
    tracks: BTreeMap<TrackId, AudioTrack>,
    selections: HashMap<ContentIdentity, Option<TrackId>>,
    next_id: i64,
    last_created_at: i64,
}

#[derive(Default)]
pub struct MemoryTrackStore {
    inner: RwLock<Inner>,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tracks across all identities
    pub async fn track_count(&self) -> usize {
        self.inner.read().await.tracks.len()
    }
}

#[async_trait]
impl TrackStore for MemoryTrackStore {
    async fn create_track(
        &self,
        identity: &ContentIdentity,
        name: &str,
        payload: Payload,
    ) -> Result<TrackId> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = TrackId(inner.next_id);
        let created_at = chrono::Utc::now()
            .timestamp_millis()
            .max(inner.last_created_at + 1);
        inner.last_created_at = created_at;

        inner.tracks.insert(
            id,
            AudioTrack {
                id,
                content_identity: identity.clone(),
                display_name: name.to_string(),
                payload,
                created_at,
            },
        );
        Ok(id)
    }

    async fn list_tracks(&self, identity: &ContentIdentity) -> Result<Vec<AudioTrack>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tracks
            .values()
            .filter(|t| &t.content_identity == identity)
            .cloned()
            .collect())
    }

    async fn delete_track(&self, track_id: TrackId) -> Result<()> {
        self.inner.write().await.tracks.remove(&track_id);
        Ok(())
    }

    async fn get_selection(&self, identity: &ContentIdentity) -> Result<Option<TrackId>> {
        Ok(self
            .inner
            .read()
            .await
            .selections
            .get(identity)
            .copied()
            .flatten())
    }

    async fn set_selection(
        &self,
        identity: &ContentIdentity,
        track_id: Option<TrackId>,
    ) -> Result<()> {
        self.inner
            .write()
            .await
            .selections
            .insert(identity.clone(), track_id);
        Ok(())
    }
}
