//! SQLite track store
//!
//! Tables are created by `avswap_common::db::init`. See that module for the
//! schema.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use avswap_common::{db, Result};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::TrackStore;
use crate::identity::ContentIdentity;
use crate::model::{AudioTrack, Payload, TrackId};

pub struct SqliteTrackStore {
    pool: SqlitePool,
}

impl SqliteTrackStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(db::init_database(db_path).await?))
    }

    /// Private in-memory database
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(db::init_memory_database().await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TrackStore for SqliteTrackStore {
    async fn create_track(
        &self,
        identity: &ContentIdentity,
        name: &str,
        payload: Payload,
    ) -> Result<TrackId> {
        // Single statement so concurrent adds never upgrade a read lock.
        // created_at stays strictly increasing even within one millisecond.
        let now = chrono::Utc::now().timestamp_millis();
        let id = sqlx::query(
            r#"
            INSERT INTO tracks (content_identity, display_name, payload, created_at)
            SELECT ?, ?, ?, MAX(?, COALESCE(MAX(created_at), 0) + 1) FROM tracks
            "#,
        )
        .bind(identity.as_str())
        .bind(name)
        .bind(&payload[..])
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!(track_id = id, identity = %identity, bytes = payload.len(), "Stored track");
        Ok(TrackId(id))
    }

    async fn list_tracks(&self, identity: &ContentIdentity) -> Result<Vec<AudioTrack>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_identity, display_name, payload, created_at
            FROM tracks
            WHERE content_identity = ?
            "#,
        )
        .bind(identity.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let payload: Vec<u8> = row.get("payload");
                AudioTrack {
                    id: TrackId(row.get("id")),
                    content_identity: ContentIdentity::from_normalized(
                        row.get::<String, _>("content_identity"),
                    ),
                    display_name: row.get("display_name"),
                    payload: Arc::from(payload),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    async fn delete_track(&self, track_id: TrackId) -> Result<()> {
        let result = sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(track_id.0)
            .execute(&self.pool)
            .await?;

        debug!(track_id = %track_id, deleted = result.rows_affected(), "Deleted track");
        Ok(())
    }

    async fn get_selection(&self, identity: &ContentIdentity) -> Result<Option<TrackId>> {
        let selected: Option<Option<i64>> = sqlx::query_scalar(
            "SELECT selected_track_id FROM selections WHERE content_identity = ?",
        )
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(selected.flatten().map(TrackId))
    }

    async fn set_selection(
        &self,
        identity: &ContentIdentity,
        track_id: Option<TrackId>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO selections (content_identity, selected_track_id, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(content_identity) DO UPDATE SET
                selected_track_id = excluded.selected_track_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(identity.as_str())
        .bind(track_id.map(|t| t.0))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_track(
        &self,
        identity: &ContentIdentity,
        track_id: TrackId,
    ) -> Result<Option<AudioTrack>> {
        let row = sqlx::query(
            r#"
            SELECT display_name, payload, created_at
            FROM tracks
            WHERE id = ? AND content_identity = ?
            "#,
        )
        .bind(track_id.0)
        .bind(identity.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let payload: Vec<u8> = row.get("payload");
            AudioTrack {
                id: track_id,
                content_identity: identity.clone(),
                display_name: row.get("display_name"),
                payload: Arc::from(payload),
                created_at: row.get("created_at"),
            }
        }))
    }
}
