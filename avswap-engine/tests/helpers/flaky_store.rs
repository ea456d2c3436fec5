//! TrackStore wrapper whose operations can be made to fail

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use avswap_common::{Error, Result};
use avswap_engine::{AudioTrack, ContentIdentity, MemoryTrackStore, Payload, TrackId, TrackStore};

pub struct FlakyStore {
    pub inner: MemoryTrackStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    selection_read_delay_ms: AtomicU64,
    selection_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTrackStore::new(),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            selection_read_delay_ms: AtomicU64::new(0),
            selection_writes: AtomicUsize::new(0),
        })
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `get_selection` take at least `delay`
    pub fn delay_selection_reads(&self, delay: Duration) {
        self.selection_read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Successful `set_selection` calls so far
    pub fn selection_writes(&self) -> usize {
        self.selection_writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected write failure".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackStore for FlakyStore {
    async fn create_track(
        &self,
        identity: &ContentIdentity,
        name: &str,
        payload: Payload,
    ) -> Result<TrackId> {
        self.check_write()?;
        self.inner.create_track(identity, name, payload).await
    }

    async fn list_tracks(&self, identity: &ContentIdentity) -> Result<Vec<AudioTrack>> {
        self.check_read()?;
        self.inner.list_tracks(identity).await
    }

    async fn delete_track(&self, track_id: TrackId) -> Result<()> {
        self.check_write()?;
        self.inner.delete_track(track_id).await
    }

    async fn get_selection(&self, identity: &ContentIdentity) -> Result<Option<TrackId>> {
        let delay = self.selection_read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_read()?;
        self.inner.get_selection(identity).await
    }

    async fn set_selection(
        &self,
        identity: &ContentIdentity,
        track_id: Option<TrackId>,
    ) -> Result<()> {
        self.check_write()?;
        self.inner.set_selection(identity, track_id).await?;
        self.selection_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_track(
        &self,
        identity: &ContentIdentity,
        track_id: TrackId,
    ) -> Result<Option<AudioTrack>> {
        self.check_read()?;
        self.inner.get_track(identity, track_id).await
    }
}
