//! Durable index of completed captures
//!
//! Writes are issued from the controller without being awaited; the returned
//! `PersistTask` lets a caller observe completion when it cares to. Each write
//! holds a read guard on the index gate, and `close` takes the write side, so
//! closing waits for every queued write.

pub mod backend;
pub mod sqlite;

#[cfg(test)]
pub use backend::MemoryBackend;
pub use backend::{IndexBackend, IndexMode, IndexRecord, NullBackend};
pub use sqlite::SqliteBackend;

use crate::error::{SoundboardError, SoundboardResult};
use crate::locator::Locator;
use crate::messages::SlotId;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct RecordingIndex {
    backend: Arc<dyn IndexBackend>,
    mode: IndexMode,
    gate: Arc<RwLock<()>>,
}

impl RecordingIndex {
    /// Initialize `backend`, falling back to a no-op index if that fails
    pub async fn open(backend: Arc<dyn IndexBackend>, mode: IndexMode) -> Self {
        let index = Self::with_backend(backend, mode);
        match index.init().await {
            Ok(()) => index,
            Err(e) => {
                tracing::warn!("Recording history unavailable, continuing without it: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self::with_backend(Arc::new(NullBackend), IndexMode::Log)
    }

    fn with_backend(backend: Arc<dyn IndexBackend>, mode: IndexMode) -> Self {
        Self {
            backend,
            mode,
            gate: Arc::new(RwLock::new(())),
        }
    }

    pub async fn init(&self) -> SoundboardResult<()> {
        self.run(|backend| backend.init()).await
    }

    /// Persist a completed capture in the background
    pub fn record_completion(&self, slot: SlotId, locator: Locator) -> PersistTask {
        let backend = self.backend.clone();
        let mode = self.mode;
        // Taken before spawning so a close issued after this call waits for it
        let guard = self.gate.clone().try_read_owned();

        let handle = tokio::task::spawn_blocking(move || {
            let Ok(_guard) = guard else {
                tracing::error!("Recording index is closing, dropped slot {} -> {}", slot, locator);
                return Err(SoundboardError::Persistence(anyhow::anyhow!(
                    "Recording index is closing"
                )));
            };
            backend.insert(slot, &locator, mode).map_err(|e| {
                tracing::error!("Failed to persist slot {} -> {}: {:#}", slot, locator, e);
                SoundboardError::Persistence(e)
            })
        });

        PersistTask { handle }
    }

    pub async fn list_recordings(&self) -> SoundboardResult<Vec<IndexRecord>> {
        self.run(|backend| backend.list()).await
    }

    /// Wait for outstanding writes, then close the backend
    pub async fn close(&self) -> SoundboardResult<()> {
        let _drained = self.gate.write().await;
        self.run(|backend| backend.close()).await
    }

    async fn run<T, F>(&self, op: F) -> SoundboardResult<T>
    where
        F: FnOnce(&dyn IndexBackend) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || op(backend.as_ref()))
            .await
            .map_err(|e| SoundboardError::Persistence(anyhow::anyhow!("Index task failed: {}", e)))?
            .map_err(SoundboardError::Persistence)
    }
}

/// Handle to an in-flight index write
pub struct PersistTask {
    handle: JoinHandle<SoundboardResult<()>>,
}

impl PersistTask {
    pub async fn wait(self) -> SoundboardResult<()> {
        self.handle.await.map_err(|e| {
            SoundboardError::Persistence(anyhow::anyhow!("Index write task failed: {}", e))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct BrokenBackend;

    impl IndexBackend for BrokenBackend {
        fn init(&self) -> anyhow::Result<()> {
            anyhow::bail!("storage unavailable")
        }

        fn insert(&self, _: SlotId, _: &Locator, _: IndexMode) -> anyhow::Result<()> {
            anyhow::bail!("storage unavailable")
        }

        fn list(&self) -> anyhow::Result<Vec<IndexRecord>> {
            anyhow::bail!("storage unavailable")
        }

        fn close(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_record_completion_is_listed() {
        let index = RecordingIndex::open(Arc::new(MemoryBackend::new()), IndexMode::Log).await;

        index
            .record_completion(1, Locator::new("file:///a.m4a"))
            .wait()
            .await
            .unwrap();

        let records = index.list_recordings().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slot, 1);
        assert_eq!(records[0].locator.as_str(), "file:///a.m4a");
    }

    #[tokio::test]
    async fn test_failed_init_degrades_to_noop() {
        let index = RecordingIndex::open(Arc::new(BrokenBackend), IndexMode::Log).await;

        index
            .record_completion(0, Locator::new("file:///a.wav"))
            .wait()
            .await
            .unwrap();
        assert!(index.list_recordings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_on_wait() {
        let index = RecordingIndex::with_backend(Arc::new(BrokenBackend), IndexMode::Log);

        let result = index
            .record_completion(0, Locator::new("file:///a.wav"))
            .wait()
            .await;
        assert!(matches!(result, Err(SoundboardError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_close_waits_for_queued_writes() {
        let backend = Arc::new(MemoryBackend::with_insert_delay(Duration::from_millis(100)));
        let index = RecordingIndex::open(backend.clone(), IndexMode::Log).await;

        // Dropped without waiting, like a fire-and-forget completion
        drop(index.record_completion(0, Locator::new("file:///a.wav")));
        drop(index.record_completion(1, Locator::new("file:///b.wav")));
        index.close().await.unwrap();

        let records = backend.list().unwrap();
        assert_eq!(records.len(), 2);
        assert!(backend.is_closed());
    }

    #[tokio::test]
    async fn test_write_after_close_is_rejected() {
        let index = RecordingIndex::open(Arc::new(MemoryBackend::new()), IndexMode::Log).await;
        index.close().await.unwrap();

        let result = index
            .record_completion(0, Locator::new("file:///late.wav"))
            .wait()
            .await;
        assert!(matches!(result, Err(SoundboardError::Persistence(_))));
    }
}
