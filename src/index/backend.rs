use crate::locator::Locator;
use crate::messages::SlotId;
use anyhow::Result;
#[cfg(test)]
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(test)]
use std::time::Duration;

/// One persisted capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: i64,
    pub slot: SlotId,
    pub locator: Locator,
}

/// How a completed capture is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Every capture appends a row
    #[default]
    Log,
    /// Only the newest row per slot is kept
    Latest,
}

/// Storage engine behind the recording index
///
/// Calls are blocking; `RecordingIndex` runs them on the blocking pool.
pub trait IndexBackend: Send + Sync {
    /// Create the schema if absent. Safe to call repeatedly.
    fn init(&self) -> Result<()>;

    fn insert(&self, slot: SlotId, locator: &Locator, mode: IndexMode) -> Result<()>;

    /// All records, oldest first
    fn list(&self) -> Result<Vec<IndexRecord>>;

    /// Release the underlying handle
    fn close(&self) -> Result<()>;
}

/// Stand-in used when durable history is unavailable
pub struct NullBackend;

impl IndexBackend for NullBackend {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn insert(&self, slot: SlotId, locator: &Locator, _mode: IndexMode) -> Result<()> {
        tracing::debug!("History disabled, not persisting slot {} -> {}", slot, locator);
        Ok(())
    }

    fn list(&self) -> Result<Vec<IndexRecord>> {
        Ok(Vec::new())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Process-local index, lost on exit
///
/// Rejects writes once closed. Records stay listable after close so tests can
/// inspect what was persisted.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<IndexRecord>>,
    insert_delay: Duration,
    closed: AtomicBool,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a slow disk
    pub fn with_insert_delay(insert_delay: Duration) -> Self {
        Self {
            insert_delay,
            ..Self::default()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl IndexBackend for MemoryBackend {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn insert(&self, slot: SlotId, locator: &Locator, mode: IndexMode) -> Result<()> {
        std::thread::sleep(self.insert_delay);
        if self.is_closed() {
            anyhow::bail!("Recording index is closed");
        }

        let mut records = self.records.lock();
        let id = records.last().map_or(1, |r| r.id + 1);
        if mode == IndexMode::Latest {
            records.retain(|r| r.slot != slot);
        }
        records.push(IndexRecord {
            id,
            slot,
            locator: locator.clone(),
        });
        Ok(())
    }

    fn list(&self) -> Result<Vec<IndexRecord>> {
        Ok(self.records.lock().clone())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
