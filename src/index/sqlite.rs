use super::backend::{IndexBackend, IndexMode, IndexRecord};
use crate::locator::Locator;
use crate::messages::SlotId;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;

/// Recording index stored in a SQLite database file
pub struct SqliteBackend {
    conn: Mutex<Option<Connection>>,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        tracing::info!("Opened recording index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T>(&self, op: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().context("Recording index is closed")?;
        op(conn)
    }
}

impl IndexBackend for SqliteBackend {
    fn init(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS recordings (
                    id INTEGER PRIMARY KEY NOT NULL,
                    slot INTEGER NOT NULL,
                    locator TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recordings_slot ON recordings(slot);
                "#,
            )
            .context("Failed to initialize schema")
        })
    }

    fn insert(&self, slot: SlotId, locator: &Locator, mode: IndexMode) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction().context("Failed to begin transaction")?;
            if mode == IndexMode::Latest {
                tx.execute("DELETE FROM recordings WHERE slot = ?1", params![slot as i64])
                    .context("Failed to clear previous recordings")?;
            }
            tx.execute(
                "INSERT INTO recordings (slot, locator) VALUES (?1, ?2)",
                params![slot as i64, locator.as_str()],
            )
            .context("Failed to insert recording")?;
            tx.commit().context("Failed to commit recording")
        })
    }

    fn list(&self) -> Result<Vec<IndexRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, slot, locator FROM recordings ORDER BY id ASC")
                .context("Failed to prepare query")?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(IndexRecord {
                        id: row.get(0)?,
                        slot: row.get::<_, i64>(1)? as SlotId,
                        locator: Locator::new(row.get::<_, String>(2)?),
                    })
                })
                .context("Failed to query recordings")?;

            rows.collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read recordings")
        })
    }

    fn close(&self) -> Result<()> {
        let Some(conn) = self.conn.lock().take() else {
            return Ok(());
        };
        conn.close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")?;
        tracing::info!("Closed recording index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.init().unwrap();
        backend.insert(0, &"file:///a.wav".into(), IndexMode::Log).unwrap();
        backend.init().unwrap();

        assert_eq!(backend.list().unwrap().len(), 1);
    }

    #[test]
    fn test_log_mode_accumulates_rows() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.init().unwrap();
        backend.insert(1, &"file:///a.wav".into(), IndexMode::Log).unwrap();
        backend.insert(1, &"file:///b.wav".into(), IndexMode::Log).unwrap();

        let records = backend.list().unwrap();
        let locators: Vec<&str> = records.iter().map(|r| r.locator.as_str()).collect();
        assert_eq!(locators, ["file:///a.wav", "file:///b.wav"]);
        assert!(records.iter().all(|r| r.slot == 1));
        assert!(records[0].id < records[1].id);
    }

    #[test]
    fn test_latest_mode_replaces_slot_rows() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.init().unwrap();
        backend.insert(0, &"file:///a.wav".into(), IndexMode::Log).unwrap();
        backend.insert(0, &"file:///b.wav".into(), IndexMode::Log).unwrap();
        backend.insert(2, &"file:///c.wav".into(), IndexMode::Latest).unwrap();
        backend.insert(0, &"file:///d.wav".into(), IndexMode::Latest).unwrap();

        let records = backend.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].slot, 2);
        assert_eq!(records[1].locator.as_str(), "file:///d.wav");
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recordings.db");

        let backend = SqliteBackend::open(&path).unwrap();
        backend.init().unwrap();
        backend.insert(2, &"file:///kept.wav".into(), IndexMode::Log).unwrap();
        backend.close().unwrap();

        let reopened = SqliteBackend::open(&path).unwrap();
        reopened.init().unwrap();
        let records = reopened.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].slot, 2);
        assert_eq!(records[0].locator.as_str(), "file:///kept.wav");
    }

    #[test]
    fn test_closed_backend_rejects_writes() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.init().unwrap();
        backend.close().unwrap();
        // Second close is a no-op
        backend.close().unwrap();

        assert!(backend.insert(0, &"file:///a.wav".into(), IndexMode::Log).is_err());
    }
}
