//! SQLite-backed record store.

use crate::error::{MirrorError, Result};
use crate::store::traits::RecordStore;
use crate::store::types::{DownloadRecord, FileRole};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// SQLite implementation of [`RecordStore`].
///
/// Thread-safe via an internal mutex on the connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the store at the given database path.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MirrorError::io_with_path(e, parent))?;
        }

        let conn = Connection::open(db_path).map_err(|e| MirrorError::Database {
            message: format!("Failed to open database: {}", e),
            source: Some(e),
        })?;

        // WAL for concurrent readers while the worker writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| MirrorError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store. Used by tests and throwaway setups.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| MirrorError::Database {
            message: format!("Failed to open in-memory database: {}", e),
            source: Some(e),
        })?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                model_id INTEGER NOT NULL,
                version_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                model_type TEXT NOT NULL,
                files TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(model_id, version_id)
            );

            CREATE INDEX IF NOT EXISTS idx_downloads_type
                ON downloads(model_type);
            "#,
        )
        .map_err(|e| MirrorError::Database {
            message: format!("Failed to initialize schema: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| MirrorError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DownloadRecord> {
        let files_json: String = row.get(4)?;
        let created_at: String = row.get(5)?;

        let files: BTreeMap<FileRole, String> =
            serde_json::from_str(&files_json).unwrap_or_default();
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(DownloadRecord {
            model_id: row.get(0)?,
            version_id: row.get(1)?,
            name: row.get(2)?,
            model_type: row.get(3)?,
            files,
            created_at,
        })
    }
}

const RECORD_COLUMNS: &str = "model_id, version_id, name, model_type, files, created_at";

impl RecordStore for SqliteStore {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    fn find_by_pair(&self, model_id: i64, version_id: i64) -> Result<Option<DownloadRecord>> {
        let conn = self.lock_conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM downloads WHERE model_id = ?1 AND version_id = ?2",
                    RECORD_COLUMNS
                ),
                params![model_id, version_id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn upsert(&self, record: &DownloadRecord) -> Result<()> {
        let files_json = serde_json::to_string(&record.files)?;
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO downloads (model_id, version_id, name, model_type, files, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(model_id, version_id) DO UPDATE SET
                name = ?3,
                model_type = ?4,
                files = ?5
            "#,
            params![
                record.model_id,
                record.version_id,
                record.name,
                record.model_type,
                files_json,
                record.created_at.to_rfc3339(),
            ],
        )?;
        debug!(
            "Upserted download record ({}, {})",
            record.model_id, record.version_id
        );
        Ok(())
    }

    fn delete(&self, model_id: i64, version_id: i64) -> Result<bool> {
        let conn = self.lock_conn()?;
        let removed = conn.execute(
            "DELETE FROM downloads WHERE model_id = ?1 AND version_id = ?2",
            params![model_id, version_id],
        )?;
        Ok(removed > 0)
    }

    fn list_all(&self) -> Result<Vec<DownloadRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM downloads ORDER BY id",
            RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn distinct_types(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT model_type FROM downloads ORDER BY model_type")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut types = Vec::new();
        for row in rows {
            types.push(row?);
        }
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(model_id: i64, version_id: i64) -> DownloadRecord {
        let mut record = DownloadRecord::new(model_id, version_id, "Test Model", "Checkpoint");
        record
            .files
            .insert(FileRole::Model, format!("/models/m{}.safetensors", version_id));
        record
    }

    #[test]
    fn test_settings_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get_setting("dir_Checkpoint").unwrap(), None);

        store.set_setting("dir_Checkpoint", "/models/ckpt").unwrap();
        assert_eq!(
            store.get_setting("dir_Checkpoint").unwrap(),
            Some("/models/ckpt".to_string())
        );

        store.set_setting("dir_Checkpoint", "/other").unwrap();
        assert_eq!(
            store.get_setting("dir_Checkpoint").unwrap(),
            Some("/other".to_string())
        );
    }

    #[test]
    fn test_upsert_and_find() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = make_record(1, 10);
        store.upsert(&record).unwrap();

        let found = store.find_by_pair(1, 10).unwrap().unwrap();
        assert_eq!(found.name, "Test Model");
        assert_eq!(found.model_path(), Some("/models/m10.safetensors"));
        assert!(store.find_by_pair(1, 11).unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent_and_preserves_created_at() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = make_record(1, 10);
        store.upsert(&record).unwrap();
        let original = store.find_by_pair(1, 10).unwrap().unwrap();

        let mut updated = make_record(1, 10);
        updated.name = "Renamed".to_string();
        updated.created_at = Utc::now() + chrono::Duration::hours(1);
        store.upsert(&updated).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Renamed");
        assert_eq!(all[0].created_at, original.created_at);
    }

    #[test]
    fn test_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&make_record(1, 10)).unwrap();

        assert!(store.delete(1, 10).unwrap());
        assert!(!store.delete(1, 10).unwrap());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_distinct_types() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut a = make_record(1, 10);
        a.model_type = "LORA".to_string();
        let mut b = make_record(2, 20);
        b.model_type = "Checkpoint".to_string();
        let mut c = make_record(3, 30);
        c.model_type = "LORA".to_string();

        for r in [&a, &b, &c] {
            store.upsert(r).unwrap();
        }

        assert_eq!(
            store.distinct_types().unwrap(),
            vec!["Checkpoint".to_string(), "LORA".to_string()]
        );
    }

    #[test]
    fn test_same_model_many_versions() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&make_record(1, 10)).unwrap();
        store.upsert(&make_record(1, 11)).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 2);
    }
}
