//! Local key-value persistence for the settings engine.
//!
//! Wraps a single SQLite database holding JSON-serialized setting values,
//! namespaced under a fixed key prefix so unrelated toolkit data sharing the
//! same file cannot collide. Reads and writes fail soft: losing local
//! persistence must never crash the editor, so callers get `Option`/`bool`
//! results and the underlying error is logged.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};

/// Fixed namespace prefix applied to every key in the backing table.
const KEY_PREFIX: &str = "snipstudio.";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS local_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
";

/// Thread-safe local store wrapping a single SQLite connection.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

/// Store error type. Only `open` reports hard errors; the per-key
/// operations degrade to absent/false instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl LocalStore {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Read a value. Absent keys, malformed stored JSON, and storage errors
    /// all come back as `None`; the latter two are logged.
    pub fn read(&self, key: &str) -> Option<serde_json::Value> {
        let raw = match self.try_read(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Local store read failed for {key}: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding malformed stored value for {key}: {e}");
                None
            }
        }
    }

    /// Write a value. Returns `false` (and logs) if the store rejects the
    /// write; the caller decides whether in-memory state still advances.
    pub fn write(&self, key: &str, value: &serde_json::Value) -> bool {
        match self.try_write(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Local store write failed for {key}: {e}");
                false
            }
        }
    }

    /// Remove a key. Returns `false` (and logs) on storage failure.
    pub fn remove(&self, key: &str) -> bool {
        match self.try_remove(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Local store remove failed for {key}: {e}");
                false
            }
        }
    }

    /// Read every namespaced key, prefix stripped. Rows that fail to parse
    /// are skipped with a warning.
    pub fn read_all(&self) -> HashMap<String, serde_json::Value> {
        let rows = match self.try_read_all() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Local store bulk read failed: {e}");
                return HashMap::new();
            }
        };
        let mut map = HashMap::new();
        for (key, raw) in rows {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    map.insert(key, value);
                }
                Err(e) => {
                    tracing::warn!("Discarding malformed stored value for {key}: {e}");
                }
            }
        }
        map
    }

    fn try_read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM local_settings WHERE key = ?1")?;
        let raw = stmt
            .query_row([namespaced(key)], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(raw)
    }

    fn try_write(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        let raw = value.to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO local_settings (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = CURRENT_TIMESTAMP",
            params![namespaced(key), raw],
        )?;
        Ok(())
    }

    fn try_remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM local_settings WHERE key = ?1",
            [namespaced(key)],
        )?;
        Ok(())
    }

    fn try_read_all(&self) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM local_settings WHERE key LIKE ?1")?;
        let rows = stmt.query_map([format!("{KEY_PREFIX}%")], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (full_key, raw) = row?;
            let key = full_key
                .strip_prefix(KEY_PREFIX)
                .unwrap_or(&full_key)
                .to_string();
            out.push((key, raw));
        }
        Ok(out)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn namespaced(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_store() -> LocalStore {
        LocalStore::open_in_memory().expect("Failed to create test store")
    }

    #[test]
    fn test_read_missing_is_none() {
        let store = test_store();
        assert_eq!(store.read("editor.fontSize"), None);
    }

    #[test]
    fn test_write_read_remove() {
        let store = test_store();
        assert!(store.write("editor.fontSize", &json!(18)));
        assert_eq!(store.read("editor.fontSize"), Some(json!(18)));

        assert!(store.write("editor.fontSize", &json!(20)));
        assert_eq!(store.read("editor.fontSize"), Some(json!(20)));

        assert!(store.remove("editor.fontSize"));
        assert_eq!(store.read("editor.fontSize"), None);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let store = test_store();
        assert!(store.remove("editor.theme"));
    }

    #[test]
    fn test_read_all_strips_prefix() {
        let store = test_store();
        store.write("editor.theme", &json!("vs-dark"));
        store.write("editor.wordWrap", &json!(true));

        let all = store.read_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all["editor.theme"], json!("vs-dark"));
        assert_eq!(all["editor.wordWrap"], json!(true));
    }

    #[test]
    fn test_read_all_ignores_foreign_keys() {
        let store = test_store();
        store.write("editor.theme", &json!("vs"));
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO local_settings (key, value) VALUES ('other-tool.flag', 'true')",
                [],
            )
            .unwrap();
        }
        let all = store.read_all();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("editor.theme"));
    }

    #[test]
    fn test_malformed_json_reads_as_absent() {
        let store = test_store();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO local_settings (key, value) VALUES ('snipstudio.editor.theme', '{not json')",
                [],
            )
            .unwrap();
        }
        assert_eq!(store.read("editor.theme"), None);
        assert!(store.read_all().is_empty());
    }
}
