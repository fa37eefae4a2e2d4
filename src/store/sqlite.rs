//! SQLite-backed tool store.
//!
//! `rusqlite::Connection` is blocking and not `Sync`, so it sits behind a
//! mutex and every query runs on the blocking pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{ToolRow, ToolStore};
use crate::types::{Error, Result};

const SELECT_COLUMNS: &str = "SELECT id, name, enabled, config_json, updated_at FROM tool";

/// Tool store persisted in a single SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteToolStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteToolStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tool (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                enabled INTEGER NOT NULL,
                config_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tool_updated ON tool(updated_at);
            CREATE INDEX IF NOT EXISTS idx_tool_enabled ON tool(enabled);
            "#,
        )?;
        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::store("sqlite connection lock poisoned"))?;
            f(&guard)
        })
        .await
        .map_err(|e| Error::internal(format!("store task failed: {}", e)))?
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ToolRow> {
    let millis: i64 = row.get(4)?;
    let updated_at = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(4, millis))?;
    Ok(ToolRow {
        id: row.get(0)?,
        name: row.get(1)?,
        enabled: row.get(2)?,
        config_json: row.get(3)?,
        updated_at,
    })
}

// Millisecond stamp strictly after every stamp already stored.
fn next_stamp(conn: &Connection) -> Result<i64> {
    let latest: Option<i64> = conn.query_row("SELECT MAX(updated_at) FROM tool", [], |row| row.get(0))?;
    let now = Utc::now().timestamp_millis();
    Ok(match latest {
        Some(latest) if now <= latest => latest + 1,
        _ => now,
    })
}

#[async_trait]
impl ToolStore for SqliteToolStore {
    async fn list_enabled(&self) -> Result<Vec<ToolRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE enabled = 1 ORDER BY id"))?;
            let rows = stmt
                .query_map([], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn list_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<ToolRow>> {
        let since = since.timestamp_millis();
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare(&format!("{SELECT_COLUMNS} WHERE updated_at > ?1 ORDER BY id"))?;
            let rows = stmt
                .query_map(params![since], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn upsert(&self, name: &str, enabled: bool, config_json: &str) -> Result<()> {
        let name = name.to_string();
        let config_json = config_json.to_string();
        self.with_conn(move |conn| {
            let stamp = next_stamp(conn)?;
            conn.execute(
                "INSERT INTO tool (name, enabled, config_json, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                    enabled = excluded.enabled,
                    config_json = excluded.config_json,
                    updated_at = excluded.updated_at",
                params![name, enabled, config_json, stamp],
            )?;
            Ok(())
        })
        .await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let stamp = next_stamp(conn)?;
            let updated = conn.execute(
                "UPDATE tool SET enabled = ?1, updated_at = ?2 WHERE name = ?3",
                params![enabled, stamp, name],
            )?;
            if updated == 0 {
                return Err(Error::not_found(format!("Unknown tool: {}", name)));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ToolRow>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE name = ?1"),
                    params![name],
                    map_row,
                )
                .optional()?;
            Ok(row)
        })
        .await
    }
}
