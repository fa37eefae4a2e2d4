//! In-memory tool store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ToolRow, ToolStore};
use crate::types::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<String, ToolRow>,
    next_id: i64,
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    // Strictly increasing so `list_changed_since(watermark)` never misses a
    // write that lands in the same clock tick as the previous one.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// Process-local store. Default when no database path is configured.
#[derive(Debug, Default)]
pub struct InMemoryToolStore {
    inner: Mutex<Inner>,
}

impl InMemoryToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a row verbatim, including its timestamp. Used to seed stores
    /// and to reproduce rows written by other processes.
    pub fn put_row(
        &self,
        name: &str,
        enabled: bool,
        config_json: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let id = match inner.rows.get(name) {
            Some(existing) => existing.id,
            None => {
                inner.next_id += 1;
                inner.next_id
            }
        };
        if inner.last_stamp.map_or(true, |last| updated_at > last) {
            inner.last_stamp = Some(updated_at);
        }
        inner.rows.insert(
            name.to_string(),
            ToolRow {
                id,
                name: name.to_string(),
                enabled,
                config_json: config_json.to_string(),
                updated_at,
            },
        );
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::store("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl ToolStore for InMemoryToolStore {
    async fn list_enabled(&self) -> Result<Vec<ToolRow>> {
        let inner = self.lock()?;
        let mut rows: Vec<ToolRow> = inner.rows.values().filter(|r| r.enabled).cloned().collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn list_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<ToolRow>> {
        let inner = self.lock()?;
        let mut rows: Vec<ToolRow> = inner
            .rows
            .values()
            .filter(|r| r.updated_at > since)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn upsert(&self, name: &str, enabled: bool, config_json: &str) -> Result<()> {
        let mut inner = self.lock()?;
        let stamp = inner.next_stamp();
        if let Some(row) = inner.rows.get_mut(name) {
            row.enabled = enabled;
            row.config_json = config_json.to_string();
            row.updated_at = stamp;
            return Ok(());
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.insert(
            name.to_string(),
            ToolRow {
                id,
                name: name.to_string(),
                enabled,
                config_json: config_json.to_string(),
                updated_at: stamp,
            },
        );
        Ok(())
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut inner = self.lock()?;
        let stamp = inner.next_stamp();
        let row = inner
            .rows
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;
        row.enabled = enabled;
        row.updated_at = stamp;
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ToolRow>> {
        Ok(self.lock()?.rows.get(name).cloned())
    }
}
