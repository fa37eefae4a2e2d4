//! Tool persistence: the source of truth registry sync reads from.
//!
//! Rows hold the raw config document; parsing happens during a refresh so a
//! malformed row never blocks writes.

mod memory;
mod sqlite;

pub use memory::InMemoryToolStore;
pub use sqlite::SqliteToolStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::{Result, StoreConfig};

/// One persisted tool row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRow {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    pub config_json: String,
    pub updated_at: DateTime<Utc>,
}

/// Persistence operations used by registry sync and the admin surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolStore: Send + Sync {
    /// All rows with `enabled = true`.
    async fn list_enabled(&self) -> Result<Vec<ToolRow>>;

    /// All rows (enabled or not) updated strictly after `since`.
    async fn list_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<ToolRow>>;

    /// Insert or update by name. Bumps `updated_at`.
    async fn upsert(&self, name: &str, enabled: bool, config_json: &str) -> Result<()>;

    /// Toggle a row. Unknown names are `NotFound`.
    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()>;

    async fn find_by_name(&self, name: &str) -> Result<Option<ToolRow>>;
}

/// Open the store selected by config.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn ToolStore>> {
    match &config.sqlite_path {
        Some(path) => {
            tracing::info!("Opening SQLite tool store at {}", path.display());
            Ok(Arc::new(SqliteToolStore::open(path)?))
        }
        None => {
            tracing::info!("Using in-memory tool store");
            Ok(Arc::new(InMemoryToolStore::new()))
        }
    }
}
