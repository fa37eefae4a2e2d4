//! Admin surface: tool create/update/disable and sync status.
//!
//! Every mutation is written to the store first, then followed by a forced
//! registry refresh. A failed refresh does not undo the mutation; the next
//! scheduled tick picks it up.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;
use crate::sync::SyncStatus;
use crate::tools::ToolDefinition;
use crate::types::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub config_json: Value,
}

fn default_enabled() -> bool {
    true
}

pub(crate) async fn upsert_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertRequest>,
) -> Result<Json<Value>> {
    if request.name.trim().is_empty() {
        return Err(Error::validation("name must not be empty"));
    }

    // Accept either an embedded object or the raw JSON text.
    let config_json = match request.config_json {
        Value::String(text) => text,
        other => other.to_string(),
    };
    ToolDefinition::parse(&config_json, &request.name)?;

    state
        .store
        .upsert(&request.name, request.enabled, &config_json)
        .await?;
    tracing::info!(tool = %request.name, enabled = request.enabled, "tool_upserted");

    Ok(Json(json!({ "ok": true, "refreshed": refresh(&state).await })))
}

pub(crate) async fn disable_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    state.store.set_enabled(&name, false).await?;
    tracing::info!(tool = %name, "tool_disabled");

    Ok(Json(json!({ "ok": true, "refreshed": refresh(&state).await })))
}

pub(crate) async fn sync_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.sync.status())
}

async fn refresh(state: &AppState) -> bool {
    match state.sync.force_refresh().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("forced refresh after admin mutation failed: {}", e);
            false
        }
    }
}
