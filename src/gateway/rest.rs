//! Plain request/response surface.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::AppState;
use crate::executor::{Envelope, ErrorCode};
use crate::tools::ToolSummary;

/// A missing `tool` resolves to no tool at all and yields `NOT_FOUND`.
#[derive(Debug, Deserialize)]
pub struct CallRequest {
    #[serde(default, alias = "name")]
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Same shape as the JSON-RPC `tools/list` result.
#[derive(Debug, Serialize)]
pub struct ToolList {
    pub tools: Vec<ToolSummary>,
}

pub(crate) async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ToolList> {
    Json(ToolList {
        tools: state.gateway.list_tools(),
    })
}

/// Always answers 200; success or failure is carried in the envelope,
/// including bodies that do not decode.
pub(crate) async fn call_tool(
    State(state): State<Arc<AppState>>,
    request: Result<Json<CallRequest>, JsonRejection>,
) -> Json<Envelope> {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(status = rejection.status().as_u16(), "rejected call body: {}", rejection.body_text());
            return Json(Envelope::error(
                ErrorCode::Internal,
                format!("invalid request body: {}", rejection.body_text()),
            ));
        }
    };
    Json(state.gateway.call_tool(&request.tool, &request.arguments).await)
}
