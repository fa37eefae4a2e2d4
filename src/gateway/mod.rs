//! Protocol gateway: the front ends callers talk to.
//!
//! - `rest`: plain request/response tool listing and invocation
//! - `admin`: tool create/update/disable, each followed by a forced refresh
//! - `jsonrpc`: per-frame JSON-RPC 2.0 state machine
//! - `ws`: JSON-RPC over WebSocket connections
//!
//! Every front end resolves names through the registry and invokes through
//! the same [`ToolGateway`].

pub mod admin;
pub mod jsonrpc;
pub mod rest;
pub mod ws;

pub use jsonrpc::{JsonRpcError, JsonRpcHandler, JsonRpcRequest, JsonRpcResponse, ServerInfo};

use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::executor::{Envelope, ToolExecutor};
use crate::store::ToolStore;
use crate::sync::SyncHandle;
use crate::tools::{ToolHandle, ToolRegistry, ToolSummary};

/// Registry lookup plus execution; shared by all front ends.
#[derive(Debug)]
pub struct ToolGateway {
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
}

impl ToolGateway {
    pub fn new(registry: Arc<ToolRegistry>, executor: ToolExecutor) -> Self {
        Self { registry, executor }
    }

    pub fn list_tools(&self) -> Vec<ToolSummary> {
        self.registry.list()
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<ToolHandle>> {
        self.registry.get(name)
    }

    /// Invoke by handle. The handle pins the snapshot it came from, so a
    /// concurrent registry swap does not affect this call.
    pub async fn execute(&self, handle: &ToolHandle, args: &Value) -> Envelope {
        self.executor.execute(handle, args).await
    }

    /// Invoke by name; unknown names yield a `NOT_FOUND` envelope.
    pub async fn call_tool(&self, name: &str, args: &Value) -> Envelope {
        match self.resolve(name) {
            Some(handle) => self.execute(&handle, args).await,
            None => {
                tracing::debug!(tool = name, "tool_not_found");
                Envelope::not_found(name)
            }
        }
    }
}

/// Shared state for the HTTP front ends.
pub struct AppState {
    pub gateway: Arc<ToolGateway>,
    pub rpc: Arc<JsonRpcHandler>,
    pub store: Arc<dyn ToolStore>,
    pub sync: SyncHandle,
    /// Per-connection outbound queue bound for WebSocket sessions.
    pub outbound_capacity: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &self.gateway)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

/// All HTTP routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/mcp/tools", get(rest::list_tools))
        .route("/mcp/tools/call", post(rest::call_tool))
        .route("/mcp/ws", get(ws::ws_handler))
        .route("/admin/tools", post(admin::upsert_tool))
        .route("/admin/tools/{name}", delete(admin::disable_tool))
        .route("/admin/sync", get(admin::sync_status))
        .with_state(state)
}

/// Serve HTTP on an already bound listener until `cancel` fires.
pub async fn serve_http(
    listener: TcpListener,
    state: Arc<AppState>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
