//! Shared harness: a mock downstream service and a fully wired gateway.

#![allow(dead_code)]

use axum::extract::{Json, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use toolgate::executor::{SecretSource, ToolExecutor};
use toolgate::gateway::{self, AppState, JsonRpcHandler, ServerInfo, ToolGateway};
use toolgate::store::{InMemoryToolStore, ToolStore};
use toolgate::sync::{RegistrySync, SyncHandle};
use toolgate::tools::ToolRegistry;
use toolgate::types::{ExecutorConfig, SyncConfig};

pub const SECRET_TOKEN: &str = "s3cr3t";

// =============================================================================
// Mock downstream
// =============================================================================

async fn weather(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "city": params.get("city").cloned().unwrap_or_default(),
        "units": params.get("units").cloned().unwrap_or_default(),
        "tempC": 21
    }))
}

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "received": body, "authorization": auth }))
}

async fn inspect(headers: HeaderMap, body: String) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "contentType": content_type, "body": body }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(1500)).await;
    Json(json!({ "late": true }))
}

async fn delayed(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let ms = params
        .get("ms")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "sleptMs": ms }))
}

async fn create_order(Json(body): Json<Value>) -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({ "id": 42, "order": body })))
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })))
}

/// Start the mock downstream on an ephemeral port.
pub async fn start_downstream() -> SocketAddr {
    let app = Router::new()
        .route("/weather", get(weather))
        .route("/echo", post(echo))
        .route("/inspect", post(inspect))
        .route("/slow", get(slow))
        .route("/delay", get(delayed))
        .route("/orders", post(create_order))
        .route("/orders/{id}", delete(no_content))
        .route("/broken", get(broken));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Tool definitions pointing at the mock downstream.
pub fn tool_configs(downstream: SocketAddr) -> Vec<(&'static str, Value)> {
    let base = format!("http://{}", downstream);
    vec![
        (
            "weather",
            json!({
                "name": "weather",
                "description": "Current weather for a city",
                "type": "http",
                "inputSchema": {"type": "object", "properties": {"city": {"type": "string"}}},
                "http": {
                    "url": format!("{}/weather", base),
                    "query": {"city": "{{args.city}}", "units": "metric"}
                }
            }),
        ),
        (
            "echo",
            json!({
                "name": "echo",
                "type": "http",
                "http": {
                    "method": "post",
                    "url": format!("{}/echo", base),
                    "headers": {"Authorization": "Bearer {{secrets.TOKEN}}"},
                    "body": "{\"msg\": \"{{args.msg}}\", \"n\": {{args.n}}}"
                }
            }),
        ),
        (
            "slow",
            json!({
                "name": "slow",
                "type": "http",
                "http": {"url": format!("{}/slow", base), "timeoutMs": 200}
            }),
        ),
        (
            "delay",
            json!({
                "name": "delay",
                "type": "http",
                "http": {"url": format!("{}/delay", base), "query": {"ms": "{{args.ms}}"}}
            }),
        ),
        (
            "broken",
            json!({
                "name": "broken",
                "type": "http",
                "http": {"url": format!("{}/broken", base)}
            }),
        ),
        (
            "create_order",
            json!({
                "name": "create_order",
                "type": "rpcClient",
                "rpcClient": {
                    "baseUrl": base,
                    "path": "/orders",
                    "method": "POST",
                    "body": {"sku": "{{args.sku}}"}
                }
            }),
        ),
        (
            "cancel_order",
            json!({
                "name": "cancel_order",
                "type": "rpcClient",
                "rpcClient": {
                    "baseUrl": base,
                    "path": "/orders/{{args.id}}",
                    "method": "DELETE"
                }
            }),
        ),
        ("legacy", json!({"name": "legacy", "type": "soap"})),
    ]
}

// =============================================================================
// Gateway under test
// =============================================================================

pub struct TestGateway {
    pub http_addr: SocketAddr,
    pub downstream: SocketAddr,
    pub store: Arc<InMemoryToolStore>,
    pub registry: Arc<ToolRegistry>,
    pub sync: SyncHandle,
    pub rpc: Arc<JsonRpcHandler>,
    pub cancel: CancellationToken,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.http_addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/mcp/ws", self.http_addr)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Seed the store with every tool config, load the registry and serve HTTP.
pub async fn start_gateway() -> TestGateway {
    let downstream = start_downstream().await;

    let store = Arc::new(InMemoryToolStore::new());
    for (name, config) in tool_configs(downstream) {
        store.upsert(name, true, &config.to_string()).await.unwrap();
    }

    let cancel = CancellationToken::new();
    let registry = Arc::new(ToolRegistry::new());
    let sync_config = SyncConfig {
        refresh_interval: Duration::from_secs(3600),
        ..SyncConfig::default()
    };
    let (sync, _task) = RegistrySync::new(store.clone(), registry.clone())
        .spawn(&sync_config, cancel.clone());
    sync.force_refresh().await.unwrap();

    let executor = ToolExecutor::new(ExecutorConfig::default())
        .unwrap()
        .with_secrets(SecretSource::from_map(HashMap::from([(
            "TOKEN".to_string(),
            SECRET_TOKEN.to_string(),
        )])));
    let tool_gateway = Arc::new(ToolGateway::new(registry.clone(), executor));
    let rpc = Arc::new(JsonRpcHandler::new(
        tool_gateway.clone(),
        ServerInfo {
            name: "toolgate".to_string(),
            version: "test".to_string(),
        },
    ));

    let state = Arc::new(AppState {
        gateway: tool_gateway,
        rpc: rpc.clone(),
        store: store.clone(),
        sync: sync.clone(),
        outbound_capacity: 64,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_addr = listener.local_addr().unwrap();
    tokio::spawn(gateway::serve_http(listener, state, cancel.clone()));

    TestGateway {
        http_addr,
        downstream,
        store,
        registry,
        sync,
        rpc,
        cancel,
    }
}
