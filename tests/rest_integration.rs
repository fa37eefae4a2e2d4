//! REST and admin integration tests against a live gateway and mock downstream.

mod common;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use toolgate::store::ToolStore;

async fn call(gw: &common::TestGateway, tool: &str, arguments: Value) -> Value {
    reqwest::Client::new()
        .post(gw.url("/mcp/tools/call"))
        .json(&json!({ "tool": tool, "arguments": arguments }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_list_tools() {
    let gw = common::start_gateway().await;
    let body: Value = reqwest::get(gw.url("/mcp/tools"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let tools = body["tools"].as_array().expect("listing is wrapped in `tools`");
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "broken",
            "cancel_order",
            "create_order",
            "delay",
            "echo",
            "legacy",
            "slow",
            "weather"
        ]
    );
    let weather = tools.iter().find(|t| t["name"] == "weather").unwrap();
    assert_eq!(weather["description"], "Current weather for a city");
    assert_eq!(weather["inputSchema"]["properties"]["city"]["type"], "string");
}

#[tokio::test]
async fn test_http_tool_renders_query() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "weather", json!({"city": "Oslo"})).await;
    assert_eq!(
        response,
        json!({"ok": true, "result": {"city": "Oslo", "units": "metric", "tempC": 21}})
    );
}

#[tokio::test]
async fn test_http_tool_renders_body_and_secret_header() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "echo", json!({"msg": "hi", "n": 3})).await;
    assert_eq!(response["ok"], true);
    assert_eq!(response["result"]["received"], json!({"msg": "hi", "n": 3}));
    assert_eq!(
        response["result"]["authorization"],
        format!("Bearer {}", common::SECRET_TOKEN)
    );
}

#[tokio::test]
async fn test_argument_cannot_reach_secrets() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "echo", json!({"msg": "{{secrets.TOKEN}}", "n": 1})).await;
    assert_eq!(response["result"]["received"]["msg"], "{{secrets.TOKEN}}");
}

#[tokio::test]
async fn test_downstream_timeout_is_internal() {
    let gw = common::start_gateway().await;
    let started = std::time::Instant::now();
    let response = call(&gw, "slow", json!({})).await;
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"]["code"], "INTERNAL");
    assert!(started.elapsed() < std::time::Duration::from_millis(1400));
}

#[tokio::test]
async fn test_downstream_error_status_is_internal() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "broken", json!({})).await;
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"]["code"], "INTERNAL");
}

#[tokio::test]
async fn test_rpc_client_tool() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "create_order", json!({"sku": "A-1"})).await;
    assert_eq!(
        response,
        json!({"ok": true, "result": {"id": 42, "order": {"sku": "A-1"}}})
    );
}

#[tokio::test]
async fn test_rpc_client_empty_body_is_empty_object() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "cancel_order", json!({"id": 42})).await;
    assert_eq!(response, json!({"ok": true, "result": {}}));
}

#[tokio::test]
async fn test_unknown_tool_is_not_found() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "ghost", json!({})).await;
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_call_without_tool_is_not_found() {
    let gw = common::start_gateway().await;
    let response = reqwest::Client::new()
        .post(gw.url("/mcp/tools/call"))
        .json(&json!({"arguments": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_call_body_is_envelope() {
    let gw = common::start_gateway().await;
    let response = reqwest::Client::new()
        .post(gw.url("/mcp/tools/call"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "INTERNAL");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid request body"));
}

#[tokio::test]
async fn test_rpc_client_keeps_configured_content_type() {
    let gw = common::start_gateway().await;
    let config = json!({
        "name": "inspect",
        "type": "rpcClient",
        "rpcClient": {
            "baseUrl": format!("http://{}", gw.downstream),
            "path": "/inspect",
            "method": "POST",
            "headers": {"Content-Type": "text/plain"},
            "body": "sku={{args.sku}}"
        }
    });
    reqwest::Client::new()
        .post(gw.url("/admin/tools"))
        .json(&json!({"name": "inspect", "configJson": config}))
        .send()
        .await
        .unwrap();

    let response = call(&gw, "inspect", json!({"sku": "B-2"})).await;
    assert_eq!(
        response,
        json!({"ok": true, "result": {"contentType": "text/plain", "body": "sku=B-2"}})
    );
}

#[tokio::test]
async fn test_unsupported_type() {
    let gw = common::start_gateway().await;
    let response = call(&gw, "legacy", json!({})).await;
    assert_eq!(response["error"]["code"], "UNSUPPORTED_TYPE");
    assert_eq!(response["error"]["message"], "unsupported type: soap");
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_upsert_is_visible_immediately() {
    let gw = common::start_gateway().await;
    let config = json!({
        "name": "forecast",
        "type": "http",
        "http": {"url": format!("http://{}/weather", gw.downstream), "query": {"city": "{{args.city}}"}}
    });

    let response: Value = reqwest::Client::new()
        .post(gw.url("/admin/tools"))
        .json(&json!({"name": "forecast", "enabled": true, "configJson": config}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response, json!({"ok": true, "refreshed": true}));

    let result = call(&gw, "forecast", json!({"city": "Rome"})).await;
    assert_eq!(result["result"]["city"], "Rome");
    assert!(gw.store.find_by_name("forecast").await.unwrap().is_some());
}

#[tokio::test]
async fn test_admin_rejects_invalid_config() {
    let gw = common::start_gateway().await;
    let response = reqwest::Client::new()
        .post(gw.url("/admin/tools"))
        .json(&json!({"name": "bad", "configJson": {"type": "http"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(gw.store.find_by_name("bad").await.unwrap().is_none());
}

#[tokio::test]
async fn test_admin_disable_removes_tool() {
    let gw = common::start_gateway().await;
    let response = reqwest::Client::new()
        .delete(gw.url("/admin/tools/weather"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let result = call(&gw, "weather", json!({"city": "Oslo"})).await;
    assert_eq!(result["error"]["code"], "NOT_FOUND");
    assert!(gw.registry.get("weather").is_none());
}

#[tokio::test]
async fn test_admin_disable_unknown_is_404() {
    let gw = common::start_gateway().await;
    let response = reqwest::Client::new()
        .delete(gw.url("/admin/tools/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_admin_sync_status() {
    let gw = common::start_gateway().await;
    let status: Value = reqwest::get(gw.url("/admin/sync"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["tools"], 8);
    assert!(status["lastError"].is_null());
}
