//! JSON-RPC 2.0 handling for duplex connections.
//!
//! Each inbound frame is decoded, dispatched by method and encoded
//! independently of every other frame. A frame that cannot be decoded gets a
//! null-id parse error; it never affects the connection it arrived on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::executor::Envelope;
use crate::gateway::ToolGateway;

pub const JSONRPC_VERSION: &str = "2.0";

/// Error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const TOOL_NOT_FOUND: i64 = -32004;
    pub const TOOL_EXECUTION_FAILED: i64 = -32000;
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn parse_error() -> Self {
        Self::error(Value::Null, codes::PARSE_ERROR, "Parse error")
    }
}

/// Encode a response, falling back to a fixed `-32603` frame.
pub fn encode(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        tracing::error!("JSON-RPC response encoding failed: {}", e);
        internal_error_frame()
    })
}

/// Last-resort frame when a response cannot be encoded.
fn internal_error_frame() -> String {
    format!(
        r#"{{"jsonrpc":"{}","id":null,"error":{{"code":{},"message":"Internal error"}}}}"#,
        JSONRPC_VERSION,
        codes::INTERNAL_ERROR
    )
}

/// Decode a frame. Only a JSON object with well-typed fields is a request.
pub fn decode(frame: &str) -> Option<JsonRpcRequest> {
    let value: Value = serde_json::from_str(frame).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[derive(Debug, Default, Deserialize)]
struct ToolCallParams {
    #[serde(default, alias = "name")]
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// Reported by `initialize`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Method dispatch for one gateway.
#[derive(Debug)]
pub struct JsonRpcHandler {
    gateway: Arc<ToolGateway>,
    server_info: ServerInfo,
}

impl JsonRpcHandler {
    pub fn new(gateway: Arc<ToolGateway>, server_info: ServerInfo) -> Self {
        Self {
            gateway,
            server_info,
        }
    }

    /// Handle one raw inbound frame and return the encoded response frame.
    pub async fn handle_frame(&self, frame: &str) -> String {
        let response = match decode(frame) {
            Some(request) => self.dispatch(request).await,
            None => {
                tracing::debug!("discarding undecodable JSON-RPC frame ({} bytes)", frame.len());
                JsonRpcResponse::parse_error()
            }
        };
        encode(&response)
    }

    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;
        tracing::debug!(method = %method, id = %id, "jsonrpc_request");

        match method.as_str() {
            "initialize" => JsonRpcResponse::result(
                id,
                serde_json::json!({
                    "serverInfo": self.server_info,
                    "capabilities": { "tools": true },
                }),
            ),
            "tools/list" => JsonRpcResponse::result(
                id,
                serde_json::json!({ "tools": self.gateway.list_tools() }),
            ),
            "tools/call" => self.call_tool(id, params).await,
            _ => JsonRpcResponse::error(id, codes::METHOD_NOT_FOUND, "Method not found"),
        }
    }

    async fn call_tool(&self, id: Value, params: Value) -> JsonRpcResponse {
        let params: ToolCallParams = serde_json::from_value(params).unwrap_or_default();

        let Some(handle) = self.gateway.resolve(&params.tool) else {
            return JsonRpcResponse::error(id, codes::TOOL_NOT_FOUND, "Tool not found");
        };

        match self.gateway.execute(&handle, &params.arguments).await {
            Envelope::Success(result) => {
                JsonRpcResponse::result(id, serde_json::json!({ "content": result }))
            }
            Envelope::Failure(error) => {
                JsonRpcResponse::error(id, codes::TOOL_EXECUTION_FAILED, error.message)
            }
        }
    }
}
