//! Tool definitions: the persisted, data-only description of a tool.
//!
//! Persisted schema (one JSON document per store row):
//! ```text
//! {
//!   "name": "weather",
//!   "description": "Current weather",
//!   "type": "http" | "rpcClient",
//!   "inputSchema": { ... },
//!   "http":      { "method", "url", "timeoutMs", "headers", "query", "body" },
//!   "rpcClient": { "baseUrl", "path", "method", "timeoutMs", "headers", "body" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::tools::template::value_text;
use crate::types::{Error, Result};

/// Default HTTP method when a definition omits one.
pub const DEFAULT_METHOD: &str = "GET";

// =============================================================================
// Transport kind
// =============================================================================

/// Strategy used to perform a tool's downstream call.
///
/// Unknown kinds are kept rather than rejected so the executor can answer
/// with `UNSUPPORTED_TYPE` instead of the tool silently vanishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportKind {
    Http,
    RpcClient,
    Other(String),
}

impl TransportKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransportKind::Http => "http",
            TransportKind::RpcClient => "rpcClient",
            TransportKind::Other(kind) => kind,
        }
    }
}

impl From<String> for TransportKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "http" => TransportKind::Http,
            "rpcClient" => TransportKind::RpcClient,
            _ => TransportKind::Other(kind),
        }
    }
}

impl From<TransportKind> for String {
    fn from(kind: TransportKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transport specs
// =============================================================================

/// Direct HTTP call configuration. All string fields are templates.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSpec {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Option<Vec<(String, String)>>,
    pub body: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Typed backend client configuration. `path`, `method`, header values and
/// body are templates; `base_url` is used as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcClientSpec {
    pub base_url: String,
    pub path: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Transport-specific configuration, one variant per supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSpec {
    Http(HttpSpec),
    RpcClient(RpcClientSpec),
    Unsupported(String),
}

impl TransportSpec {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportSpec::Http(_) => TransportKind::Http,
            TransportSpec::RpcClient(_) => TransportKind::RpcClient,
            TransportSpec::Unsupported(kind) => TransportKind::Other(kind.clone()),
        }
    }
}

// =============================================================================
// Tool definition
// =============================================================================

/// A parsed tool definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    /// Opaque, documentation-only JSON schema of the arguments.
    pub input_schema: Value,
    pub transport: TransportSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDefinition {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type")]
    kind: TransportKind,
    #[serde(default)]
    input_schema: Value,
    #[serde(default)]
    http: Option<RawHttp>,
    #[serde(default)]
    rpc_client: Option<RawRpcClient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHttp {
    #[serde(default)]
    method: Option<String>,
    url: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    query: Option<Map<String, Value>>,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRpcClient {
    base_url: String,
    path: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    body: Option<Value>,
}

impl ToolDefinition {
    /// Parse a persisted config document.
    ///
    /// `fallback_name` (the store row name) is used when the document does
    /// not carry its own `name`.
    pub fn parse(config_json: &str, fallback_name: &str) -> Result<Self> {
        let raw: RawDefinition = serde_json::from_str(config_json)?;
        Self::from_raw(raw, fallback_name)
    }

    /// Parse an already-decoded config document.
    pub fn from_value(config: Value, fallback_name: &str) -> Result<Self> {
        let raw: RawDefinition = serde_json::from_value(config)?;
        Self::from_raw(raw, fallback_name)
    }

    fn from_raw(raw: RawDefinition, fallback_name: &str) -> Result<Self> {
        let name = raw
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());
        if name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }

        let transport = match raw.kind {
            TransportKind::Http => {
                let http = raw.http.ok_or_else(|| {
                    Error::validation(format!("Tool '{}' of type http has no http section", name))
                })?;
                if http.url.is_empty() {
                    return Err(Error::validation(format!("Tool '{}' has an empty url", name)));
                }
                TransportSpec::Http(HttpSpec {
                    method: normalize_method(http.method),
                    url: http.url,
                    headers: text_pairs(http.headers),
                    query: http.query.map(text_pairs),
                    body: http.body.map(body_template),
                    timeout_ms: http.timeout_ms,
                })
            }
            TransportKind::RpcClient => {
                let rpc = raw.rpc_client.ok_or_else(|| {
                    Error::validation(format!(
                        "Tool '{}' of type rpcClient has no rpcClient section",
                        name
                    ))
                })?;
                if rpc.base_url.is_empty() {
                    return Err(Error::validation(format!(
                        "Tool '{}' has an empty baseUrl",
                        name
                    )));
                }
                TransportSpec::RpcClient(RpcClientSpec {
                    base_url: rpc.base_url,
                    path: rpc.path,
                    method: normalize_method(rpc.method),
                    headers: text_pairs(rpc.headers),
                    body: rpc.body.map(body_template),
                    timeout_ms: rpc.timeout_ms,
                })
            }
            TransportKind::Other(kind) => TransportSpec::Unsupported(kind),
        };

        Ok(Self {
            name,
            description: raw.description,
            input_schema: raw.input_schema,
            transport,
        })
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }
}

fn normalize_method(method: Option<String>) -> String {
    method
        .filter(|m| !m.is_empty())
        .map(|m| m.to_ascii_uppercase())
        .unwrap_or_else(|| DEFAULT_METHOD.to_string())
}

fn text_pairs(map: Map<String, Value>) -> Vec<(String, String)> {
    map.into_iter().map(|(k, v)| (k, value_text(&v))).collect()
}

// A string body is the template itself; structured bodies are templated in
// their serialized form.
fn body_template(body: Value) -> String {
    match body {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn http_config() -> Value {
        json!({
            "name": "weather",
            "description": "Current weather",
            "type": "http",
            "inputSchema": {"type": "object", "properties": {"city": {"type": "string"}}},
            "http": {
                "method": "post",
                "url": "https://api.example.com/weather/{{args.city}}",
                "timeoutMs": 1500,
                "headers": {"X-Api-Key": "{{secrets.WEATHER_KEY}}", "X-Retries": 0},
                "query": {"units": "metric", "lang": "{{args.lang}}"},
                "body": {"city": "{{args.city}}"}
            }
        })
    }

    #[test]
    fn test_parse_http_definition() {
        let def = ToolDefinition::from_value(http_config(), "row").unwrap();
        assert_eq!(def.name, "weather");
        assert_eq!(def.description.as_deref(), Some("Current weather"));
        assert_eq!(def.transport_kind(), TransportKind::Http);

        let TransportSpec::Http(http) = def.transport else {
            panic!("expected http transport");
        };
        assert_eq!(http.method, "POST");
        assert_eq!(http.timeout_ms, Some(1500));
        assert_eq!(
            http.headers,
            vec![
                ("X-Api-Key".to_string(), "{{secrets.WEATHER_KEY}}".to_string()),
                ("X-Retries".to_string(), "0".to_string()),
            ]
        );
        assert_eq!(
            http.query,
            Some(vec![
                ("units".to_string(), "metric".to_string()),
                ("lang".to_string(), "{{args.lang}}".to_string()),
            ])
        );
        assert_eq!(http.body.as_deref(), Some(r#"{"city":"{{args.city}}"}"#));
    }

    #[test]
    fn test_parse_rpc_client_defaults() {
        let config = json!({
            "name": "orders",
            "type": "rpcClient",
            "rpcClient": {"baseUrl": "http://orders:8080", "path": "/orders/{{args.id}}"}
        });
        let def = ToolDefinition::from_value(config, "orders").unwrap();
        let TransportSpec::RpcClient(rpc) = def.transport else {
            panic!("expected rpcClient transport");
        };
        assert_eq!(rpc.method, "GET");
        assert_eq!(rpc.timeout_ms, None);
        assert!(rpc.headers.is_empty());
        assert!(rpc.body.is_none());
        assert_eq!(def.input_schema, Value::Null);
    }

    #[test]
    fn test_parse_unknown_kind_is_kept() {
        let def =
            ToolDefinition::parse(r#"{"name": "legacy", "type": "soap"}"#, "legacy").unwrap();
        assert_eq!(def.transport, TransportSpec::Unsupported("soap".to_string()));
        assert_eq!(def.transport_kind().as_str(), "soap");
    }

    #[test]
    fn test_parse_uses_row_name_when_missing() {
        let def = ToolDefinition::parse(
            r#"{"type": "http", "http": {"url": "http://x"}}"#,
            "from-row",
        )
        .unwrap();
        assert_eq!(def.name, "from-row");
    }

    #[test]
    fn test_parse_string_body_is_raw_template() {
        let config = json!({
            "name": "raw",
            "type": "http",
            "http": {"url": "http://x", "body": "{\"q\": \"{{args.q}}\"}"}
        });
        let def = ToolDefinition::from_value(config, "raw").unwrap();
        let TransportSpec::Http(http) = def.transport else {
            panic!("expected http transport");
        };
        assert_eq!(http.body.as_deref(), Some(r#"{"q": "{{args.q}}"}"#));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ToolDefinition::parse("{not json", "x").is_err());
        assert!(ToolDefinition::parse(r#"{"name": "x"}"#, "x").is_err());
        assert!(matches!(
            ToolDefinition::parse(r#"{"name": "x", "type": "http"}"#, "x"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ToolDefinition::parse(r#"{"type": "http", "http": {"url": "http://x"}}"#, ""),
            Err(Error::Validation(_))
        ));
        assert!(ToolDefinition::parse(
            r#"{"name": "x", "type": "rpcClient", "rpcClient": {"baseUrl": ""}}"#,
            "x"
        )
        .is_err());
    }

    #[test]
    fn test_transport_kind_round_trips_through_string() {
        let kind: TransportKind = serde_json::from_str(r#""rpcClient""#).unwrap();
        assert_eq!(kind, TransportKind::RpcClient);
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""rpcClient""#);
    }
}
