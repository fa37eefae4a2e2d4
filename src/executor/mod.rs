//! Tool executor: renders a tool's templates and performs the downstream call.
//!
//! Each supported transport kind is a `TransportSpec` variant whose spec type
//! implements [`Transport`]. Adding a kind means adding a variant and an impl;
//! the dispatch below stays a single exhaustive match.
//!
//! `execute` never fails: every error is folded into an [`Envelope`].

mod backend;
mod envelope;
mod http;

pub use backend::{BackendClient, BackendRequest, BackendResponse};
pub use envelope::{Envelope, EnvelopeError, ErrorCode};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::tools::{render, ToolHandle, TransportSpec};
use crate::types::{Error, ExecutorConfig, Result};

const JSON_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// Secrets
// =============================================================================

/// Where `{{secrets.*}}` tokens resolve from.
///
/// The whole environment is exposed to every tool; there is no per-tool
/// scoping of secrets.
#[derive(Debug, Clone, Default)]
pub enum SecretSource {
    /// Process environment, read at call time.
    #[default]
    Environment,
    /// Fixed map.
    Static(Arc<HashMap<String, String>>),
}

impl SecretSource {
    pub fn from_map(map: HashMap<String, String>) -> Self {
        SecretSource::Static(Arc::new(map))
    }

    pub fn load(&self) -> Arc<HashMap<String, String>> {
        match self {
            SecretSource::Environment => Arc::new(
                std::env::vars_os()
                    .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                    .collect(),
            ),
            SecretSource::Static(map) => map.clone(),
        }
    }
}

// =============================================================================
// Transport strategy
// =============================================================================

/// Per-call inputs shared by every transport.
#[derive(Debug)]
pub(crate) struct CallContext<'a> {
    pub args: &'a Value,
    pub secrets: &'a HashMap<String, String>,
    pub default_timeout: Duration,
    pub read_grace: Duration,
}

impl CallContext<'_> {
    pub fn render(&self, template: &str) -> String {
        render(template, self.args, self.secrets)
    }

    pub fn timeout(&self, timeout_ms: Option<u64>) -> Duration {
        timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout)
    }

    /// Render header templates into a header map.
    pub fn headers(&self, templates: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(templates.len());
        for (name, template) in templates {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::validation(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(&self.render(template))
                .map_err(|e| Error::validation(format!("Invalid value for header '{}': {}", name, e)))?;
            headers.append(name, value);
        }
        Ok(headers)
    }
}

/// A downstream call strategy.
#[async_trait]
pub(crate) trait Transport {
    async fn call(&self, client: &reqwest::Client, ctx: &CallContext<'_>) -> Result<Value>;
}

pub(crate) fn parse_method(method: &str) -> Result<reqwest::Method> {
    reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::validation(format!("Invalid HTTP method: {}", method)))
}

pub(crate) fn map_transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::timeout(format!("downstream call exceeded {}ms", timeout.as_millis()))
    } else {
        Error::Http(err)
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Executes tool handles against their downstream services.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    client: reqwest::Client,
    secrets: SecretSource,
    config: ExecutorConfig,
}

impl ToolExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            secrets: SecretSource::default(),
            config,
        })
    }

    pub fn with_secrets(mut self, secrets: SecretSource) -> Self {
        self.secrets = secrets;
        self
    }

    /// Render and perform the call. Never fails; errors become envelopes.
    pub async fn execute(&self, handle: &ToolHandle, args: &Value) -> Envelope {
        let started = Instant::now();
        let result = self.dispatch(handle, args).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                tracing::debug!(
                    tool = handle.name(),
                    transport = %handle.transport_kind(),
                    elapsed_ms,
                    "tool_call_succeeded"
                );
                Envelope::ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    tool = handle.name(),
                    transport = %handle.transport_kind(),
                    elapsed_ms,
                    "tool_call_failed: {}",
                    e
                );
                Envelope::error(e.envelope_code(), e.to_string())
            }
        }
    }

    async fn dispatch(&self, handle: &ToolHandle, args: &Value) -> Result<Value> {
        let secrets = self.secrets.load();
        let ctx = CallContext {
            args,
            secrets: &secrets,
            default_timeout: Duration::from_millis(self.config.default_timeout_ms),
            read_grace: Duration::from_millis(self.config.read_grace_ms),
        };

        match handle.transport() {
            TransportSpec::Http(spec) => spec.call(&self.client, &ctx).await,
            TransportSpec::RpcClient(spec) => spec.call(&self.client, &ctx).await,
            TransportSpec::Unsupported(kind) => Err(Error::unsupported_type(kind.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolDefinition;
    use serde_json::json;

    fn executor() -> ToolExecutor {
        ToolExecutor::new(ExecutorConfig::default())
            .unwrap()
            .with_secrets(SecretSource::from_map(HashMap::from([(
                "TOKEN".to_string(),
                "abc".to_string(),
            )])))
    }

    fn handle(config: Value) -> ToolHandle {
        ToolHandle::new(ToolDefinition::from_value(config, "t").unwrap())
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let envelope = executor()
            .execute(&handle(json!({"name": "legacy", "type": "soap"})), &json!({}))
            .await;
        assert_eq!(envelope.error_code(), Some(ErrorCode::UnsupportedType));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["error"]["message"], "unsupported type: soap");
    }

    #[tokio::test]
    async fn test_invalid_method_is_internal() {
        let tool = handle(json!({
            "name": "bad",
            "type": "http",
            "http": {"method": "NOT A METHOD", "url": "http://127.0.0.1:9/"}
        }));
        let envelope = executor().execute(&tool, &json!({})).await;
        assert_eq!(envelope.error_code(), Some(ErrorCode::Internal));
    }

    #[tokio::test]
    async fn test_connection_refused_is_internal() {
        // Port 9 (discard) is closed on test hosts.
        let tool = handle(json!({
            "name": "down",
            "type": "http",
            "http": {"url": "http://127.0.0.1:9/", "timeoutMs": 500}
        }));
        let envelope = executor().execute(&tool, &json!({})).await;
        assert_eq!(envelope.error_code(), Some(ErrorCode::Internal));
    }

    #[test]
    fn test_context_headers_render_secrets() {
        let secrets = HashMap::from([("TOKEN".to_string(), "abc".to_string())]);
        let args = json!({"id": 7});
        let ctx = CallContext {
            args: &args,
            secrets: &secrets,
            default_timeout: Duration::from_millis(3000),
            read_grace: Duration::from_millis(500),
        };
        let headers = ctx
            .headers(&[
                ("Authorization".to_string(), "Bearer {{secrets.TOKEN}}".to_string()),
                ("X-Id".to_string(), "{{args.id}}".to_string()),
            ])
            .unwrap();
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers["x-id"], "7");

        assert!(ctx
            .headers(&[("Bad Name".to_string(), "v".to_string())])
            .is_err());
        assert_eq!(ctx.timeout(None), Duration::from_millis(3000));
        assert_eq!(ctx.timeout(Some(10)), Duration::from_millis(10));
    }

    #[test]
    fn test_secret_source_environment_reads_process_env() {
        let secrets = SecretSource::Environment.load();
        assert!(secrets.contains_key("PATH") || std::env::var_os("PATH").is_none());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("post").unwrap(), reqwest::Method::POST);
        assert!(parse_method("").is_err());
    }
}
