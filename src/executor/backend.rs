//! Typed backend client transport (`rpcClient` tools).
//!
//! Requests are described as plain values and issued by a small client bound
//! to one base URL. The client owns its timeout. Response status is not
//! interpreted: whatever body the backend returns is decoded, and an empty
//! body decodes to `{}`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use super::{map_transport_error, parse_method, CallContext, Transport, JSON_CONTENT_TYPE};
use crate::tools::RpcClientSpec;
use crate::types::Result;

/// One backend request.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Raw backend response body. Status is logged, never interpreted.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub body: Vec<u8>,
}

impl BackendResponse {
    /// Decode the body as JSON; an empty body is `{}`.
    pub fn json(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Client for a single backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Issue a request. The path is appended to the base URL verbatim.
    pub async fn execute(&self, request: BackendRequest) -> Result<BackendResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method, &url)
            .headers(request.headers)
            .timeout(self.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?
            .to_vec();

        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "backend returned non-success status");
        }
        Ok(BackendResponse { body })
    }
}

#[async_trait]
impl Transport for RpcClientSpec {
    async fn call(&self, client: &reqwest::Client, ctx: &CallContext<'_>) -> Result<Value> {
        let backend = BackendClient::new(client.clone(), self.base_url.clone(), ctx.timeout(self.timeout_ms));

        let mut headers = ctx.headers(&self.headers)?;
        let body = self.body.as_ref().map(|b| ctx.render(b));
        if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        let request = BackendRequest {
            method: parse_method(&ctx.render(&self.method))?,
            path: ctx.render(&self.path),
            headers,
            body,
        };

        backend.execute(request).await?.json()
    }
}
