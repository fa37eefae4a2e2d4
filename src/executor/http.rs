//! Direct HTTP transport.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;

use super::{map_transport_error, parse_method, CallContext, Transport, JSON_CONTENT_TYPE};
use crate::tools::HttpSpec;
use crate::types::{Error, Result};

#[async_trait]
impl Transport for HttpSpec {
    async fn call(&self, client: &reqwest::Client, ctx: &CallContext<'_>) -> Result<Value> {
        let timeout = ctx.timeout(self.timeout_ms);
        let method = parse_method(&self.method)?;

        let mut url = ctx.render(&self.url);
        if let Some(query) = &self.query {
            url = append_query(
                url,
                query.iter().map(|(k, v)| (k.as_str(), ctx.render(v))),
            );
        }

        let mut headers = ctx.headers(&self.headers)?;
        let mut request = client.request(method, &url).timeout(timeout);
        if let Some(body) = &self.body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            request = request.body(ctx.render(body));
        }
        let request = request.headers(headers);

        tracing::trace!(url = %url, "http_tool_request");

        // The client-side wait budget sits above the request timeout so a
        // response completing right at the deadline is still read.
        let budget = timeout + ctx.read_grace;
        let bytes = tokio::time::timeout(budget, async {
            let response = request.send().await?.error_for_status()?;
            response.bytes().await
        })
        .await
        .map_err(|_| {
            Error::timeout(format!(
                "downstream call exceeded {}ms",
                timeout.as_millis()
            ))
        })?
        .map_err(|e| map_transport_error(e, timeout))?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Append rendered query parameters: `?` for the first unless the URL
/// already carries a query string, `&` afterwards. Values are appended as
/// rendered, without further encoding.
pub(crate) fn append_query<'a, I>(mut url: String, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    let mut first = !url.contains('?');
    for (key, value) in params {
        url.push(if first { '?' } else { '&' });
        url.push_str(key);
        url.push('=');
        url.push_str(&value);
        first = false;
    }
    url
}
