//! Shared HTTP plumbing for the Combiner Service clients.
//!
//! Every request goes through [`HttpTransport::execute`], which decorates
//! it with the standard headers, emits a `TraceEvent::RestCall`, and turns
//! the response into either a JSON value or an [`Error::Status`].

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use cb_domain::error::{Error, Result};
use cb_domain::trace::TraceEvent;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

pub(crate) const MODULE_ID_HEADER: &str = "x-module-id";
pub(crate) const TRACE_ID_HEADER: &str = "x-trace-id";

#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    http: Client,
    base_url: Url,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpTransport {
    /// `module_id` is sent as `X-Module-Id` when present.  Entries in
    /// `default_headers` replace the built-in headers on name collision.
    pub(crate) fn new(
        base_url: &str,
        module_id: Option<&str>,
        default_headers: &BTreeMap<String, String>,
        timeout_ms: u64,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base_url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base_url {base_url} cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(id) = module_id {
            headers.insert(MODULE_ID_HEADER, header_value(id)?);
        }
        for (name, value) in default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name {name:?}: {e}")))?;
            headers.insert(name, header_value(value)?);
        }

        let timeout = Duration::from_millis(timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            headers,
            timeout,
        })
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Absolute URL for `segments`, each percent-encoded.  Any path on the
    /// base URL is replaced.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(segments);
        }
        url
    }

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        rb.headers(self.headers.clone())
            .header(TRACE_ID_HEADER, trace_id)
    }

    /// Send the request once and decode the response.
    ///
    /// * non-2xx → [`Error::Status`] with the JSON error body, or the raw
    ///   text when the body isn't JSON
    /// * 2xx with a JSON content type → the parsed body
    /// * any other 2xx → the body text as a JSON string
    pub(crate) async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Value> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::RestCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        TraceEvent::RestCall {
            endpoint: endpoint.to_owned(),
            status: resp.status().as_u16(),
            duration_ms,
        }
        .emit();

        decode(resp).await
    }

    /// [`execute`](Self::execute) followed by a typed decode.
    pub(crate) async fn execute_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        rb: RequestBuilder,
    ) -> Result<T> {
        let value = self.execute(endpoint, rb).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::Other(format!("failed to parse {endpoint} response: {e}"))
        })
    }
}

async fn decode(resp: Response) -> Result<Value> {
    let status = resp.status();
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let text = resp.text().await.map_err(from_reqwest)?;

    if !status.is_success() {
        let payload = match serde_json::from_str::<Value>(&text) {
            Ok(json) => json,
            Err(_) => Value::String(text),
        };
        return Err(Error::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            payload,
        });
    }

    if !is_json {
        return Ok(Value::String(text));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|e| Error::Config(format!("invalid header value: {e}")))
}

/// Convert a `reqwest::Error` into the shared error type.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Some("mod-1"), &BTreeMap::new(), 1000).unwrap()
    }

    #[test]
    fn url_encodes_each_segment() {
        let t = transport("http://localhost:22003");
        let url = t.url(&["api", "db", "mod 1", "notes/2024", "a?b"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:22003/api/db/mod%201/notes%2F2024/a%3Fb"
        );
    }

    #[test]
    fn url_replaces_base_path() {
        let t = transport("https://combiner.local:8443/prefix/?x=1");
        assert_eq!(
            t.url(&["get-token"]).as_str(),
            "https://combiner.local:8443/get-token"
        );
    }

    #[test]
    fn default_headers_override_builtin_ones() {
        let mut extra = BTreeMap::new();
        extra.insert("X-Module-Id".to_owned(), "override".to_owned());
        extra.insert("Authorization".to_owned(), "Bearer t".to_owned());
        let t = HttpTransport::new("http://localhost:1", Some("mod-1"), &extra, 1000).unwrap();
        assert_eq!(t.headers.get(MODULE_ID_HEADER).unwrap(), "override");
        assert_eq!(t.headers.get("authorization").unwrap(), "Bearer t");
        assert_eq!(t.headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn module_header_omitted_without_module() {
        let t = HttpTransport::new("http://localhost:1", None, &BTreeMap::new(), 1000).unwrap();
        assert!(t.headers.get(MODULE_ID_HEADER).is_none());
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = HttpTransport::new("not a url", None, &BTreeMap::new(), 1000).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = HttpTransport::new("mailto:ops@example.com", None, &BTreeMap::new(), 1000)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
