//! Module-scoped client for the Combiner Service filesystem, document
//! store, and session-token endpoints.
//!
//! `CombinerRestClient` wraps a `reqwest::Client` and translates every
//! method into one HTTP call.  Failures are returned as-is; nothing is
//! retried.

use std::time::Duration;

use cb_domain::config::CombinerConfig;
use cb_domain::error::{Error, Result};
use serde_json::{Map, Value};

use crate::transport::HttpTransport;
use crate::types::{FsReadRequest, FsWriteRequest, TokenResponse, DEFAULT_ENCODING};

/// REST client bound to one module id.
///
/// Created once and reused; the underlying `reqwest::Client` maintains a
/// connection pool.
#[derive(Debug, Clone)]
pub struct CombinerRestClient {
    transport: HttpTransport,
    module_id: String,
}

impl CombinerRestClient {
    /// Build a client from the shared config.  `module_id` must be set.
    pub fn new(cfg: &CombinerConfig) -> Result<Self> {
        if cfg.module_id.trim().is_empty() {
            return Err(Error::Config("module_id is required".into()));
        }
        let transport = HttpTransport::new(
            &cfg.base_url,
            Some(&cfg.module_id),
            &cfg.rest.default_headers,
            cfg.rest.timeout_ms,
        )?;
        Ok(Self {
            transport,
            module_id: cfg.module_id.clone(),
        })
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.transport.timeout()
    }

    // ── session ──────────────────────────────────────────────────────

    /// Fetch the session token (GET /get-token).
    pub async fn session_token(&self) -> Result<String> {
        let url = self.transport.url(&["get-token"]);
        let resp: TokenResponse = self
            .transport
            .execute_as("GET /get-token", self.transport.http().get(url))
            .await?;
        Ok(resp.token)
    }

    // ── filesystem ───────────────────────────────────────────────────

    /// List a directory (GET /api/fs/list?path=).
    pub async fn list_dir(&self, path: &str) -> Result<Value> {
        let mut url = self.transport.url(&["api", "fs", "list"]);
        url.query_pairs_mut().append_pair("path", path);
        self.transport
            .execute("GET /api/fs/list", self.transport.http().get(url))
            .await
    }

    /// Read a file (POST /api/fs/read).  `encoding` defaults to `utf-8`.
    pub async fn read_file(&self, path: &str, encoding: Option<&str>) -> Result<Value> {
        let body = FsReadRequest {
            path: path.to_owned(),
            encoding: encoding.unwrap_or(DEFAULT_ENCODING).to_owned(),
        };
        let url = self.transport.url(&["api", "fs", "read"]);
        self.transport
            .execute("POST /api/fs/read", self.transport.http().post(url).json(&body))
            .await
    }

    /// Write a file (POST /api/fs/write).  `encoding` defaults to `utf-8`.
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        encoding: Option<&str>,
    ) -> Result<Value> {
        let body = FsWriteRequest {
            path: path.to_owned(),
            content: content.to_owned(),
            encoding: encoding.unwrap_or(DEFAULT_ENCODING).to_owned(),
        };
        let url = self.transport.url(&["api", "fs", "write"]);
        self.transport
            .execute("POST /api/fs/write", self.transport.http().post(url).json(&body))
            .await
    }

    // ── document store ───────────────────────────────────────────────

    fn collection_url(&self, collection: &str) -> reqwest::Url {
        self.transport
            .url(&["api", "db", &self.module_id, collection])
    }

    fn document_url(&self, collection: &str, id: &str) -> reqwest::Url {
        self.transport
            .url(&["api", "db", &self.module_id, collection, id])
    }

    /// Create a document (POST /api/db/{module}/{collection}).
    pub async fn db_create(&self, collection: &str, payload: &Value) -> Result<Value> {
        let url = self.collection_url(collection);
        self.transport
            .execute(
                "POST /api/db/{module}/{collection}",
                self.transport.http().post(url).json(payload),
            )
            .await
    }

    /// List documents (GET /api/db/{module}/{collection}).  The filter is
    /// sent as a JSON-encoded `filter` query parameter only when it has at
    /// least one key.
    pub async fn db_list(
        &self,
        collection: &str,
        filter: Option<&Map<String, Value>>,
    ) -> Result<Vec<Value>> {
        let mut url = self.collection_url(collection);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            let encoded = serde_json::to_string(filter)?;
            url.query_pairs_mut().append_pair("filter", &encoded);
        }
        self.transport
            .execute_as(
                "GET /api/db/{module}/{collection}",
                self.transport.http().get(url),
            )
            .await
    }

    /// Read one document (GET /api/db/{module}/{collection}/{id}).
    pub async fn db_read(&self, collection: &str, id: &str) -> Result<Value> {
        let url = self.document_url(collection, id);
        self.transport
            .execute(
                "GET /api/db/{module}/{collection}/{id}",
                self.transport.http().get(url),
            )
            .await
    }

    /// Replace a document (PUT /api/db/{module}/{collection}/{id}).
    pub async fn db_update(&self, collection: &str, id: &str, update: &Value) -> Result<Value> {
        let url = self.document_url(collection, id);
        self.transport
            .execute(
                "PUT /api/db/{module}/{collection}/{id}",
                self.transport.http().put(url).json(update),
            )
            .await
    }

    /// Delete a document (DELETE /api/db/{module}/{collection}/{id}).
    pub async fn db_delete(&self, collection: &str, id: &str) -> Result<Value> {
        let url = self.document_url(collection, id);
        self.transport
            .execute(
                "DELETE /api/db/{module}/{collection}/{id}",
                self.transport.http().delete(url),
            )
            .await
    }
}
