//! Client for the labeling (context manager) endpoints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cb_domain::config::CombinerConfig;
use cb_domain::error::Result;
use serde_json::Value;

use crate::mock::MockContextStore;
use crate::transport::HttpTransport;
use crate::types::{ApiResponse, Context, SearchContextsBody};

/// Searches and processes labeled contexts.
///
/// In test mode `search_contexts` never touches the network: it waits
/// `rest.mock_delay_ms` and answers from a [`MockContextStore`].  Test mode
/// can be flipped at runtime and is shared between clones.
#[derive(Debug, Clone)]
pub struct ContextManagerClient {
    transport: HttpTransport,
    test_mode: Arc<AtomicBool>,
    mock: Arc<MockContextStore>,
    mock_delay: Duration,
}

impl ContextManagerClient {
    pub fn new(cfg: &CombinerConfig) -> Result<Self> {
        let module_id = Some(cfg.module_id.as_str()).filter(|m| !m.is_empty());
        let transport = HttpTransport::new(
            &cfg.base_url,
            module_id,
            &cfg.rest.default_headers,
            cfg.rest.timeout_ms,
        )?;
        Ok(Self {
            transport,
            test_mode: Arc::new(AtomicBool::new(cfg.test_mode)),
            mock: Arc::new(MockContextStore::new()?),
            mock_delay: Duration::from_millis(cfg.rest.mock_delay_ms),
        })
    }

    /// Search contexts (POST /api/labeling/search).  A missing body is sent
    /// as `{}`.
    pub async fn search_contexts(
        &self,
        body: Option<SearchContextsBody>,
    ) -> Result<ApiResponse<Vec<Context>>> {
        let body = body.unwrap_or_default();

        if self.is_test_mode() {
            tokio::time::sleep(self.mock_delay).await;
            return Ok(ApiResponse::ok(self.mock.filter(&body)));
        }

        let url = self.transport.url(&["api", "labeling", "search"]);
        self.transport
            .execute_as(
                "POST /api/labeling/search",
                self.transport.http().post(url).json(&body),
            )
            .await
    }

    /// Hand contexts to the service for processing (POST
    /// /api/labeling/process).  Always goes to the network.
    pub async fn process_contexts(&self, body: &Value) -> Result<Value> {
        let url = self.transport.url(&["api", "labeling", "process"]);
        self.transport
            .execute(
                "POST /api/labeling/process",
                self.transport.http().post(url).json(body),
            )
            .await
    }

    pub fn set_test_mode(&self, enabled: bool) {
        self.test_mode.store(enabled, Ordering::Relaxed);
        tracing::debug!(enabled, "labeling test mode toggled");
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode.load(Ordering::Relaxed)
    }
}
