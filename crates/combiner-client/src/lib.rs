//! `cb-rest`: REST clients for the Combiner Service.
//!
//! Provides [`CombinerRestClient`] (filesystem, document store, session
//! token; scoped to one module id), [`ContextManagerClient`] (labeling
//! search and processing), typed DTOs, and a [`MockContextStore`] that
//! answers searches from a bundled fixture set when test mode is on.
//!
//! Both labeling backends implement [`ContextSource`]; use
//! [`create_context_source`] to pick one from config:
//!
//! | `test_mode` | Implementation           |
//! |-------------|--------------------------|
//! | `false`     | `ContextManagerClient`   |
//! | `true`      | `MockContextStore`       |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use cb_domain::config::CombinerConfig;
//! use cb_rest::CombinerRestClient;
//!
//! # async fn example() -> cb_domain::error::Result<()> {
//! let cfg = CombinerConfig::for_module("notes");
//! let client = CombinerRestClient::new(&cfg)?;
//!
//! client.db_create("drafts", &serde_json::json!({"title": "hello"})).await?;
//! let drafts = client.db_list("drafts", None).await?;
//! println!("{} drafts", drafts.len());
//! # Ok(())
//! # }
//! ```

pub mod labeling;
pub mod mock;
pub mod provider;
pub mod rest;
mod transport;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use labeling::ContextManagerClient;
pub use mock::MockContextStore;
pub use provider::ContextSource;
pub use rest::CombinerRestClient;
pub use transport::from_reqwest;
pub use types::{
    ApiResponse, Context, FsReadRequest, FsWriteRequest, SearchContextsBody, SortField, SortOrder,
    TokenResponse, DEFAULT_ENCODING,
};

use std::sync::Arc;

use cb_domain::config::CombinerConfig;
use cb_domain::error::Result;

/// Create the [`ContextSource`] selected by `cfg.test_mode`.
pub fn create_context_source(cfg: &CombinerConfig) -> Result<Arc<dyn ContextSource>> {
    if cfg.test_mode {
        tracing::info!("test mode: labeling searches served from bundled fixtures");
        return Ok(Arc::new(MockContextStore::new()?));
    }
    let client = ContextManagerClient::new(cfg)?;
    tracing::info!(base_url = %cfg.base_url, "using labeling service");
    Ok(Arc::new(client))
}
