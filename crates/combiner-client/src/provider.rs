//! The `ContextSource` trait abstracts over where labeled contexts come
//! from (the live service or the bundled fixtures).

use async_trait::async_trait;
use cb_domain::error::{Error, Result};

use crate::labeling::ContextManagerClient;
use crate::mock::MockContextStore;
use crate::types::{Context, SearchContextsBody};

#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Contexts matching `body`.  An unsuccessful service envelope is an
    /// error.
    async fn search(&self, body: SearchContextsBody) -> Result<Vec<Context>>;
}

#[async_trait]
impl ContextSource for ContextManagerClient {
    async fn search(&self, body: SearchContextsBody) -> Result<Vec<Context>> {
        let resp = self.search_contexts(Some(body)).await?;
        if !resp.success {
            return Err(Error::Other(
                resp.error
                    .unwrap_or_else(|| "labeling search failed".to_owned()),
            ));
        }
        Ok(resp.data.unwrap_or_default())
    }
}

#[async_trait]
impl ContextSource for MockContextStore {
    async fn search(&self, body: SearchContextsBody) -> Result<Vec<Context>> {
        Ok(self.filter(&body))
    }
}
