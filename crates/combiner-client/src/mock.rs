//! Offline stand-in for the labeling search endpoint.
//!
//! Holds the bundled fixture documents and applies the same filter, sort,
//! and limit rules the service does.

use cb_domain::error::Result;
use cb_domain::trace::TraceEvent;

use crate::types::{Context, SearchContextsBody, SortField, SortOrder};

const FIXTURES: &str = include_str!("../fixtures/contexts.json");

#[derive(Debug, Clone)]
pub struct MockContextStore {
    contexts: Vec<Context>,
}

impl MockContextStore {
    /// Store seeded with the bundled fixture set.
    pub fn new() -> Result<Self> {
        Ok(Self {
            contexts: serde_json::from_str(FIXTURES)?,
        })
    }

    pub fn with_contexts(contexts: Vec<Context>) -> Self {
        Self { contexts }
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Apply `body` to the store.
    ///
    /// Order: query, category, tags, sort, limit.  Without `sort` the
    /// fixture order is kept.
    ///
    /// An empty `category` or `tags` list is treated as no filter.  The
    /// live service instead matches nothing for an empty `category` list,
    /// so a mock search may return more than the service would.
    pub fn filter(&self, body: &SearchContextsBody) -> Vec<Context> {
        let mut out: Vec<Context> = self.contexts.clone();

        if let Some(query) = body.query.as_deref().filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            out.retain(|c| matches_query(c, &query));
        }

        if let Some(categories) = body.category.as_ref().filter(|c| !c.is_empty()) {
            out.retain(|c| {
                c.category.as_deref().is_some_and(|cat| {
                    categories
                        .iter()
                        .any(|wanted| wanted.to_lowercase() == cat.to_lowercase())
                })
            });
        }

        if let Some(tags) = body.tags.as_ref().filter(|t| !t.is_empty()) {
            out.retain(|c| {
                c.tags.iter().any(|tag| {
                    tags.iter()
                        .any(|wanted| wanted.to_lowercase() == tag.to_lowercase())
                })
            });
        }

        if let Some(SortField::UpdatedAt) = body.sort {
            match body.order.unwrap_or_default() {
                SortOrder::Asc => out.sort_by_key(|c| c.updated_at),
                SortOrder::Desc => out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            }
        }

        if let Some(limit) = body.limit.filter(|l| *l > 0) {
            out.truncate(limit as usize);
        }

        TraceEvent::MockSearch {
            query: body.query.clone(),
            results: out.len(),
        }
        .emit();

        out
    }
}

fn matches_query(ctx: &Context, query: &str) -> bool {
    ctx.name
        .as_deref()
        .is_some_and(|n| n.to_lowercase().contains(query))
        || ctx.content.to_lowercase().contains(query)
        || ctx.tags.iter().any(|t| t.to_lowercase().contains(query))
}
