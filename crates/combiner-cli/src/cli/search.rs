use cb_domain::config::CombinerConfig;
use cb_rest::{ContextManagerClient, SearchContextsBody, SortField, SortOrder};

use super::SearchArgs;

fn body_from_args(args: &SearchArgs) -> SearchContextsBody {
    SearchContextsBody {
        query: args.query.clone(),
        category: Some(args.categories.clone()).filter(|c| !c.is_empty()),
        tags: Some(args.tags.clone()).filter(|t| !t.is_empty()),
        limit: args.limit,
        sort: args.sort_updated.then_some(SortField::UpdatedAt),
        order: args
            .sort_updated
            .then_some(if args.asc { SortOrder::Asc } else { SortOrder::Desc }),
    }
}

pub async fn search(config: &CombinerConfig, args: SearchArgs) -> anyhow::Result<()> {
    let client = ContextManagerClient::new(config)?;
    if args.test_mode {
        client.set_test_mode(true);
    }

    let resp = client.search_contexts(Some(body_from_args(&args))).await?;
    if !resp.success {
        anyhow::bail!(
            "search failed: {}",
            resp.error.as_deref().unwrap_or("no error message")
        );
    }

    let contexts = resp.data.unwrap_or_default();
    for ctx in &contexts {
        println!(
            "{:>4}  {}  [{}]  {}",
            ctx.id,
            ctx.updated_at.format("%Y-%m-%d"),
            ctx.category.as_deref().unwrap_or("-"),
            ctx.name.as_deref().unwrap_or("(untitled)"),
        );
    }
    println!("{} result(s)", contexts.len());
    Ok(())
}
