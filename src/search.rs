use anyhow::Result;
use mcp_catalog_core::search::{search, SearchPage, SearchRequest};

use crate::config::Config;
use crate::store;

/// Search the stored catalog (used by the CLI and tests).
pub fn search_catalog(
    config: &Config,
    query: &str,
    verified: Option<bool>,
    page_size: usize,
) -> Result<SearchPage> {
    let catalog = store::load_catalog(&config.catalog.path)?;
    let request = SearchRequest {
        query,
        verified,
        page_size,
    };
    Ok(search(&catalog, &request)?)
}

pub fn run_search(
    config: &Config,
    query: &str,
    verified: Option<bool>,
    page_size: usize,
    json: bool,
) -> Result<()> {
    let page = search_catalog(config, query, verified, page_size)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, server) in page.results.iter().enumerate() {
        let badge = if server.verified { " [verified]" } else { "" };
        let remote = if server.remote { " (remote)" } else { "" };
        println!(
            "{}. {} / {}{}{}",
            i + 1,
            server.id,
            server.display_name,
            badge,
            remote
        );
        println!("    stars: {}", server.popularity);
        println!("    homepage: {}", server.homepage);
        println!("    {}", server.description.replace('\n', " ").trim());
        println!();
    }
    println!("showing {} of {}", page.results.len(), page.total);
    Ok(())
}
