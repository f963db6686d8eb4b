//! `mcpcat build`: fetch sources, aggregate, and write the catalog.

use anyhow::{Context, Result};
use mcp_catalog_core::aggregate::{Aggregator, AggregatorOptions, BuildStats};
use mcp_catalog_core::popularity::{NoPopularity, PopularityProvider};
use mcp_catalog_core::Catalog;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::github::GithubClient;
use crate::sources::{collect_sources, configured_sources, SourceReport};
use crate::store;

/// Everything a build produced, written or not.
#[derive(Debug)]
pub struct BuildOutcome {
    pub catalog: Catalog,
    pub stats: BuildStats,
    pub reports: Vec<SourceReport>,
}

/// Collect records and aggregate them into a validated catalog.
///
/// `offline` skips every GitHub request: only local sources are read and
/// popularity is reported as 0.
pub async fn build_catalog(config: &Config, offline: bool) -> Result<BuildOutcome> {
    let curated = config.curated.to_list()?;

    let client = if offline {
        None
    } else {
        let client = GithubClient::new(&config.github)?;
        if !client.is_authenticated() {
            info!(
                token_env = %config.github.token_env,
                "no GitHub token set, requests are rate limited"
            );
        }
        Some(Arc::new(client))
    };

    let sources = configured_sources(config, client.clone());
    let collected = collect_sources(&sources).await;
    info!(
        structured = collected.structured.len(),
        search = collected.search.len(),
        "records collected"
    );

    let provider: Arc<dyn PopularityProvider> = match &client {
        Some(client) if config.popularity.is_enabled() => {
            Arc::clone(client) as Arc<dyn PopularityProvider>
        }
        _ => Arc::new(NoPopularity),
    };

    let registry = &config.sources.registry;
    let options = AggregatorOptions {
        registry_homepage: format!(
            "https://github.com/{}/tree/{}/{}",
            registry.repo, registry.branch, registry.path
        ),
        image_namespace: registry.image_namespace.clone(),
        concurrency: config.github.concurrency,
    };

    let (catalog, stats) = Aggregator::new(&curated, provider.as_ref())
        .with_options(options)
        .build(&collected.structured, &collected.search)
        .await
        .context("Catalog build aborted")?;

    Ok(BuildOutcome {
        catalog,
        stats,
        reports: collected.reports,
    })
}

pub async fn run_build(config: &Config, dry_run: bool, offline: bool) -> Result<()> {
    let outcome = build_catalog(config, offline).await?;
    let catalog = &outcome.catalog;

    if dry_run {
        println!("build (dry-run)");
    } else {
        println!("build");
    }
    for report in &outcome.reports {
        match &report.error {
            Some(error) => println!(
                "  {} ({}): unavailable: {} [{}]",
                report.name, report.kind, error, report.description
            ),
            None => println!(
                "  {} ({}): {} fetched, {} accepted, {} malformed [{}]",
                report.name,
                report.kind,
                report.fetched,
                report.accepted,
                report.malformed,
                report.description
            ),
        }
    }
    println!("  servers: {}", catalog.len());
    println!("  verified: {}", catalog.verified_count());
    println!("  remote: {}", catalog.remote_count());
    println!("  curated backfill: {}", outcome.stats.backfilled);

    if dry_run {
        return Ok(());
    }

    store::save_catalog(&config.catalog.path, catalog)?;
    println!("  wrote: {}", config.catalog.path.display());
    println!("ok");
    Ok(())
}
