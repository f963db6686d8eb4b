//! Popularity signals.
//!
//! A popularity signal is an external count (GitHub stars) used for ranking
//! and for resolving merge conflicts. Fetching one is allowed to fail: the
//! signal then degrades to `0` and a warning is logged.
//!
//! Concrete network providers live in the application crate.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::warn;

use crate::identity::OwnerRepo;

/// Source of popularity counts for repositories.
#[async_trait]
pub trait PopularityProvider: Send + Sync {
    /// Short name used in log output (e.g. `"github"`).
    fn name(&self) -> &str;

    async fn fetch_popularity(&self, repo: &OwnerRepo) -> anyhow::Result<u64>;
}

/// Provider that never reaches out and reports `0` for everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPopularity;

#[async_trait]
impl PopularityProvider for NoPopularity {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn fetch_popularity(&self, _repo: &OwnerRepo) -> anyhow::Result<u64> {
        Ok(0)
    }
}

/// Fixed table of counts. Unknown repositories are an error, which the
/// aggregator degrades to `0`.
#[derive(Debug, Clone, Default)]
pub struct StaticPopularity {
    counts: HashMap<String, u64>,
}

impl StaticPopularity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, full_name: &str, count: u64) -> Self {
        self.counts.insert(full_name.to_lowercase(), count);
        self
    }
}

#[async_trait]
impl PopularityProvider for StaticPopularity {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_popularity(&self, repo: &OwnerRepo) -> anyhow::Result<u64> {
        self.counts
            .get(&repo.key())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no popularity recorded for {}", repo))
    }
}

/// Fetch counts for many repositories, at most `concurrency` at a time.
///
/// Every requested repository appears in the result; failures map to `0`.
pub async fn fetch_all<P, I>(provider: &P, repos: I, concurrency: usize) -> HashMap<OwnerRepo, u64>
where
    P: PopularityProvider + ?Sized,
    I: IntoIterator<Item = OwnerRepo>,
{
    stream::iter(repos)
        .map(move |repo| async move {
            let count = match provider.fetch_popularity(&repo).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(provider = provider.name(), repo = %repo, error = %e, "popularity unavailable, using 0");
                    0
                }
            };
            (repo, count)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_all_degrades_failures_to_zero() {
        let provider = StaticPopularity::new().with("Acme/Known", 42);
        let repos = vec![
            OwnerRepo::new("acme", "known"),
            OwnerRepo::new("acme", "unknown"),
        ];
        let counts = fetch_all(&provider, repos, 2).await;
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&OwnerRepo::new("acme", "known")], 42);
        assert_eq!(counts[&OwnerRepo::new("acme", "unknown")], 0);
    }

    #[tokio::test]
    async fn test_disabled_provider_reports_zero() {
        let counts = fetch_all(&NoPopularity, vec![OwnerRepo::new("a", "b")], 0).await;
        assert_eq!(counts[&OwnerRepo::new("a", "b")], 0);
    }
}
