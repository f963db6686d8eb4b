//! Multi-source aggregation into one deduplicated [`Catalog`].
//!
//! # Algorithm
//!
//! 1. **Structured records** resolve their id from the declared name and
//!    their repository from `source.project`. Popularity is fetched per
//!    repository; verification runs through [`trust::classify`], or the
//!    curated id lookup alone when no repository resolves. Duplicates
//!    merge by popularity like search records. A config
//!    carrying `url`/`endpoint` makes the server remote (one `http`
//!    connection); otherwise it gets one `stdio` connection launching its
//!    container image.
//! 2. **Search records** derive their id from the repository name (or the
//!    curated id for a curated repository) and merge into the working set
//!    only when the id is new or strictly more popular than the incumbent.
//!    Ties keep the incumbent.
//! 3. **Curated backfill** adds a minimal verified entry for every curated id
//!    still missing, so source outages never hide a known official server.
//! 4. **Sort** by verified desc, popularity desc, id asc.
//! 5. **Stamp and validate**: a catalog that breaks the summary/detail
//!    invariants aborts the run.
//!
//! All popularity lookups for a phase are fetched before that phase merges,
//! so the outcome never depends on fetch completion order.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identity::{self, OwnerRepo};
use crate::models::{Catalog, CatalogDetail, CatalogSummary, ConnectionSpec};
use crate::popularity::{self, PopularityProvider};
use crate::records::{Endpoint, SearchRecord, StructuredRecord};
use crate::trust::{self, CuratedList};

/// Security flag recorded for servers published by the structured registry,
/// whose images are scanned before publication.
pub const SCAN_PASSED: &str = "scanPassed";

/// Tunables for an aggregation run.
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    /// Homepage prefix for structured records without a project URL;
    /// the server name is appended.
    pub registry_homepage: String,
    /// Image namespace used when a structured record names no image.
    pub image_namespace: String,
    /// Maximum concurrent popularity fetches.
    pub concurrency: usize,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            registry_homepage: "https://github.com/docker/mcp-registry/tree/main/servers".to_string(),
            image_namespace: "mcp".to_string(),
            concurrency: 8,
        }
    }
}

/// One connector as a summary/detail pair that always moves together.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub summary: CatalogSummary,
    pub detail: CatalogDetail,
}

impl Entry {
    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn popularity(&self) -> u64 {
        self.summary.popularity
    }
}

/// Result of offering an entry to the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    Kept,
}

/// Working map of entries keyed by canonical id.
#[derive(Debug, Default)]
pub struct WorkingSet {
    entries: HashMap<String, Entry>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Insert unconditionally, replacing any entry with the same id.
    pub fn insert(&mut self, entry: Entry) -> MergeOutcome {
        match self.entries.insert(entry.id().to_string(), entry) {
            Some(_) => MergeOutcome::Replaced,
            None => MergeOutcome::Inserted,
        }
    }

    /// Insert when the id is absent or the incumbent is strictly less popular.
    pub fn merge(&mut self, entry: Entry) -> MergeOutcome {
        match self.entries.get(entry.id()) {
            Some(existing) if existing.popularity() >= entry.popularity() => MergeOutcome::Kept,
            Some(_) => {
                self.entries.insert(entry.id().to_string(), entry);
                MergeOutcome::Replaced
            }
            None => {
                self.entries.insert(entry.id().to_string(), entry);
                MergeOutcome::Inserted
            }
        }
    }

    /// Sort, stamp, and validate into a catalog.
    pub fn into_catalog(self, generated_at: DateTime<Utc>) -> Result<Catalog> {
        let mut summaries = Vec::with_capacity(self.entries.len());
        let mut details = BTreeMap::new();
        for (id, entry) in self.entries {
            summaries.push(entry.summary);
            details.insert(id, entry.detail);
        }
        sort_summaries(&mut summaries);

        let catalog = Catalog {
            generated_at,
            summaries,
            details,
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

/// Catalog order: verified first, then most popular, then id.
pub fn sort_summaries(summaries: &mut [CatalogSummary]) {
    summaries.sort_by(|a, b| {
        b.verified
            .cmp(&a.verified)
            .then(b.popularity.cmp(&a.popularity))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Build the entry for a structured record, given its popularity.
pub fn entry_from_structured(
    record: &StructuredRecord,
    popularity: u64,
    curated: &CuratedList,
    options: &AggregatorOptions,
) -> Entry {
    let id = record.canonical_id();
    let repo = record.owner_repo();
    // A curated id is verified even when no repository resolves.
    let verified = match &repo {
        Some(r) => trust::is_verified(r, &id, curated),
        None => curated.contains_id(&id),
    };

    let display_name = record
        .declared_display_name()
        .map(str::to_string)
        .unwrap_or_else(|| identity::display_name(&id));
    let description = record
        .declared_description()
        .map(str::to_string)
        .unwrap_or_else(|| default_description(&display_name));
    let homepage = record
        .project_url()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/{}", options.registry_homepage, record.name));

    let (remote, connection) = match record.endpoint() {
        Endpoint::Remote(url) => (true, ConnectionSpec::http(url)),
        Endpoint::Local => {
            let image = record
                .image
                .clone()
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| format!("{}/{}", options.image_namespace, record.name));
            (false, ConnectionSpec::stdio(Some(format!("docker run -i {}", image))))
        }
    };

    let security_flags = BTreeMap::from([(SCAN_PASSED.to_string(), true)]);

    Entry {
        summary: CatalogSummary {
            id: id.clone(),
            display_name: display_name.clone(),
            description: description.clone(),
            verified,
            popularity,
            remote,
            homepage,
        },
        detail: CatalogDetail {
            id,
            display_name,
            description,
            remote,
            connections: vec![connection],
            capabilities: Vec::new(),
            security_flags: Some(security_flags),
        },
    }
}

/// Build the entry for a repository-search hit.
pub fn entry_from_search(record: &SearchRecord, curated: &CuratedList) -> Result<Entry> {
    let repo = record.owner_repo()?;
    let id = identity::canonical_id_for_repo(&repo, curated);
    let verified = trust::is_verified(&repo, &id, curated);
    let display_name = identity::display_name(&id);
    let description = record
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_description(&display_name));
    let homepage = record
        .web_url()
        .map(str::to_string)
        .unwrap_or_else(|| repo.homepage());

    Ok(minimal_entry(
        id,
        display_name,
        description,
        verified,
        record.stargazers_count,
        homepage,
    ))
}

/// Build the backfill entry for a curated id missing from both sources.
pub fn curated_entry(id: &str, repo: &OwnerRepo, popularity: u64) -> Entry {
    minimal_entry(
        id.to_string(),
        identity::display_name(id),
        format!("Official MCP server from {}", repo.owner),
        true,
        popularity,
        repo.homepage(),
    )
}

fn minimal_entry(
    id: String,
    display_name: String,
    description: String,
    verified: bool,
    popularity: u64,
    homepage: String,
) -> Entry {
    Entry {
        summary: CatalogSummary {
            id: id.clone(),
            display_name: display_name.clone(),
            description: description.clone(),
            verified,
            popularity,
            remote: false,
            homepage,
        },
        detail: CatalogDetail {
            id,
            display_name,
            description,
            remote: false,
            connections: vec![ConnectionSpec::stdio(None)],
            capabilities: Vec::new(),
            security_flags: None,
        },
    }
}

fn default_description(display_name: &str) -> String {
    format!("MCP server for {}", display_name)
}

/// Counters describing one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub structured: usize,
    pub search_inserted: usize,
    pub search_replaced: usize,
    pub search_kept: usize,
    pub search_skipped: usize,
    pub backfilled: usize,
}

/// Runs the aggregation pipeline against a curated list and a popularity source.
pub struct Aggregator<'a, P: PopularityProvider + ?Sized> {
    curated: &'a CuratedList,
    provider: &'a P,
    options: AggregatorOptions,
}

impl<'a, P: PopularityProvider + ?Sized> Aggregator<'a, P> {
    pub fn new(curated: &'a CuratedList, provider: &'a P) -> Self {
        Self {
            curated,
            provider,
            options: AggregatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AggregatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a catalog stamped with the current time.
    pub async fn build(
        &self,
        structured: &[StructuredRecord],
        search: &[SearchRecord],
    ) -> Result<(Catalog, BuildStats)> {
        self.build_at(structured, search, Utc::now()).await
    }

    /// Build a catalog stamped with `generated_at`.
    pub async fn build_at(
        &self,
        structured: &[StructuredRecord],
        search: &[SearchRecord],
        generated_at: DateTime<Utc>,
    ) -> Result<(Catalog, BuildStats)> {
        let mut stats = BuildStats::default();
        let mut working = WorkingSet::new();

        // 1. Structured records
        let repos: BTreeSet<OwnerRepo> = structured.iter().filter_map(|r| r.owner_repo()).collect();
        let counts = popularity::fetch_all(self.provider, repos, self.options.concurrency).await;
        for record in structured {
            let stars = record
                .owner_repo()
                .and_then(|r| counts.get(&r).copied())
                .unwrap_or(0);
            let entry = entry_from_structured(record, stars, self.curated, &self.options);
            match working.merge(entry) {
                MergeOutcome::Replaced => {
                    debug!(server = %record.name, stars, "structured record replaced less popular duplicate")
                }
                MergeOutcome::Kept => {
                    debug!(server = %record.name, stars, "structured duplicate kept incumbent")
                }
                MergeOutcome::Inserted => {}
            }
            stats.structured += 1;
        }

        // 2. Search records
        for record in search {
            let entry = match entry_from_search(record, self.curated) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping search record");
                    stats.search_skipped += 1;
                    continue;
                }
            };
            let id = entry.id().to_string();
            let stars = entry.popularity();
            match working.merge(entry) {
                MergeOutcome::Inserted => stats.search_inserted += 1,
                MergeOutcome::Replaced => {
                    debug!(server = %id, from = %record.full_name, stars, "search record replaced less popular entry");
                    stats.search_replaced += 1;
                }
                MergeOutcome::Kept => stats.search_kept += 1,
            }
        }

        // 3. Curated backfill
        let missing: Vec<(&str, &OwnerRepo)> = self
            .curated
            .iter()
            .filter(|(id, _)| !working.contains(id))
            .collect();
        if !missing.is_empty() {
            let repos = missing.iter().map(|(_, repo)| (*repo).clone());
            let counts = popularity::fetch_all(self.provider, repos, self.options.concurrency).await;
            for (id, repo) in missing {
                let stars = counts.get(repo).copied().unwrap_or(0);
                info!(server = id, repo = %repo, "adding curated server missing from sources");
                working.insert(curated_entry(id, repo, stars));
                stats.backfilled += 1;
            }
        }

        // 4-5. Sort, stamp, validate
        let catalog = working.into_catalog(generated_at)?;
        Ok((catalog, stats))
    }
}
