//! Record sources feeding the aggregator.
//!
//! A [`RecordSource`] fetches raw documents from one place and says which of
//! the two record shapes they carry. [`collect_sources`] runs every source
//! concurrently and decodes what comes back:
//!
//! | Source | Kind | Reads |
//! |--------|------|-------|
//! | [`RegistrySource`] | structured | `server.yaml` per directory of a GitHub repository |
//! | [`RepoSearchSource`] | search | GitHub repository search |
//! | [`LocalServersSource`] | structured | `server.yaml`/`server.json` files under a directory |
//! | [`LocalSearchSource`] | search | a JSON array of search results |
//!
//! A source that fails as a whole contributes nothing and is reported as
//! unavailable; a document that fails to parse or decode is skipped. Neither
//! stops the build.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mcp_catalog_core::error::CatalogError;
use mcp_catalog_core::records::{SearchRecord, StructuredRecord};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, RegistrySourceConfig, SearchSourceConfig};
use crate::github::GithubClient;

/// File names recognized as structured server descriptions.
const SERVER_FILES: [&str; 3] = ["server.yaml", "server.yml", "server.json"];

/// Which record shape a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Structured,
    Search,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Structured => write!(f, "structured"),
            SourceKind::Search => write!(f, "search"),
        }
    }
}

/// Body of a fetched document.
#[derive(Debug, Clone)]
pub enum Payload {
    Yaml(String),
    Json(String),
    Value(Value),
}

impl Payload {
    fn into_value(self) -> Result<Value> {
        match self {
            Payload::Yaml(text) => Ok(serde_yaml::from_str(&text)?),
            Payload::Json(text) => Ok(serde_json::from_str(&text)?),
            Payload::Value(value) => Ok(value),
        }
    }
}

/// One undecoded document from a source.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Names the document in log output (path, repository, or directory).
    pub label: String,
    /// Server name to use when a structured document declares none,
    /// typically its directory name.
    pub default_name: Option<String>,
    pub payload: Payload,
}

impl RawDocument {
    pub fn new(label: impl Into<String>, payload: Payload) -> Self {
        Self {
            label: label.into(),
            default_name: None,
            payload,
        }
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Instance name used in reports (e.g. `"registry"`, `"local-search"`).
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// One line describing where records come from.
    fn description(&self) -> String;

    async fn fetch(&self) -> Result<Vec<RawDocument>>;
}

// ============ GitHub-backed sources ============

/// Structured records from a registry repository laid out as
/// `<path>/<server>/server.yaml`.
pub struct RegistrySource {
    client: Arc<GithubClient>,
    config: RegistrySourceConfig,
    concurrency: usize,
}

impl RegistrySource {
    pub fn new(client: Arc<GithubClient>, config: RegistrySourceConfig, concurrency: usize) -> Self {
        Self {
            client,
            config,
            concurrency,
        }
    }
}

#[async_trait]
impl RecordSource for RegistrySource {
    fn name(&self) -> &str {
        "registry"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Structured
    }

    fn description(&self) -> String {
        format!(
            "github.com/{} ({}/ on {})",
            self.config.repo, self.config.path, self.config.branch
        )
    }

    async fn fetch(&self) -> Result<Vec<RawDocument>> {
        let cfg = &self.config;
        let entries = self
            .client
            .list_dir(&cfg.repo, &cfg.path, &cfg.branch)
            .await
            .with_context(|| format!("Failed to list {}/{}", cfg.repo, cfg.path))?;
        let dirs: Vec<String> = entries
            .into_iter()
            .filter(|e| e.is_dir())
            .map(|e| e.name)
            .collect();
        info!(repo = %cfg.repo, servers = dirs.len(), "listed registry servers");

        // `buffered` keeps listing order, which decides duplicate precedence.
        let fetched: Vec<Option<RawDocument>> = stream::iter(dirs)
            .map(move |name| async move {
                let path = format!("{}/{}/server.yaml", cfg.path, name);
                match self.client.fetch_file(&cfg.repo, &path, &cfg.branch).await {
                    Ok(text) => Some(RawDocument::new(path, Payload::Yaml(text)).with_default_name(name)),
                    Err(e) => {
                        warn!(error = %CatalogError::source_unavailable(&path, format!("{:#}", e)), "skipping server");
                        None
                    }
                }
            })
            .buffered(self.concurrency.max(1))
            .collect()
            .await;

        Ok(fetched.into_iter().flatten().collect())
    }
}

/// Search records from a GitHub repository search sorted by stars.
pub struct RepoSearchSource {
    client: Arc<GithubClient>,
    config: SearchSourceConfig,
}

impl RepoSearchSource {
    pub fn new(client: Arc<GithubClient>, config: SearchSourceConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl RecordSource for RepoSearchSource {
    fn name(&self) -> &str {
        "search"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Search
    }

    fn description(&self) -> String {
        format!(
            "GitHub search \"{}\" (top {} by stars)",
            self.config.query, self.config.limit
        )
    }

    async fn fetch(&self) -> Result<Vec<RawDocument>> {
        let items = self
            .client
            .search_repositories(&self.config.query, self.config.limit)
            .await
            .context("GitHub repository search failed")?;
        Ok(items
            .iter()
            .map(|item| RawDocument::new(item.full_name.clone(), Payload::Value(item.to_record_value())))
            .collect())
    }
}

// ============ Local sources ============

/// Structured records from a directory tree, one `server.yaml` (or
/// `server.json`) per server directory.
pub struct LocalServersSource {
    root: PathBuf,
}

impl LocalServersSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl RecordSource for LocalServersSource {
    fn name(&self) -> &str {
        "local-servers"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Structured
    }

    fn description(&self) -> String {
        self.root.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawDocument>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_server_files(&root)).await?
    }
}

fn scan_server_files(root: &Path) -> Result<Vec<RawDocument>> {
    if !root.is_dir() {
        bail!("servers directory does not exist: {}", root.display());
    }

    let mut docs = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !SERVER_FILES.contains(&file_name.as_str()) {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let label = relative.to_string_lossy().to_string();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable server file");
                continue;
            }
        };
        let payload = if file_name.ends_with(".json") {
            Payload::Json(text)
        } else {
            Payload::Yaml(text)
        };

        let mut doc = RawDocument::new(label, payload);
        let dir_name = path
            .parent()
            .filter(|p| *p != root)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string());
        if let Some(name) = dir_name {
            doc = doc.with_default_name(name);
        }
        docs.push(doc);
    }
    Ok(docs)
}

/// Search records from a JSON file holding an array of results, in the
/// shape `{fullName, description, stargazersCount, url}`.
pub struct LocalSearchSource {
    path: PathBuf,
}

impl LocalSearchSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for LocalSearchSource {
    fn name(&self) -> &str {
        "local-search"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Search
    }

    fn description(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawDocument>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read search results: {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse search results: {}", self.path.display()))?;
        let Value::Array(items) = value else {
            bail!("search results must be a JSON array: {}", self.path.display());
        };
        let file = self.path.display().to_string();
        Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| RawDocument::new(format!("{}#{}", file, i), Payload::Value(item)))
            .collect())
    }
}

// ============ Collection ============

/// Outcome of one source during collection.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub name: String,
    pub kind: SourceKind,
    /// Where the source reads from, as [`RecordSource::description`] puts it.
    pub description: String,
    pub fetched: usize,
    pub accepted: usize,
    pub malformed: usize,
    /// Set when the source was unavailable and contributed nothing.
    pub error: Option<String>,
}

/// Decoded records from all sources, in source order.
#[derive(Debug, Default)]
pub struct Collected {
    pub structured: Vec<StructuredRecord>,
    pub search: Vec<SearchRecord>,
    pub reports: Vec<SourceReport>,
}

/// Fetch every source concurrently and decode the results.
pub async fn collect_sources(sources: &[Box<dyn RecordSource>]) -> Collected {
    let fetched = futures::future::join_all(sources.iter().map(|s| s.fetch())).await;

    let mut collected = Collected::default();
    for (source, result) in sources.iter().zip(fetched) {
        let mut report = SourceReport {
            name: source.name().to_string(),
            kind: source.kind(),
            description: source.description(),
            fetched: 0,
            accepted: 0,
            malformed: 0,
            error: None,
        };

        let docs = match result {
            Ok(docs) => docs,
            Err(e) => {
                let err = CatalogError::source_unavailable(source.name(), format!("{:#}", e));
                warn!(error = %err, "source contributed nothing");
                report.error = Some(err.to_string());
                collected.reports.push(report);
                continue;
            }
        };

        report.fetched = docs.len();
        for doc in docs {
            let label = doc.label.clone();
            let decoded = match source.kind() {
                SourceKind::Structured => {
                    decode_structured(doc).map(|r| collected.structured.push(r))
                }
                SourceKind::Search => decode_search(doc).map(|r| collected.search.push(r)),
            };
            match decoded {
                Ok(()) => report.accepted += 1,
                Err(e) => {
                    warn!(source = source.name(), record = %label, error = %e, "skipping malformed record");
                    report.malformed += 1;
                }
            }
        }
        debug!(
            source = source.name(),
            fetched = report.fetched,
            accepted = report.accepted,
            "source collected"
        );
        collected.reports.push(report);
    }
    collected
}

/// Decode a structured document, filling in its directory name when the
/// document declares no `name`.
pub fn decode_structured(doc: RawDocument) -> std::result::Result<StructuredRecord, CatalogError> {
    let label = doc.label;
    let mut value = doc
        .payload
        .into_value()
        .map_err(|e| CatalogError::malformed(&label, e))?;
    if let (Value::Object(map), Some(name)) = (&mut value, doc.default_name) {
        map.entry("name").or_insert(Value::String(name));
    }
    StructuredRecord::from_value(&label, value)
}

pub fn decode_search(doc: RawDocument) -> std::result::Result<SearchRecord, CatalogError> {
    let label = doc.label;
    let value = doc
        .payload
        .into_value()
        .map_err(|e| CatalogError::malformed(&label, e))?;
    SearchRecord::from_value(&label, value)
}

/// The sources a build uses. Without a client the GitHub-backed ones are left out.
pub fn configured_sources(
    config: &Config,
    client: Option<Arc<GithubClient>>,
) -> Vec<Box<dyn RecordSource>> {
    let mut sources: Vec<Box<dyn RecordSource>> = Vec::new();
    let cfg = &config.sources;

    if let Some(client) = &client {
        if cfg.registry.enabled {
            sources.push(Box::new(RegistrySource::new(
                client.clone(),
                cfg.registry.clone(),
                config.github.concurrency,
            )));
        }
    }
    if let Some(dir) = &cfg.local.servers_dir {
        sources.push(Box::new(LocalServersSource::new(dir)));
    }
    if let Some(client) = &client {
        if cfg.search.enabled {
            sources.push(Box::new(RepoSearchSource::new(client.clone(), cfg.search.clone())));
        }
    }
    if let Some(file) = &cfg.local.search_results {
        sources.push(Box::new(LocalSearchSource::new(file)));
    }
    sources
}

/// Status row for `mcpcat sources`.
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub name: String,
    pub kind: SourceKind,
    pub status: String,
    pub location: String,
}

pub fn get_sources(config: &Config) -> Vec<SourceStatus> {
    let cfg = &config.sources;
    let enabled = |on: bool| (if on { "ENABLED" } else { "DISABLED" }).to_string();
    let local = |path: &Option<PathBuf>| match path {
        Some(p) if p.exists() => ("OK".to_string(), p.display().to_string()),
        Some(p) => ("NOT FOUND".to_string(), p.display().to_string()),
        None => ("NOT CONFIGURED".to_string(), "-".to_string()),
    };

    let (servers_status, servers_location) = local(&cfg.local.servers_dir);
    let (search_status, search_location) = local(&cfg.local.search_results);

    vec![
        SourceStatus {
            name: "registry".to_string(),
            kind: SourceKind::Structured,
            status: enabled(cfg.registry.enabled),
            location: format!("github.com/{}/{}", cfg.registry.repo, cfg.registry.path),
        },
        SourceStatus {
            name: "search".to_string(),
            kind: SourceKind::Search,
            status: enabled(cfg.search.enabled),
            location: format!("\"{}\"", cfg.search.query),
        },
        SourceStatus {
            name: "local-servers".to_string(),
            kind: SourceKind::Structured,
            status: servers_status,
            location: servers_location,
        },
        SourceStatus {
            name: "local-search".to_string(),
            kind: SourceKind::Search,
            status: search_status,
            location: search_location,
        },
    ]
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<16} {:<12} {:<16} LOCATION", "SOURCE", "KIND", "STATUS");
    for s in get_sources(config) {
        println!(
            "{:<16} {:<12} {:<16} {}",
            s.name,
            s.kind.to_string(),
            s.status,
            s.location
        );
    }
    println!(
        "popularity: {}   curated: {} built-in, {} configured",
        config.popularity.provider,
        if config.curated.include_builtin { "with" } else { "without" },
        config.curated.entries.len()
    );
    Ok(())
}
