use anyhow::{Context, Result};
use mcp_catalog_core::identity::OwnerRepo;
use mcp_catalog_core::trust::CuratedList;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub popularity: PopularityConfig,
    #[serde(default)]
    pub curated: CuratedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./data/catalog.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable holding an API token. Unauthenticated requests
    /// work but are heavily rate limited.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for rate-limited (429) and 5xx responses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Maximum concurrent GitHub requests during a build.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            concurrency: default_concurrency(),
        }
    }
}

impl GithubConfig {
    /// The token from the configured environment variable, if set.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}
fn default_concurrency() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub registry: RegistrySourceConfig,
    #[serde(default)]
    pub search: SearchSourceConfig,
    #[serde(default)]
    pub local: LocalSourcesConfig,
}

/// Structured source: a repository with one directory per server, each
/// holding a `server.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct RegistrySourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_registry_repo")]
    pub repo: String,
    #[serde(default = "default_registry_path")]
    pub path: String,
    #[serde(default = "default_registry_branch")]
    pub branch: String,
    /// Image namespace for servers that name no image: `<namespace>/<name>`.
    #[serde(default = "default_image_namespace")]
    pub image_namespace: String,
}

impl Default for RegistrySourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo: default_registry_repo(),
            path: default_registry_path(),
            branch: default_registry_branch(),
            image_namespace: default_image_namespace(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_registry_repo() -> String {
    "docker/mcp-registry".to_string()
}
fn default_registry_path() -> String {
    "servers".to_string()
}
fn default_registry_branch() -> String {
    "main".to_string()
}
fn default_image_namespace() -> String {
    "mcp".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_search_query")]
    pub query: String,
    /// Results requested from the search API, in `[1, 100]`.
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

impl Default for SearchSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query: default_search_query(),
            limit: default_search_limit(),
        }
    }
}

fn default_search_query() -> String {
    "official mcp server".to_string()
}
fn default_search_limit() -> u32 {
    100
}

/// Offline inputs, read from disk instead of GitHub.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LocalSourcesConfig {
    /// Directory searched recursively for `server.yaml`/`server.json` files.
    #[serde(default)]
    pub servers_dir: Option<PathBuf>,
    /// JSON array of repository search results.
    #[serde(default)]
    pub search_results: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PopularityConfig {
    #[serde(default = "default_popularity_provider")]
    pub provider: String,
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            provider: default_popularity_provider(),
        }
    }
}

impl PopularityConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_popularity_provider() -> String {
    "github".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CuratedConfig {
    /// Start from the built-in list of known official servers.
    #[serde(default = "default_true")]
    pub include_builtin: bool,
    /// Extra or overriding entries: id → `owner/repo`.
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

impl Default for CuratedConfig {
    fn default() -> Self {
        Self {
            include_builtin: true,
            entries: BTreeMap::new(),
        }
    }
}

impl CuratedConfig {
    /// The effective allow-list. Configured entries override built-in ones.
    pub fn to_list(&self) -> Result<CuratedList> {
        let mut list = if self.include_builtin {
            CuratedList::builtin()
        } else {
            CuratedList::new()
        };
        list.extend(&CuratedList::from_pairs(&self.entries)?);
        Ok(list)
    }
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            server: ServerConfig::default(),
            github: GithubConfig::default(),
            sources: SourcesConfig::default(),
            popularity: PopularityConfig::default(),
            curated: CuratedConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate github
    if config.github.concurrency == 0 {
        anyhow::bail!("github.concurrency must be >= 1");
    }
    if config.github.timeout_secs == 0 {
        anyhow::bail!("github.timeout_secs must be >= 1");
    }

    // Validate sources
    if !(1..=100).contains(&config.sources.search.limit) {
        anyhow::bail!("sources.search.limit must be in [1, 100]");
    }
    if config.sources.search.enabled && config.sources.search.query.trim().is_empty() {
        anyhow::bail!("sources.search.query must not be empty when the search source is enabled");
    }
    if config.sources.registry.image_namespace.trim().is_empty() {
        anyhow::bail!("sources.registry.image_namespace must not be empty");
    }
    if config.sources.registry.enabled && OwnerRepo::parse(&config.sources.registry.repo).is_none() {
        anyhow::bail!(
            "sources.registry.repo must be owner/repo, got '{}'",
            config.sources.registry.repo
        );
    }

    match config.popularity.provider.as_str() {
        "github" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown popularity provider: '{}'. Must be github or disabled.",
            other
        ),
    }

    // Validate curated entries
    for (id, repo) in &config.curated.entries {
        if id.trim().is_empty() {
            anyhow::bail!("curated.entries keys must not be empty");
        }
        if OwnerRepo::parse(repo).is_none() {
            anyhow::bail!("curated.entries.{} must be owner/repo, got '{}'", id, repo);
        }
    }

    Ok(())
}
