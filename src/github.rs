//! GitHub REST client.
//!
//! Used for three things during a build:
//!
//! - listing the server directories of the structured registry repository
//!   and fetching each `server.yaml` (contents API, base64 payloads);
//! - the repository search that feeds the search source;
//! - star counts, through the [`PopularityProvider`] implementation.
//!
//! Requests carry a bearer token when the configured environment variable is
//! set. Rate-limited (429) and 5xx responses are retried with exponential
//! backoff; other client errors fail immediately.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mcp_catalog_core::identity::OwnerRepo;
use mcp_catalog_core::popularity::PopularityProvider;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::GithubConfig;

const USER_AGENT: &str = concat!("mcpcat/", env!("CARGO_PKG_VERSION"));

/// One entry of a contents API directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub path: String,
}

impl ContentEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }
}

#[derive(Debug, Deserialize)]
struct FilePayload {
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    stargazers_count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// A repository search hit as the REST API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl SearchItem {
    /// The record shape the search source hands to the aggregator.
    pub fn to_record_value(&self) -> Value {
        json!({
            "fullName": self.full_name,
            "description": self.description,
            "stargazersCount": self.stargazers_count,
            "url": self.html_url,
        })
    }
}

pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token(),
            max_retries: config.max_retries,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// List a directory of `repo` at `branch`.
    pub async fn list_dir(&self, repo: &str, path: &str, branch: &str) -> Result<Vec<ContentEntry>> {
        let url = format!("{}/repos/{}/contents/{}", self.api_url, repo, path);
        self.get_json(&url, &[("ref", branch)]).await
    }

    /// Fetch and decode a file of `repo` at `branch`.
    pub async fn fetch_file(&self, repo: &str, path: &str, branch: &str) -> Result<String> {
        let url = format!("{}/repos/{}/contents/{}", self.api_url, repo, path);
        let payload: FilePayload = self.get_json(&url, &[("ref", branch)]).await?;
        decode_content(&payload.content, &payload.encoding)
            .with_context(|| format!("Failed to decode {}:{}", repo, path))
    }

    /// Search repositories, most starred first.
    pub async fn search_repositories(&self, query: &str, limit: u32) -> Result<Vec<SearchItem>> {
        let url = format!("{}/search/repositories", self.api_url);
        let per_page = limit.clamp(1, 100).to_string();
        let response: SearchResponse = self
            .get_json(
                &url,
                &[
                    ("q", query),
                    ("sort", "stars"),
                    ("order", "desc"),
                    ("per_page", per_page.as_str()),
                ],
            )
            .await?;
        Ok(response.items)
    }

    pub async fn stargazers(&self, repo: &OwnerRepo) -> Result<u64> {
        let url = format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.repo);
        let info: RepoInfo = self.get_json(&url, &[]).await?;
        Ok(info.stargazers_count)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .http
                .get(url)
                .query(query)
                .header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("Invalid JSON from {}", url));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        debug!(%status, url, attempt, "GitHub request failed, retrying");
                        last_err = Some(anyhow::anyhow!("GitHub API error {}: {}", status, body_text));
                        continue;
                    }
                    bail!("GitHub API error {} for {}: {}", status, url, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("GitHub request failed after retries")))
    }
}

#[async_trait]
impl PopularityProvider for GithubClient {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch_popularity(&self, repo: &OwnerRepo) -> Result<u64> {
        self.stargazers(repo).await
    }
}

/// Decode a contents API payload. Base64 payloads are wrapped at 60
/// columns, so whitespace is removed before decoding.
pub fn decode_content(content: &str, encoding: &str) -> Result<String> {
    match encoding {
        "base64" | "" => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD.decode(compact.as_bytes())?;
            Ok(String::from_utf8(bytes)?)
        }
        "utf-8" | "utf8" => Ok(content.to_string()),
        other => bail!("unsupported content encoding: {}", other),
    }
}
