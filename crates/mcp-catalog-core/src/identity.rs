//! Identity resolution: canonical ids and repository coordinates.
//!
//! Every function here is pure. The same name or URL always resolves to the
//! same id, which is what lets the aggregator merge two independently
//! discovered records of one connector.
//!
//! # Canonical ids from repository names
//!
//! Repositories publishing MCP servers tend to decorate their names with
//! protocol markers (`github-mcp-server`, `mcp-server-qdrant`, `mcp-redis`).
//! The id is the repository short name, lowercased and hyphenated, with
//! these markers removed:
//!
//! | Repository | Id |
//! |------------|----|
//! | `github-mcp-server` | `github` |
//! | `mcp-server-qdrant` | `qdrant` |
//! | `MiniMax-MCP` | `minimax` |
//! | `kagimcp` | `kagimcp` (no marker, unchanged) |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::trust::CuratedList;

/// Marker substrings removed from repository names, applied in order.
const DECORATORS: [&str; 4] = ["-mcp-server", "mcp-server-", "-mcp", "mcp-"];

const GITHUB_HOST: &str = "github.com";

/// A repository coordinate: `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerRepo {
    pub owner: String,
    pub repo: String,
}

impl OwnerRepo {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse a repository full name of the form `owner/repo`.
    ///
    /// Exactly two non-empty segments are required.
    pub fn parse(full_name: &str) -> Option<Self> {
        let mut parts = full_name.trim().split('/');
        let owner = parts.next()?.trim();
        let repo = parts.next()?.trim();
        if parts.next().is_some() || owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self::new(owner, repo))
    }

    /// The full name, lowercased, used as a case-insensitive lookup key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.repo).to_lowercase()
    }

    pub fn homepage(&self) -> String {
        format!("https://{}/{}/{}", GITHUB_HOST, self.owner, self.repo)
    }
}

impl fmt::Display for OwnerRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Extract `owner/repo` from a project URL.
///
/// Accepts `github.com/owner/repo` with an optional `http(s)://` scheme and
/// `www.` prefix. Extra path segments, a `.git` suffix, and any query or
/// fragment are ignored. Anything else yields `None`.
pub fn extract_owner_repo(url: &str) -> Option<OwnerRepo> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let path = rest.strip_prefix(GITHUB_HOST)?.strip_prefix('/')?;
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut segments = path.split('/');
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(OwnerRepo::new(owner, repo))
}

/// Lowercase and hyphenate a raw name.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Derive an id from a repository short name by removing protocol markers.
///
/// Names without a marker pass through (normalized). A name made only of
/// markers keeps its normalized form rather than collapsing to nothing.
pub fn strip_decorators(repo: &str) -> String {
    let normalized = normalize_name(repo);
    let stripped = DECORATORS
        .iter()
        .fold(normalized.clone(), |acc, marker| acc.replace(marker, ""));
    if stripped.is_empty() {
        normalized
    } else {
        stripped
    }
}

/// Resolve the canonical id for a connector.
///
/// With a repository, the id comes from the repository short name with
/// markers stripped. Without one, the declared name is normalized and used
/// as is.
pub fn canonical_id(candidate_name: &str, owner_repo: Option<&OwnerRepo>) -> String {
    match owner_repo {
        Some(or) => strip_decorators(&or.repo),
        None => normalize_name(candidate_name),
    }
}

/// Resolve the id for a repository found by search.
///
/// A repository on the curated list takes its curated id; otherwise the id
/// is derived from the repository name.
pub fn canonical_id_for_repo(owner_repo: &OwnerRepo, curated: &CuratedList) -> String {
    curated
        .id_for_repo(owner_repo)
        .map(str::to_string)
        .unwrap_or_else(|| canonical_id(&owner_repo.repo, Some(owner_repo)))
}

/// Human-readable name for an id: `aws-powertools` → `Aws Powertools`.
pub fn display_name(id: &str) -> String {
    id.split('-')
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_alpha = false;
    for c in word.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}
