//! Raw source records consumed by the aggregator.
//!
//! Two shapes arrive from outside:
//!
//! - [`StructuredRecord`]: a per-server configuration document (the
//!   `server.yaml` files of a registry repository).
//! - [`SearchRecord`]: one hit of a repository search.
//!
//! Records are decoded from a format-neutral [`serde_json::Value`] so the
//! application can feed YAML or JSON. A value that does not match the
//! documented shape is rejected whole as `MalformedRecord`; there is no
//! partial extraction.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{CatalogError, Result};
use crate::identity::{self, OwnerRepo};
use crate::trust::CuratedList;

/// Config keys whose presence marks a server as remote.
const REMOTE_KEYS: [&str; 2] = ["url", "endpoint"];

/// Where a structured record's project lives: a bare URL or a mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceRef {
    Url(String),
    Detailed {
        #[serde(default)]
        project: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct About {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteBlock {
    #[serde(default)]
    pub url: Option<String>,
}

/// How a structured record says it is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Launched locally from a container image.
    Local,
    /// Reached over HTTP, at the given address when one was declared.
    Remote(Option<String>),
}

/// A server description from the structured-config source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRecord {
    pub name: String,
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub about: Option<About>,
    #[serde(default)]
    pub source: Option<SourceRef>,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
    #[serde(default)]
    pub remote: Option<RemoteBlock>,
    #[serde(default)]
    pub image: Option<String>,
}

impl StructuredRecord {
    /// Decode and validate one record. `label` names it in errors.
    pub fn from_value(label: &str, value: Value) -> Result<Self> {
        let record: Self = decode(label, value)?;
        if record.name.trim().is_empty() {
            return Err(CatalogError::malformed(label, "name must not be empty"));
        }
        Ok(record)
    }

    pub fn project_url(&self) -> Option<&str> {
        let url = match self.source.as_ref()? {
            SourceRef::Url(url) => Some(url.as_str()),
            SourceRef::Detailed { project } => project.as_deref(),
        }?;
        let url = url.trim();
        (!url.is_empty()).then_some(url)
    }

    pub fn owner_repo(&self) -> Option<OwnerRepo> {
        self.project_url().and_then(identity::extract_owner_repo)
    }

    pub fn canonical_id(&self) -> String {
        identity::canonical_id(&self.name, None)
    }

    /// Declared display name, falling back to `about.title`.
    pub fn declared_display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or_else(|| self.about.as_ref().and_then(|a| a.title.as_deref()))
            .filter(|s| !s.trim().is_empty())
    }

    /// Declared description, falling back to `about.description`.
    pub fn declared_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or_else(|| self.about.as_ref().and_then(|a| a.description.as_deref()))
            .filter(|s| !s.trim().is_empty())
    }

    pub fn endpoint(&self) -> Endpoint {
        if let Some(config) = &self.config {
            if REMOTE_KEYS.iter().any(|k| config.contains_key(*k)) {
                let url = REMOTE_KEYS
                    .iter()
                    .filter_map(|k| config.get(*k).and_then(Value::as_str))
                    .find(|s| !s.is_empty())
                    .map(str::to_string);
                return Endpoint::Remote(url);
            }
        }
        match self.remote.as_ref().and_then(|r| r.url.as_deref()) {
            Some(url) if !url.is_empty() => Endpoint::Remote(Some(url.to_string())),
            _ => Endpoint::Local,
        }
    }
}

/// A repository found by the search source.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRecord {
    #[serde(rename = "fullName", alias = "full_name")]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "stargazersCount", alias = "stargazers_count")]
    pub stargazers_count: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl SearchRecord {
    /// Decode and validate one record; `fullName` must be `owner/repo`.
    pub fn from_value(label: &str, value: Value) -> Result<Self> {
        let record: Self = decode(label, value)?;
        if OwnerRepo::parse(&record.full_name).is_none() {
            return Err(CatalogError::malformed(
                label,
                format!("fullName '{}' is not owner/repo", record.full_name),
            ));
        }
        Ok(record)
    }

    pub fn owner_repo(&self) -> Result<OwnerRepo> {
        OwnerRepo::parse(&self.full_name).ok_or_else(|| {
            CatalogError::malformed(&self.full_name, "fullName is not owner/repo")
        })
    }

    pub fn canonical_id(&self, curated: &CuratedList) -> Result<String> {
        Ok(identity::canonical_id_for_repo(&self.owner_repo()?, curated))
    }

    /// Web address of the repository, `html_url` first.
    pub fn web_url(&self) -> Option<&str> {
        self.html_url
            .as_deref()
            .or(self.url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// A record from either source.
#[derive(Debug, Clone)]
pub enum RawSourceRecord {
    Structured(StructuredRecord),
    Search(SearchRecord),
}

impl RawSourceRecord {
    pub fn canonical_id(&self, curated: &CuratedList) -> Result<String> {
        match self {
            RawSourceRecord::Structured(r) => Ok(r.canonical_id()),
            RawSourceRecord::Search(r) => r.canonical_id(curated),
        }
    }
}

/// Whether two raw records describe the same connector.
pub fn same_connector(a: &RawSourceRecord, b: &RawSourceRecord, curated: &CuratedList) -> bool {
    match (a.canonical_id(curated), b.canonical_id(curated)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

fn decode<T: DeserializeOwned>(label: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CatalogError::malformed(label, e))
}
