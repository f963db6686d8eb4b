//! Catalog data model.
//!
//! These are the types persisted in `catalog.json` and served by the query
//! interface. Field names serialize in camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{CatalogError, Result};

/// Transport used to talk to a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Stdio,
    Http,
}

/// One way to talk to a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    pub kind: ConnectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub config_schema: serde_json::Map<String, serde_json::Value>,
}

impl ConnectionSpec {
    /// A local process connection, optionally with the command that starts it.
    pub fn stdio(launch_command: Option<String>) -> Self {
        Self {
            kind: ConnectionKind::Stdio,
            launch_command,
            remote_url: None,
            config_schema: serde_json::Map::new(),
        }
    }

    /// A remote connection reachable at `remote_url`.
    pub fn http(remote_url: Option<String>) -> Self {
        Self {
            kind: ConnectionKind::Http,
            launch_command: None,
            remote_url,
            config_schema: serde_json::Map::new(),
        }
    }
}

/// A named action a connector exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Search-result projection of a cataloged connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub popularity: u64,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub homepage: String,
}

/// Full record for a cataloged connector, keyed by the same `id` as its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDetail {
    pub id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_flags: Option<BTreeMap<String, bool>>,
}

/// One complete, immutable snapshot produced by an aggregation run.
///
/// `summaries` is sorted by (verified desc, popularity desc, id asc) and
/// every summary id has exactly one entry in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub generated_at: DateTime<Utc>,
    pub summaries: Vec<CatalogSummary>,
    pub details: BTreeMap<String, CatalogDetail>,
}

impl Catalog {
    /// A catalog with no entries, used before the first snapshot is loaded.
    pub fn empty() -> Self {
        Self {
            generated_at: DateTime::<Utc>::default(),
            summaries: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn verified_count(&self) -> usize {
        self.summaries.iter().filter(|s| s.verified).count()
    }

    pub fn remote_count(&self) -> usize {
        self.summaries.iter().filter(|s| s.remote).count()
    }

    /// Check the summary/detail lockstep invariants.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.summaries.len());
        for summary in &self.summaries {
            if !seen.insert(summary.id.as_str()) {
                return Err(CatalogError::SchemaViolation(format!(
                    "duplicate id in summaries: {}",
                    summary.id
                )));
            }
            match self.details.get(&summary.id) {
                Some(detail) if detail.id == summary.id => {}
                Some(detail) => {
                    return Err(CatalogError::SchemaViolation(format!(
                        "detail keyed '{}' carries id '{}'",
                        summary.id, detail.id
                    )))
                }
                None => {
                    return Err(CatalogError::SchemaViolation(format!(
                        "summary '{}' has no detail",
                        summary.id
                    )))
                }
            }
        }

        if let Some(orphan) = self.details.keys().find(|k| !seen.contains(k.as_str())) {
            return Err(CatalogError::SchemaViolation(format!(
                "detail '{}' has no summary",
                orphan
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str) -> CatalogSummary {
        CatalogSummary {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            verified: false,
            popularity: 0,
            remote: false,
            homepage: String::new(),
        }
    }

    fn detail(id: &str) -> CatalogDetail {
        CatalogDetail {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            remote: false,
            connections: vec![ConnectionSpec::stdio(None)],
            capabilities: Vec::new(),
            security_flags: None,
        }
    }

    fn catalog(summaries: Vec<CatalogSummary>, details: Vec<CatalogDetail>) -> Catalog {
        Catalog {
            generated_at: Utc::now(),
            summaries,
            details: details.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    #[test]
    fn test_validate_accepts_lockstep() {
        let cat = catalog(vec![summary("a"), summary("b")], vec![detail("a"), detail("b")]);
        assert!(cat.validate().is_ok());
        assert!(Catalog::empty().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_summary() {
        let cat = catalog(vec![summary("a"), summary("a")], vec![detail("a")]);
        let err = cat.validate().unwrap_err();
        assert!(matches!(err, CatalogError::SchemaViolation(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_rejects_missing_detail() {
        let cat = catalog(vec![summary("a"), summary("b")], vec![detail("a")]);
        assert!(matches!(
            cat.validate(),
            Err(CatalogError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_orphan_detail() {
        let cat = catalog(vec![summary("a")], vec![detail("a"), detail("z")]);
        assert!(matches!(
            cat.validate(),
            Err(CatalogError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_serializes_camel_case_field_names() {
        let cat = catalog(vec![summary("a")], vec![detail("a")]);
        let json = serde_json::to_value(&cat).unwrap();
        assert!(json.get("generatedAt").is_some());
        assert!(json["summaries"][0].get("displayName").is_some());
        assert_eq!(json["details"]["a"]["connections"][0]["kind"], "stdio");
        assert!(json["details"]["a"].get("securityFlags").is_none());

        let back: Catalog = serde_json::from_value(json).unwrap();
        assert_eq!(back, cat);
    }
}
