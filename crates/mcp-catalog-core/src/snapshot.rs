//! Atomically swappable catalog snapshot.
//!
//! Readers take an `Arc<Catalog>` and query it without holding the lock, so
//! an in-flight query keeps seeing the snapshot it started with while a
//! reload swaps in the next one.

use std::sync::{Arc, RwLock};
use tracing::info;

use crate::error::Result;
use crate::models::Catalog;

/// Shared handle to the live catalog.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    inner: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    /// Wrap a validated catalog.
    pub fn new(catalog: Catalog) -> Result<Self> {
        catalog.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(Arc::new(catalog))),
        })
    }

    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(Catalog::empty()))),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn current(&self) -> Arc<Catalog> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Validate `catalog` and make it current, returning the previous snapshot.
    ///
    /// An invalid catalog leaves the current snapshot in place.
    pub fn replace(&self, catalog: Catalog) -> Result<Arc<Catalog>> {
        catalog.validate()?;
        let next = Arc::new(catalog);
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, next);
        info!(
            servers = guard.len(),
            generated_at = %guard.generated_at,
            "catalog snapshot replaced"
        );
        Ok(previous)
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::models::{CatalogDetail, CatalogSummary, ConnectionSpec};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn one(id: &str) -> Catalog {
        let summary = CatalogSummary {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            verified: true,
            popularity: 1,
            remote: false,
            homepage: String::new(),
        };
        let detail = CatalogDetail {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            remote: false,
            connections: vec![ConnectionSpec::stdio(None)],
            capabilities: Vec::new(),
            security_flags: None,
        };
        Catalog {
            generated_at: Utc::now(),
            summaries: vec![summary],
            details: BTreeMap::from([(id.to_string(), detail)]),
        }
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let handle = CatalogHandle::new(one("a")).unwrap();
        let before = handle.current();

        let previous = handle.replace(one("b")).unwrap();
        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.summaries[0].id, "a");
        assert_eq!(handle.current().summaries[0].id, "b");
    }

    #[test]
    fn test_invalid_catalog_is_rejected() {
        let handle = CatalogHandle::new(one("a")).unwrap();
        let mut broken = one("b");
        broken.details.clear();

        let err = handle.replace(broken).unwrap_err();
        assert!(matches!(err, CatalogError::SchemaViolation(_)));
        assert_eq!(handle.current().summaries[0].id, "a");
    }

    #[test]
    fn test_clones_share_the_snapshot() {
        let handle = CatalogHandle::empty();
        let other = handle.clone();
        assert!(handle.current().is_empty());
        other.replace(one("x")).unwrap();
        assert_eq!(handle.current().len(), 1);
    }
}
