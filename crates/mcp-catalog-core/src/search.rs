//! Read-side query engine over a catalog snapshot.
//!
//! Queries never mutate the catalog; they borrow a snapshot and return
//! clones of the matching summaries.
//!
//! # Ranking
//!
//! 1. Normalize the query (trim, lowercase).
//! 2. Keep summaries whose id, display name, or description contains it
//!    (an empty query keeps everything).
//! 3. Apply the `verified` filter when given.
//! 4. Sort by verified (desc), exact id match (desc), popularity (desc),
//!    id (asc).
//! 5. Count, then truncate to the page size.

use serde::Serialize;

use crate::error::{CatalogError, Result};
use crate::models::{Catalog, CatalogDetail, CatalogSummary};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Inputs for a single search.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    /// Free-text query; empty matches everything.
    pub query: &'a str,
    /// Only verified (`Some(true)`) or unverified (`Some(false)`) servers.
    pub verified: Option<bool>,
    /// Maximum results returned, in `[1, MAX_PAGE_SIZE]`.
    pub page_size: usize,
}

impl<'a> SearchRequest<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            verified: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of ranked results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub results: Vec<CatalogSummary>,
    /// Matches before truncation.
    pub total: usize,
}

pub fn search(catalog: &Catalog, request: &SearchRequest<'_>) -> Result<SearchPage> {
    if request.page_size == 0 || request.page_size > MAX_PAGE_SIZE {
        return Err(CatalogError::InvalidRequest(format!(
            "page size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, request.page_size
        )));
    }

    let query = request.query.trim().to_lowercase();
    let mut matches: Vec<&CatalogSummary> = catalog
        .summaries
        .iter()
        .filter(|s| query.is_empty() || matches_query(s, &query))
        .filter(|s| request.verified.map_or(true, |v| s.verified == v))
        .collect();

    matches.sort_by(|a, b| {
        let a_exact = !query.is_empty() && a.id.to_lowercase() == query;
        let b_exact = !query.is_empty() && b.id.to_lowercase() == query;
        b.verified
            .cmp(&a.verified)
            .then(b_exact.cmp(&a_exact))
            .then(b.popularity.cmp(&a.popularity))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = matches.len();
    let results = matches
        .into_iter()
        .take(request.page_size)
        .cloned()
        .collect();
    Ok(SearchPage { results, total })
}

fn matches_query(summary: &CatalogSummary, query: &str) -> bool {
    summary.id.to_lowercase().contains(query)
        || summary.display_name.to_lowercase().contains(query)
        || summary.description.to_lowercase().contains(query)
}

/// Look up one server: exact id first, then the first case-insensitive match.
pub fn get_detail<'c>(catalog: &'c Catalog, id: &str) -> Result<&'c CatalogDetail> {
    if let Some(detail) = catalog.details.get(id) {
        return Ok(detail);
    }
    let wanted = id.to_lowercase();
    catalog
        .details
        .iter()
        .find(|(key, _)| key.to_lowercase() == wanted)
        .map(|(_, detail)| detail)
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionSpec;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn entry(id: &str, verified: bool, popularity: u64, description: &str) -> (CatalogSummary, CatalogDetail) {
        let summary = CatalogSummary {
            id: id.to_string(),
            display_name: id.to_string(),
            description: description.to_string(),
            verified,
            popularity,
            remote: false,
            homepage: format!("https://github.com/{id}/{id}"),
        };
        let detail = CatalogDetail {
            id: id.to_string(),
            display_name: id.to_string(),
            description: description.to_string(),
            remote: false,
            connections: vec![ConnectionSpec::stdio(None)],
            capabilities: Vec::new(),
            security_flags: None,
        };
        (summary, detail)
    }

    fn catalog(entries: Vec<(CatalogSummary, CatalogDetail)>) -> Catalog {
        let mut summaries = Vec::new();
        let mut details = BTreeMap::new();
        for (s, d) in entries {
            details.insert(d.id.clone(), d);
            summaries.push(s);
        }
        Catalog {
            generated_at: Utc::now(),
            summaries,
            details,
        }
    }

    fn ids(page: &SearchPage) -> Vec<&str> {
        page.results.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_verified_exact_match_outranks_popular_partial() {
        let c = catalog(vec![
            entry("acme-tools", false, 500, "tools for acme"),
            entry("acme", true, 5, "the acme server"),
        ]);
        let page = search(&c, &SearchRequest::new("acme")).unwrap();
        assert_eq!(ids(&page), vec!["acme", "acme-tools"]);
    }

    #[test]
    fn test_exact_match_breaks_popularity_within_tier() {
        let c = catalog(vec![
            entry("acme-tools", true, 500, ""),
            entry("acme", true, 5, ""),
        ]);
        let page = search(&c, &SearchRequest::new("  ACME ")).unwrap();
        assert_eq!(ids(&page), vec!["acme", "acme-tools"]);
    }

    #[test]
    fn test_query_matches_description() {
        let c = catalog(vec![
            entry("notion", true, 1, "Pages and databases"),
            entry("redis", true, 1, "Key value store"),
        ]);
        let page = search(&c, &SearchRequest::new("database")).unwrap();
        assert_eq!(ids(&page), vec!["notion"]);
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_empty_query_returns_everything_ranked() {
        let c = catalog(vec![
            entry("b", false, 10, ""),
            entry("a", true, 1, ""),
            entry("c", false, 10, ""),
        ]);
        let page = search(&c, &SearchRequest::new("")).unwrap();
        assert_eq!(ids(&page), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_verified_filter() {
        let c = catalog(vec![entry("a", true, 1, ""), entry("b", false, 1, "")]);
        let mut request = SearchRequest::new("");
        request.verified = Some(false);
        assert_eq!(ids(&search(&c, &request).unwrap()), vec!["b"]);
        request.verified = Some(true);
        assert_eq!(ids(&search(&c, &request).unwrap()), vec!["a"]);
    }

    #[test]
    fn test_total_counts_before_truncation() {
        let entries = (0..30).map(|i| entry(&format!("srv-{i:02}"), false, i, "")).collect();
        let c = catalog(entries);
        let mut request = SearchRequest::new("srv");
        request.page_size = 5;
        let page = search(&c, &request).unwrap();
        assert_eq!(page.results.len(), 5);
        assert_eq!(page.total, 30);
        assert_eq!(page.results[0].id, "srv-29");
    }

    #[test]
    fn test_page_size_out_of_range() {
        let c = catalog(vec![entry("a", true, 1, "")]);
        for size in [0, MAX_PAGE_SIZE + 1] {
            let mut request = SearchRequest::new("");
            request.page_size = size;
            assert!(matches!(
                search(&c, &request),
                Err(CatalogError::InvalidRequest(_))
            ));
        }
        let mut request = SearchRequest::new("");
        request.page_size = MAX_PAGE_SIZE;
        assert!(search(&c, &request).is_ok());
    }

    #[test]
    fn test_get_detail_exact_and_case_insensitive() {
        let c = catalog(vec![entry("acme", true, 1, "")]);
        assert_eq!(get_detail(&c, "acme").unwrap().id, "acme");
        assert_eq!(get_detail(&c, "ACME").unwrap().id, "acme");
    }

    #[test]
    fn test_get_detail_prefers_exact_key() {
        let c = catalog(vec![entry("Acme", false, 1, ""), entry("acme", true, 1, "")]);
        assert_eq!(get_detail(&c, "acme").unwrap().id, "acme");
        assert_eq!(get_detail(&c, "Acme").unwrap().id, "Acme");
        // "ACME" falls back to the first key in order: "Acme" < "acme".
        assert_eq!(get_detail(&c, "ACME").unwrap().id, "Acme");
    }

    #[test]
    fn test_get_detail_not_found() {
        let c = catalog(vec![entry("acme", true, 1, "")]);
        let err = get_detail(&c, "nope").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref id) if id == "nope"));
    }
}
