//! # MCP Catalog Core
//!
//! Shared, I/O-free logic for MCP Catalog: the catalog data model,
//! identity resolution, trust classification, multi-source aggregation,
//! and the search engine.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! runtime-specific dependencies. Remote signals (repository popularity)
//! arrive through the [`popularity::PopularityProvider`] trait, which the
//! application crate implements.
//!
//! ## Pipeline
//!
//! ```text
//! structured records ─┐
//!                     ├─▶ Aggregator ─▶ Catalog ─▶ CatalogHandle ─▶ search / get_detail
//! search records ─────┘        ▲
//!                              │
//!                 curated list + popularity
//! ```

pub mod aggregate;
pub mod error;
pub mod identity;
pub mod models;
pub mod popularity;
pub mod records;
pub mod search;
pub mod snapshot;
pub mod trust;

pub use error::{CatalogError, Result};
pub use models::{Capability, Catalog, CatalogDetail, CatalogSummary, ConnectionKind, ConnectionSpec};
