//! # MCP Catalog
//!
//! An aggregated, searchable catalog of Model Context Protocol servers.
//!
//! MCP Catalog pulls server descriptions from a structured registry
//! repository and from a GitHub repository search, resolves both onto one
//! canonical id per server, classifies which servers are officially
//! published, and serves the result through a CLI and an HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Sources    │──▶│  Aggregator  │──▶│ catalog.json │
//! │ GitHub/Local │   │ (core crate) │   │   (atomic)   │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!                         ┌────────────────────┤
//!                         ▼                    ▼
//!                    ┌──────────┐        ┌──────────┐
//!                    │   CLI    │        │   HTTP   │
//!                    │ (mcpcat) │        │ /servers │
//!                    └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mcpcat build                      # fetch sources, write the catalog
//! mcpcat build --offline            # local inputs only
//! mcpcat search redis --verified true
//! mcpcat get github
//! mcpcat serve                      # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`github`] | GitHub REST client and popularity provider |
//! | [`sources`] | Record sources and collection |
//! | [`build_cmd`] | Build pipeline |
//! | [`store`] | Catalog persistence |
//! | [`search`] | CLI search |
//! | [`get`] | CLI detail lookup |
//! | [`server`] | HTTP server |

pub mod build_cmd;
pub mod config;
pub mod get;
pub mod github;
pub mod logging;
pub mod search;
pub mod server;
pub mod sources;
pub mod store;
