//! # MCP Catalog CLI (`mcpcat`)
//!
//! Builds the catalog from its sources, queries it, and serves it over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! mcpcat --config ./config/mcpcat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mcpcat build` | Fetch sources, aggregate, and write the catalog |
//! | `mcpcat search "<query>"` | Search the catalog |
//! | `mcpcat get <id>` | Show one server |
//! | `mcpcat sources` | List configured sources and their status |
//! | `mcpcat serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use mcp_catalog::{build_cmd, config, get, logging, search, server, sources};
use mcp_catalog_core::search::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;

/// MCP Catalog CLI: an aggregated, searchable catalog of Model Context
/// Protocol servers.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without the file, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "mcpcat",
    about = "MCP Catalog: an aggregated, searchable catalog of Model Context Protocol servers",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mcpcat.toml")]
    config: PathBuf,

    /// Increase log verbosity (`-v` debug, `-vv` trace). Logs go to stderr.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog.
    ///
    /// Fetches the structured registry and the repository search, merges
    /// them into one record per server, and writes the catalog file
    /// atomically.
    Build {
        /// Build and report without writing the catalog file.
        #[arg(long)]
        dry_run: bool,

        /// Read only local sources and skip all GitHub requests.
        #[arg(long)]
        offline: bool,
    },

    /// Search the catalog.
    Search {
        /// Free-text query matched against id, name, and description.
        #[arg(default_value = "")]
        query: String,

        /// Only verified (`true`) or unverified (`false`) servers.
        #[arg(long)]
        verified: Option<bool>,

        /// Maximum number of results (1-100).
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Print the result page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one server by id.
    Get {
        /// Server id (case-insensitive).
        id: String,

        /// Print the detail as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List configured sources and their status.
    Sources,

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves the catalog file at
    /// `[catalog].path`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Build { dry_run, offline } => {
            build_cmd::run_build(&cfg, dry_run, offline).await?;
        }
        Commands::Search {
            query,
            verified,
            page_size,
            json,
        } => {
            search::run_search(&cfg, &query, verified, page_size, json)?;
        }
        Commands::Get { id, json } => {
            get::run_get(&cfg, &id, json)?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
