//! Diagnostic logging setup.
//!
//! Logs go to stderr so that stdout carries only command output
//! (search tables, JSON details, build summaries).

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,mcp_catalog=info,mcp_catalog_core=info";

/// Install the global subscriber.
///
/// `verbosity` counts `-v` flags: 1 enables debug output for this crate,
/// 2 or more enables trace. Without flags `RUST_LOG` is honored, falling
/// back to `info`.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let env_filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        1 => EnvFilter::try_new("info,mcp_catalog=debug,mcp_catalog_core=debug")?,
        _ => EnvFilter::try_new("debug,mcp_catalog=trace,mcp_catalog_core=trace")?,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
