//! `mcpcat get`: server detail lookup against the stored catalog file.

use anyhow::Result;
use mcp_catalog_core::search::get_detail;
use mcp_catalog_core::{CatalogDetail, CatalogError, ConnectionKind};

use crate::config::Config;
use crate::store;

/// Look up one server in the stored catalog.
pub fn get_server(config: &Config, id: &str) -> Result<CatalogDetail> {
    let catalog = store::load_catalog(&config.catalog.path)?;
    Ok(get_detail(&catalog, id)?.clone())
}

/// CLI entry point: prints the detail, or exits 1 when the id is unknown.
pub fn run_get(config: &Config, id: &str, json: bool) -> Result<()> {
    let detail = match get_server(config, id) {
        Ok(d) => d,
        Err(e) if matches!(e.downcast_ref::<CatalogError>(), Some(CatalogError::NotFound(_))) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("--- Server ---");
    println!("id:           {}", detail.id);
    println!("name:         {}", detail.display_name);
    println!("description:  {}", detail.description);
    println!("remote:       {}", detail.remote);
    if let Some(flags) = &detail.security_flags {
        let rendered: Vec<String> = flags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("security:     {}", rendered.join(", "));
    }
    println!();

    println!("--- Connections ({}) ---", detail.connections.len());
    for conn in &detail.connections {
        match conn.kind {
            ConnectionKind::Stdio => {
                println!("[stdio] {}", conn.launch_command.as_deref().unwrap_or("(no launch command)"))
            }
            ConnectionKind::Http => {
                println!("[http] {}", conn.remote_url.as_deref().unwrap_or("(no url)"))
            }
        }
    }

    if !detail.capabilities.is_empty() {
        println!();
        println!("--- Capabilities ({}) ---", detail.capabilities.len());
        for cap in &detail.capabilities {
            println!("{}: {}", cap.name, cap.description);
        }
    }

    Ok(())
}
