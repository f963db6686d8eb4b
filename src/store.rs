//! Catalog persistence.
//!
//! The catalog is one pretty-printed JSON file. Writes go to a sibling temp
//! file that is renamed over the target, so readers (including a running
//! server reloading the file) never observe a partial catalog.

use anyhow::{Context, Result};
use mcp_catalog_core::Catalog;
use std::path::Path;

/// Read and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    let catalog: Catalog = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
    catalog
        .validate()
        .with_context(|| format!("Invalid catalog: {}", path.display()))?;
    Ok(catalog)
}

/// Validate and atomically write a catalog file, creating parent directories.
pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    catalog.validate()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(catalog)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    std::fs::write(tmp_path, json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(tmp_path, path)
        .with_context(|| format!("Failed to replace catalog: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mcp_catalog_core::{CatalogDetail, CatalogSummary, ConnectionSpec};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample() -> Catalog {
        let summary = CatalogSummary {
            id: "notion".to_string(),
            display_name: "Notion".to_string(),
            description: "Pages".to_string(),
            verified: true,
            popularity: 3,
            remote: false,
            homepage: "https://github.com/makenotion/notion-mcp-server".to_string(),
        };
        let detail = CatalogDetail {
            id: "notion".to_string(),
            display_name: "Notion".to_string(),
            description: "Pages".to_string(),
            remote: false,
            connections: vec![ConnectionSpec::stdio(Some("docker run -i mcp/notion".to_string()))],
            capabilities: Vec::new(),
            security_flags: None,
        };
        Catalog {
            generated_at: Utc::now(),
            summaries: vec![summary],
            details: BTreeMap::from([("notion".to_string(), detail)]),
        }
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/catalog.json");
        let catalog = sample();

        save_catalog(&path, &catalog).unwrap();
        assert!(!tmp.path().join("nested/dir/catalog.json.tmp").exists());
        assert_eq!(load_catalog(&path).unwrap(), catalog);
    }

    #[test]
    fn test_save_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.json");
        save_catalog(&path, &Catalog::empty()).unwrap();
        save_catalog(&path, &sample()).unwrap();
        assert_eq!(load_catalog(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_catalog_is_not_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.json");
        let mut broken = sample();
        broken.details.clear();
        assert!(save_catalog(&path, &broken).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_inconsistent_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.json");
        let mut broken = sample();
        broken.details.clear();
        std::fs::write(&path, serde_json::to_string(&broken).unwrap()).unwrap();
        let err = load_catalog(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("no detail"));
    }
}
