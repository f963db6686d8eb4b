use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mcpcat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mcpcat");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    // Structured records, one directory per server
    let redis_dir = root.join("servers").join("redis");
    fs::create_dir_all(&redis_dir).unwrap();
    fs::write(
        redis_dir.join("server.yaml"),
        r#"name: redis
about:
  title: Redis
  description: Redis MCP server
source:
  project: https://github.com/redis/mcp-redis
image: mcp/redis
"#,
    )
    .unwrap();

    let fetch_dir = root.join("servers").join("fetch");
    fs::create_dir_all(&fetch_dir).unwrap();
    fs::write(
        fetch_dir.join("server.yaml"),
        r#"about:
  title: Fetch
  description: Fetch web pages as markdown
source:
  project: https://github.com/someone/fetcher
config:
  url: https://fetch.example.com/mcp
"#,
    )
    .unwrap();

    // Repository search results
    fs::write(
        root.join("search.json"),
        r#"[
  {"fullName": "redis/mcp-redis", "description": "Official Redis MCP server", "stargazersCount": 500, "url": "https://github.com/redis/mcp-redis"},
  {"fullName": "jane/notes-mcp-server", "description": "Take notes from your assistant", "stargazersCount": 42}
]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[catalog]
path = "{root}/data/catalog.json"

[sources.registry]
enabled = false

[sources.search]
enabled = false

[sources.local]
servers_dir = "{root}/servers"
search_results = "{root}/search.json"

[popularity]
provider = "disabled"

[curated]
include_builtin = false

[curated.entries]
acme = "acme-corp/tools"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("mcpcat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_mcpcat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mcpcat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mcpcat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn build(config_path: &Path) {
    let (stdout, stderr, success) = run_mcpcat(config_path, &["build", "--offline"]);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
}

fn result_ids(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_build_offline_writes_catalog() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mcpcat(&config_path, &["build", "--offline"]);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("local-servers (structured): 2 fetched, 2 accepted, 0 malformed"));
    assert!(stdout.contains("local-search (search): 2 fetched, 2 accepted, 0 malformed"));
    assert!(stdout.contains(&format!("[{}]", tmp.path().join("servers").display())));
    assert!(stdout.contains("servers: 4"));
    assert!(stdout.contains("verified: 2"));
    assert!(stdout.contains("remote: 1"));
    assert!(stdout.contains("curated backfill: 1"));
    assert!(stdout.contains("ok"));
    assert!(tmp.path().join("data/catalog.json").exists());
}

#[test]
fn test_build_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_mcpcat(&config_path, &["build", "--offline", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("build (dry-run)"));
    assert!(stdout.contains("servers: 4"));
    assert!(!tmp.path().join("data/catalog.json").exists());
}

#[test]
fn test_build_twice_is_stable() {
    let (tmp, config_path) = setup_test_env();
    let catalog_path = tmp.path().join("data/catalog.json");

    build(&config_path);
    let first: Value = serde_json::from_str(&fs::read_to_string(&catalog_path).unwrap()).unwrap();
    build(&config_path);
    let second: Value = serde_json::from_str(&fs::read_to_string(&catalog_path).unwrap()).unwrap();

    assert_eq!(first["summaries"], second["summaries"]);
    assert_eq!(first["details"], second["details"]);
}

#[test]
fn test_search_orders_verified_then_popularity() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, stderr, success) = run_mcpcat(&config_path, &["search", "--json"]);
    assert!(success, "search failed: {}", stderr);
    let page: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["total"], 4);
    assert_eq!(result_ids(&page), vec!["redis", "acme", "notes", "fetch"]);
}

#[test]
fn test_search_more_popular_search_record_wins() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_mcpcat(&config_path, &["search", "redis", "--json"]);
    assert!(success);
    let page: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["total"], 1);
    let redis = &page["results"][0];
    assert_eq!(redis["id"], "redis");
    assert_eq!(redis["popularity"], 500);
    assert_eq!(redis["verified"], true);
    assert_eq!(redis["description"], "Official Redis MCP server");
}

#[test]
fn test_search_text_output() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_mcpcat(&config_path, &["search", "redis"]);
    assert!(success);
    assert!(stdout.contains("1. redis / Redis [verified]"));
    assert!(stdout.contains("stars: 500"));
    assert!(stdout.contains("showing 1 of 1"));

    let (stdout, _, success) = run_mcpcat(&config_path, &["search", "nothing-matches-this"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_verified_filter() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) =
        run_mcpcat(&config_path, &["search", "--verified", "false", "--json"]);
    assert!(success);
    let page: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result_ids(&page), vec!["notes", "fetch"]);
}

#[test]
fn test_search_page_size_limits_results_not_total() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) =
        run_mcpcat(&config_path, &["search", "--page-size", "2", "--json"]);
    assert!(success);
    let page: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["total"], 4);
    assert_eq!(result_ids(&page), vec!["redis", "acme"]);
}

#[test]
fn test_search_rejects_zero_page_size() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (_, stderr, success) = run_mcpcat(&config_path, &["search", "--page-size", "0"]);
    assert!(!success);
    assert!(stderr.contains("invalid request"));
}

#[test]
fn test_search_without_catalog_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_mcpcat(&config_path, &["search", "redis"]);
    assert!(!success);
}

#[test]
fn test_get_is_case_insensitive() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, stderr, success) = run_mcpcat(&config_path, &["get", "REDIS", "--json"]);
    assert!(success, "get failed: {}", stderr);
    let detail: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(detail["id"], "redis");
    assert_eq!(detail["displayName"], "Redis");
}

#[test]
fn test_get_shows_remote_connection() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_mcpcat(&config_path, &["get", "fetch"]);
    assert!(success);
    assert!(stdout.contains("id:           fetch"));
    assert!(stdout.contains("remote:       true"));
    assert!(stdout.contains("security:     scanPassed=true"));
    assert!(stdout.contains("[http] https://fetch.example.com/mcp"));
}

#[test]
fn test_get_curated_backfill() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (stdout, _, success) = run_mcpcat(&config_path, &["get", "acme", "--json"]);
    assert!(success);
    let detail: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(detail["description"], "Official MCP server from acme-corp");
    assert!(detail.get("securityFlags").is_none());
}

#[test]
fn test_get_unknown_id_exits_nonzero() {
    let (_tmp, config_path) = setup_test_env();
    build(&config_path);

    let (_, stderr, success) = run_mcpcat(&config_path, &["get", "does-not-exist"]);
    assert!(!success);
    assert!(stderr.contains("server not found: does-not-exist"));
}

#[test]
fn test_sources_lists_configuration() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_mcpcat(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("registry"));
    assert!(stdout.contains("DISABLED"));
    assert!(stdout.contains("local-servers"));
    assert!(stdout.contains("popularity: disabled"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("mcpcat.toml");
    fs::write(&config_path, "[popularity]\nprovider = \"stars-r-us\"\n").unwrap();

    let (_, stderr, success) = run_mcpcat(&config_path, &["sources"]);
    assert!(!success);
    assert!(stderr.contains("Unknown popularity provider"));
}
