//! Integration tests for the server startup / shutdown lifecycle.
//!
//! Each test spins up a real relay server on an ephemeral port via
//! [`run_server_with_config`], exercises the download surface over HTTP,
//! and shuts it down cleanly.

use std::sync::Arc;
use std::time::Duration;

use linkdrop::links::{LinkRegistry, RegistryConfig};
use linkdrop::server::{run_server_with_config, ServerConfig, ServerHandle};
use tempfile::TempDir;

/// Build a registry backed by a temp directory.
fn test_registry(dir: &TempDir, ttl: Duration) -> Arc<LinkRegistry> {
    Arc::new(
        LinkRegistry::new(RegistryConfig {
            storage_dir: dir.path().to_path_buf(),
            ttl,
            sweep_interval: Duration::from_secs(60),
        })
        .unwrap(),
    )
}

/// Spin up a lightweight test server on an ephemeral port.
async fn start_test_server(registry: Arc<LinkRegistry>) -> ServerHandle {
    let config = ServerConfig::for_testing(registry);
    run_server_with_config(config).await.unwrap()
}

/// Write `content` into the storage dir and register it, returning the token.
fn store_and_register(registry: &LinkRegistry, name: &str, content: &[u8]) -> String {
    let path = registry.storage_dir().join(format!("1_{name}"));
    std::fs::write(&path, content).unwrap();
    registry
        .register(1, name, path, content.len() as u64)
        .unwrap()
}

// ---------------------------------------------------------------------------
// 1. Server starts and binds to a real port
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_starts_and_binds() {
    let dir = TempDir::new().unwrap();
    let handle = start_test_server(test_registry(&dir, Duration::from_secs(60))).await;
    assert_ne!(handle.port(), 0, "OS should assign a non-zero port");
    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// 2. Health endpoint reports status and live record count
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_endpoint_responds() {
    let dir = TempDir::new().unwrap();
    let registry = test_registry(&dir, Duration::from_secs(60));
    store_and_register(&registry, "report.pdf", b"pdf bytes");

    let handle = start_test_server(registry).await;
    let url = format!("{}/health", handle.base_url());

    let resp = reqwest::get(&url).await.expect("GET /health failed");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["recordCount"], 1);

    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// 3. Root banner identifies the service
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_root_banner() {
    let dir = TempDir::new().unwrap();
    let handle = start_test_server(test_registry(&dir, Duration::from_secs(60))).await;

    let resp = reqwest::get(handle.base_url()).await.expect("GET / failed");
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "linkdrop");
    assert!(
        body.get("version").is_some(),
        "response should include version"
    );

    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// 4. Registered file downloads with attachment headers and exact bytes
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_download_roundtrip() {
    let dir = TempDir::new().unwrap();
    let registry = test_registry(&dir, Duration::from_secs(60));
    let token = store_and_register(&registry, "ab.txt", b"0123456789");

    let handle = start_test_server(registry).await;
    let url = format!("{}/download/{}", handle.base_url(), token);

    let resp = reqwest::get(&url).await.expect("GET /download failed");
    assert_eq!(resp.status(), 200);

    let headers = resp.headers();
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert_eq!(headers.get("content-length").unwrap(), "10");
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "attachment; filename=\"ab.txt\""
    );
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");

    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], b"0123456789");

    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// 5. Unknown token returns 404 with a JSON error body
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_token_returns_404() {
    let dir = TempDir::new().unwrap();
    let handle = start_test_server(test_registry(&dir, Duration::from_secs(60))).await;
    let url = format!("{}/download/AAAAAAAAAAAAAAAAAAAAAA", handle.base_url());

    let resp = reqwest::get(&url).await.expect("GET /download failed");
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// 6. A record whose backing file vanished is dropped on first access
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_file_drops_record() {
    let dir = TempDir::new().unwrap();
    let registry = test_registry(&dir, Duration::from_secs(60));
    let token = store_and_register(&registry, "gone.bin", b"soon deleted");
    std::fs::remove_file(registry.storage_dir().join("1_gone.bin")).unwrap();

    let handle = start_test_server(registry.clone()).await;
    let url = format!("{}/download/{}", handle.base_url(), token);

    let resp = reqwest::get(&url).await.expect("GET /download failed");
    assert_eq!(resp.status(), 404);
    assert_eq!(registry.len(), 0, "dangling record should be dropped");

    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// 7. Expired link returns 404 even before the sweeper runs
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_expired_link_returns_404() {
    let dir = TempDir::new().unwrap();
    let registry = test_registry(&dir, Duration::from_millis(50));
    let token = store_and_register(&registry, "fleeting.txt", b"short-lived");

    let handle = start_test_server(registry).await;
    let url = format!("{}/download/{}", handle.base_url(), token);

    tokio::time::sleep(Duration::from_millis(120)).await;

    let resp = reqwest::get(&url).await.expect("GET /download failed");
    assert_eq!(resp.status(), 404);

    handle.shutdown().await;
}

// ---------------------------------------------------------------------------
// 8. Graceful shutdown completes within a reasonable timeout
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_graceful_shutdown_completes() {
    let dir = TempDir::new().unwrap();
    let handle = start_test_server(test_registry(&dir, Duration::from_secs(60))).await;
    let url = format!("{}/health", handle.base_url());

    // Verify the server is alive
    let resp = reqwest::get(&url).await.expect("GET /health failed");
    assert_eq!(resp.status(), 200);

    // Shutdown should complete within 5 seconds
    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("Shutdown did not complete within 5s");
}

// ---------------------------------------------------------------------------
// 9. Server is unreachable after shutdown
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_unreachable_after_shutdown() {
    let dir = TempDir::new().unwrap();
    let handle = start_test_server(test_registry(&dir, Duration::from_secs(60))).await;
    let url = format!("{}/health", handle.base_url());

    // Confirm alive
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 200);

    // Shut down
    handle.shutdown().await;

    // After shutdown, connecting should fail
    let result = reqwest::get(&url).await;
    assert!(result.is_err(), "Expected connection error after shutdown");
}
