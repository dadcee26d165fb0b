use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config file pointing the backend at `base_url`
#[allow(dead_code)]
pub fn backend_config_file(base_url: &str) -> (TempDir, PathBuf) {
    temp_config_file(&format!(
        "backend:\n  base_url: {}\n  timeout_seconds: 5\n",
        base_url
    ))
}

/// Decodes the JSON bodies of every request with a body the mock server saw at `path`
#[allow(dead_code)]
pub async fn request_bodies(server: &wiremock::MockServer, path: &str) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == path && !r.body.is_empty())
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}
