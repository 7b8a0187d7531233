//! Dropbox-backed blob store.
//!
//! One named blob per job state document, whole-document replace on write.
//! Single-writer assumption: no conditional writes, no revision checks. The
//! external scheduler guarantees one in-flight run per job.

use async_trait::async_trait;
use mailclerk_core::config::DropboxConfig;
use mailclerk_core::{ClerkError, Outcome};

/// Raw text blob access, expected to hold JSON documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, path: &str) -> Outcome<String>;
    async fn write(&self, path: &str, content: &str) -> Outcome<()>;
}

/// Dropbox HTTP API v2 content endpoints.
pub struct DropboxClient {
    config: DropboxConfig,
    http: reqwest::Client,
}

impl DropboxClient {
    pub fn new(config: DropboxConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn api_arg(path: &str, upload: bool) -> String {
        if upload {
            serde_json::json!({ "path": path, "mode": "overwrite", "mute": true }).to_string()
        } else {
            serde_json::json!({ "path": path }).to_string()
        }
    }
}

#[async_trait]
impl BlobStore for DropboxClient {
    async fn read(&self, path: &str) -> Outcome<String> {
        let resp = self
            .http
            .post(format!("{}/2/files/download", self.config.api_base))
            .bearer_auth(&self.config.access_token)
            .header("Dropbox-API-Arg", Self::api_arg(path, false))
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| ClerkError::store(format!("download {path}: {e}")))?;

        if !resp.status().is_success() {
            return Err(ClerkError::store(format!(
                "download {path}: HTTP {}",
                resp.status()
            )));
        }
        let content = resp
            .text()
            .await
            .map_err(|e| ClerkError::store(format!("download {path}: {e}")))?;
        tracing::debug!(path, bytes = content.len(), "downloaded blob");
        Ok(content)
    }

    async fn write(&self, path: &str, content: &str) -> Outcome<()> {
        let resp = self
            .http
            .post(format!("{}/2/files/upload", self.config.api_base))
            .bearer_auth(&self.config.access_token)
            .header("Dropbox-API-Arg", Self::api_arg(path, true))
            .header("Content-Type", "application/octet-stream")
            .body(content.to_string())
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| ClerkError::store(format!("upload {path}: {e}")))?;

        if !resp.status().is_success() {
            return Err(ClerkError::store(format!(
                "upload {path}: HTTP {}",
                resp.status()
            )));
        }
        tracing::debug!(path, bytes = content.len(), "uploaded blob");
        Ok(())
    }
}
