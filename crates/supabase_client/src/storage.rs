use anyhow::{Context, Result};
use async_trait::async_trait;
use core_types::{FileUpload, ObjectStorage};
use tracing::debug;

use crate::Platform;
use crate::error::ensure_success;

/// Bucket object storage over `/storage/v1`.
#[derive(Debug, Clone)]
pub struct StorageApi {
    platform: Platform,
}

impl StorageApi {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl ObjectStorage for StorageApi {
    async fn upload(&self, bucket: &str, path: &str, file: &FileUpload) -> Result<()> {
        let url = self
            .platform
            .url(&format!("storage/v1/object/{bucket}/{}", path.trim_start_matches('/')))?;
        debug!(bucket, path, bytes = file.size(), "uploading object");
        let response = self
            .platform
            .authorize(self.platform.http.post(url))
            .header(reqwest::header::CONTENT_TYPE, &file.content_type)
            .header("x-upsert", "false")
            .body(file.bytes.clone())
            .send()
            .await
            .context("failed to reach storage service")?;
        ensure_success(response, "upload").await?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let url = self.platform.url(&format!("storage/v1/object/{bucket}"))?;
        debug!(bucket, count = paths.len(), "removing objects");
        let response = self
            .platform
            .authorize(self.platform.http.delete(url))
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await
            .context("failed to reach storage service")?;
        ensure_success(response, "remove").await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.platform
            .url(&format!(
                "storage/v1/object/public/{bucket}/{}",
                path.trim_start_matches('/')
            ))
            .map(|url| url.to_string())
            .unwrap_or_default()
    }
}
