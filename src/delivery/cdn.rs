use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::MapError;

#[async_trait]
pub trait MapUploader: Send + Sync {
    /// Publishes the file and returns a URL the chat provider can fetch.
    async fn upload(&self, path: &Path) -> Result<String, MapError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Multipart upload to a file CDN that answers with `{"url": "..."}`.
#[derive(Clone)]
pub struct CdnUploader {
    client: Client,
    upload_url: String,
}

impl CdnUploader {
    pub fn new(upload_url: &str) -> Result<Self, MapError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            upload_url: upload_url.to_string(),
        })
    }
}

#[async_trait]
impl MapUploader for CdnUploader {
    async fn upload(&self, path: &Path) -> Result<String, MapError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "aircraft-map.png".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")?;
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(MapError::UploadStatus(resp.status().as_u16()));
        }

        let body: UploadResponse = resp.json().await?;
        Ok(body.url)
    }
}
