use std::path::Path;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ArchiveConfig;
use crate::error::{AppError, AppResult};

/// Google Drive storage for uploaded PDFs.
///
/// The access token is supplied by configuration; obtaining and refreshing it
/// happens outside the service.
#[derive(Debug, Clone)]
pub struct DocumentArchive {
    config: ArchiveConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: Option<String>,
}

impl DocumentArchive {
    pub fn new(config: ArchiveConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to create archive HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Uploads the PDF at `path` as `file_name` and returns the new file id.
    pub async fn upload(&self, path: &Path, file_name: &str) -> AppResult<String> {
        let content = tokio::fs::read(path).await?;
        let mut metadata = json!({ "name": file_name });
        if let Some(folder_id) = &self.config.folder_id {
            metadata["parents"] = json!([folder_id]);
        }

        let boundary = format!("pdfchat-{}", Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata.to_string(), &content);

        let response = self
            .client
            .post(&self.config.upload_url)
            .bearer_auth(&self.config.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::archive(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Document archive rejected the upload");
            return Err(AppError::archive(format!("Upload failed with HTTP {}: {}", status, text)));
        }

        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| AppError::archive(format!("Invalid upload response: {}", e)))?;
        let id = created
            .id
            .ok_or_else(|| AppError::archive("Upload response carried no file id"))?;

        info!(file_id = %id, file_name = file_name, bytes = content.len(), "Document archived");
        Ok(id)
    }

    /// Downloads the archived file `file_id` into `destination`.
    pub async fn download(&self, file_id: &str, destination: &Path) -> AppResult<u64> {
        let url = format!("{}/{}", self.config.files_url.trim_end_matches('/'), file_id);
        let response = self
            .client
            .get(&url)
            .query(&[("alt", "media")])
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| AppError::archive(format!("Download request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, file_id = file_id, "Document archive download failed");
            return Err(AppError::archive(format!("Download failed with HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::archive(format!("Download interrupted: {}", e)))?;
        tokio::fs::write(destination, &bytes).await?;

        debug!(file_id = file_id, destination = %destination.display(), bytes = bytes.len(), "File downloaded");
        Ok(bytes.len() as u64)
    }
}

fn multipart_related_body(boundary: &str, metadata: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
