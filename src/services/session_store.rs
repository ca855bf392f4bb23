use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::SessionContent;

/// One JSON file per session under `dir`, named `<session_id>.json`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn init(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        info!(dir = %self.dir.display(), "Session store ready");
        Ok(())
    }

    pub async fn save(&self, content: &SessionContent) -> AppResult<String> {
        let session_id = Uuid::new_v4().to_string();
        let json = serde_json::to_vec(content)
            .map_err(|e| AppError::internal(format!("Failed to serialize session: {}", e)))?;

        tokio::fs::write(self.path_for(&session_id), json).await?;
        debug!(
            session_id = %session_id,
            text_length = content.text.len(),
            tables = content.tables.len(),
            "Session content saved"
        );
        Ok(session_id)
    }

    pub async fn load(&self, session_id: &str) -> AppResult<SessionContent> {
        // Only canonical ids map to files; anything else could walk out of `dir`.
        let id = Uuid::parse_str(session_id).map_err(|_| AppError::SessionNotFound {
            session_id: session_id.to_string(),
        })?;

        let path = self.path_for(&id.to_string());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::SessionNotFound {
                    session_id: session_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::processing(format!("Error processing request: stored session is unreadable: {}", e))
        })
    }

    /// True when the store directory exists and is a directory.
    pub async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }
}
