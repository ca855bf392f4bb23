use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::RequestLimiter;
use crate::services::{DocumentArchive, LlmClient, PdfProcessor, SessionStore, Summarizer};

/// Everything a request handler needs, built once at start-up.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub pdf: PdfProcessor,
    pub llm: LlmClient,
    pub summarizer: Summarizer,
    pub archive: Option<DocumentArchive>,
    pub limiter: Arc<RequestLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let llm = LlmClient::new(config.llm.clone())?;
        let summarizer = Summarizer::new(config.summary.clone(), llm.clone());
        let archive = config.archive.clone().map(DocumentArchive::new).transpose()?;

        Ok(Self {
            sessions: SessionStore::new(config.content_dir.clone()),
            pdf: PdfProcessor::new(config.max_table_pages),
            limiter: Arc::new(RequestLimiter::new(config.max_concurrent_requests)),
            llm,
            summarizer,
            archive,
            config: Arc::new(config),
        })
    }

    /// Creates the content and upload directories.
    pub async fn init(&self) -> AppResult<()> {
        self.sessions.init().await?;
        tokio::fs::create_dir_all(&self.config.upload_dir)
            .await
            .map_err(|e| AppError::config(format!(
                "Cannot create upload directory {}: {}",
                self.config.upload_dir.display(),
                e
            )))?;
        info!(
            content_dir = %self.config.content_dir.display(),
            upload_dir = %self.config.upload_dir.display(),
            archive_enabled = self.archive.is_some(),
            summary_strategy = ?self.summarizer.strategy(),
            "Application state initialized"
        );
        Ok(())
    }

    /// True when the scratch directory for uploads exists.
    pub async fn upload_dir_available(&self) -> bool {
        tokio::fs::metadata(&self.config.upload_dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }
}
