use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub enable_summarization: bool,
}

impl ChatRequest {
    /// Trimmed question and session id, or `None` when either is missing.
    pub fn required_parts(&self) -> Option<(&str, &str)> {
        let question = self.question.trim();
        let session_id = self.session_id.as_deref().map(str::trim).unwrap_or("");
        if question.is_empty() || session_id.is_empty() {
            None
        } else {
            Some((question, session_id))
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: usize,
    pub content: Bytes,
    pub mime_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: String, content: Bytes) -> Self {
        let size = content.len();
        Self {
            name,
            size,
            content,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: String) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    pub fn has_pdf_extension(&self) -> bool {
        self.name.to_lowercase().ends_with(".pdf")
    }
}
