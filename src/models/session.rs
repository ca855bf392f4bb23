use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extracted content of one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContent {
    #[serde(default)]
    pub text: String,
    /// Row-oriented JSON, one string per table.
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub drive_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl SessionContent {
    pub fn new(text: Option<String>, tables: Vec<String>) -> Self {
        Self {
            text: text.unwrap_or_default(),
            tables,
            drive_file_id: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn with_drive_file_id(mut self, drive_file_id: Option<String>) -> Self {
        self.drive_file_id = drive_file_id;
        self
    }
}
