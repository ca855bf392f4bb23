use serde::{Deserialize, Serialize};

pub const UPLOAD_SUCCESS_MESSAGE: &str = "PDF uploaded successfully. Click next to ask a question!";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub session_id: String,
}

impl UploadResponse {
    pub fn new(session_id: String) -> Self {
        Self {
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            session_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: i64,
    pub services: ServiceStatus,
    pub concurrency: ConcurrencyStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub upload_dir: bool,
    pub session_store: bool,
    pub completion_api_key: bool,
    pub document_archive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConcurrencyStatus {
    pub total_requests: u64,
    pub rejected_requests: u64,
    pub available_permits: usize,
    pub rejection_rate: f64,
}
