use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::models::{ConcurrencyStatus, HealthResponse, ServiceStatus};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("Health check requested");

    let upload_dir = state.upload_dir_available().await;
    let session_store = state.sessions.is_available().await;
    let metrics = state.limiter.metrics();

    let status = if upload_dir && session_store {
        "healthy"
    } else {
        "degraded"
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        services: ServiceStatus {
            upload_dir,
            session_store,
            completion_api_key: state.llm.has_api_key(),
            document_archive: state.archive.is_some(),
        },
        concurrency: ConcurrencyStatus {
            total_requests: metrics.total_requests,
            rejected_requests: metrics.rejected_requests,
            available_permits: metrics.available_permits,
            rejection_rate: metrics.rejection_rate(),
        },
    };

    info!(
        status = status,
        session_store = session_store,
        "Health check completed"
    );

    Json(response)
}

/// Readiness check endpoint
pub async fn ready_handler(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    if state.sessions.is_available().await && state.upload_dir_available().await {
        info!("Readiness check passed");
        Ok(StatusCode::OK)
    } else {
        info!("Readiness check failed - storage directories unavailable");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
