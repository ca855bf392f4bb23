use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap},
    response::Json,
};
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::handlers::MULTIPART_OVERHEAD_BYTES;
use crate::models::{SessionContent, UploadResponse, UploadedFile};
use crate::state::AppState;

pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
    let limit_mb = state.config.max_file_size_mb;

    info!(request_id = %request_id, "Starting PDF upload request");

    // Reject oversized bodies before reading them.
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if let Some(length) = content_length {
        if length > state.config.max_file_size_bytes() + MULTIPART_OVERHEAD_BYTES {
            warn!(request_id = %request_id, content_length = length, "Upload body exceeds limit");
            return Err(AppError::FileTooLarge {
                size: length / (1024 * 1024),
                limit: limit_mb,
            });
        }
    }

    let file = match read_pdf_field(&mut multipart, state.config.max_file_size_bytes(), limit_mb).await {
        Ok(file) => {
            info!(
                request_id = %request_id,
                file_name = %file.name,
                file_size = file.size,
                "File extracted from multipart form"
            );
            file
        }
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Rejected upload");
            return Err(e);
        }
    };

    let temp_file = save_temp_file(&state.config.upload_dir, file.content.clone()).await?;

    let result = match state.pdf.extract(temp_file.path()).await {
        Ok(result) => result,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "PDF processing failed");
            return Err(e);
        }
    };

    let drive_file_id = match &state.archive {
        Some(archive) => Some(archive.upload(temp_file.path(), &file.name).await?),
        None => None,
    };

    // Removes the scratch copy.
    drop(temp_file);

    let content = SessionContent::new(result.text, result.tables).with_drive_file_id(drive_file_id);
    let session_id = state
        .sessions
        .save(&content)
        .await
        .map_err(|e| AppError::processing(format!("Upload failed: {}", e)))?;

    info!(
        request_id = %request_id,
        session_id = %session_id,
        pages = result.pages,
        tables = content.tables.len(),
        total_time_ms = start.elapsed().as_millis() as u64,
        "Upload completed successfully"
    );

    Ok(Json(UploadResponse::new(session_id)))
}

async fn read_pdf_field(
    multipart: &mut Multipart,
    max_size_bytes: usize,
    limit_mb: usize,
) -> AppResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid_file(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").trim().to_string();
        if file_name.is_empty() {
            return Err(AppError::EmptyFileName);
        }

        let content_type = field.content_type().map(|ct| ct.to_string());
        let data: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::invalid_file(format!("Failed to read file data: {}", e)))?;

        let mut file = UploadedFile::new(file_name, data);
        if let Some(mime_type) = content_type {
            file = file.with_mime_type(mime_type);
        }

        if !file.has_pdf_extension() {
            return Err(AppError::invalid_file("Invalid file type. Only PDF files are allowed."));
        }
        if file.size > max_size_bytes {
            return Err(AppError::FileTooLarge {
                size: file.size / (1024 * 1024),
                limit: limit_mb,
            });
        }
        if file.content.is_empty() {
            return Err(AppError::invalid_file("File is empty"));
        }

        debug!(
            "Extracted file: {} ({} bytes, type: {:?})",
            file.name,
            file.size,
            file.mime_type
        );
        return Ok(file);
    }

    Err(AppError::MissingFile)
}

async fn save_temp_file(dir: &Path, content: Bytes) -> AppResult<NamedTempFile> {
    let dir: PathBuf = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".pdf")
            .tempfile_in(&dir)?;
        file.write_all(&content)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| AppError::processing(format!("Upload failed: {}", e)))?
    .map_err(|e| AppError::processing(format!("Upload failed: {}", e)))
}
