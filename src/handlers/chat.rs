use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::{ChatRequest, ChatResponse, SessionContent};
use crate::services::normalizer::normalize;
use crate::services::prompt::{build_prompt, split_large_tables};
use crate::state::AppState;

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Json<ChatResponse>> {
    let start = Instant::now();
    let Json(request) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;

    let (question, session_id) = request
        .required_parts()
        .ok_or_else(|| AppError::validation("Missing required parameters"))?;

    info!(
        session_id = %session_id,
        enable_summarization = request.enable_summarization,
        "Answering question"
    );

    let SessionContent { text, tables, .. } = state.sessions.load(session_id).await?;

    // Summary and table chunking are independent; both must finish before the prompt.
    let max_rows = state.config.max_table_rows;
    let (summary, tables) = tokio::join!(
        state.summarizer.summarize(&text, request.enable_summarization),
        tokio::task::spawn_blocking(move || split_large_tables(&tables, max_rows))
    );
    let tables = tables
        .map_err(|e| AppError::processing(format!("Error processing request: {}", e)))?;

    let prompt = build_prompt(&summary, &tables, question);

    let reply = match state.llm.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Completion request failed");
            return Err(e);
        }
    };
    let answer = normalize(&reply);

    info!(
        session_id = %session_id,
        answer_length = answer.len(),
        total_time_ms = start.elapsed().as_millis() as u64,
        "Question answered"
    );

    Ok(Json(ChatResponse { answer }))
}
