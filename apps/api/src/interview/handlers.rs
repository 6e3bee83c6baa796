//! Axum route handlers for the Interview API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::engine::{
    post_message, retry_report_persist, session_info, start_interview, InterviewReply,
};
use crate::interview::session::SessionInfo;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    pub session_id: Option<String>,
    pub job_title: Option<String>,
    pub candidate_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportPersistResponse {
    pub report_saved: bool,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_token(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidSession("Invalid interview session".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews/start
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartInterviewRequest>,
) -> Result<Json<InterviewReply>, AppError> {
    let (Some(session_id), Some(job_title), Some(candidate_id)) = (
        present(request.session_id),
        present(request.job_title),
        present(request.candidate_id),
    ) else {
        return Err(AppError::Validation(
            "Missing session_id, job_title, or candidate_id".to_string(),
        ));
    };

    let token = parse_token(&session_id)?;
    let reply = start_interview(&state, token, &job_title, &candidate_id).await?;
    Ok(Json(reply))
}

/// POST /api/v1/interviews/message
pub async fn handle_send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<InterviewReply>, AppError> {
    let (Some(session_id), Some(message)) =
        (present(request.session_id), present(request.message))
    else {
        return Err(AppError::Validation(
            "Missing session_id or message".to_string(),
        ));
    };

    let token = parse_token(&session_id)?;
    let reply = post_message(&state, token, &message).await?;
    Ok(Json(reply))
}

/// GET /api/v1/interviews/:session_id
pub async fn handle_session_info(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    let token = Uuid::parse_str(&session_id)
        .map_err(|_| AppError::NotFound("Invalid interview session".to_string()))?;
    Ok(Json(session_info(&state, token).await?))
}

/// POST /api/v1/interviews/:session_id/report
///
/// Retries the write of a report that was generated but not saved.
pub async fn handle_retry_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ReportPersistResponse>, AppError> {
    let token = parse_token(&session_id)?;
    let report_saved = retry_report_persist(&state, token).await?;
    Ok(Json(ReportPersistResponse { report_saved }))
}
