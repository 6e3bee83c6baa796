//! Axum route handlers for the Candidate Registry and reviewer downloads.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::candidates::registry::{
    delete_candidate, get_cv, get_report, list_candidates, register_candidate, Registration,
    RegistrationResponse,
};
use crate::errors::AppError;
use crate::interview::report::ReportView;
use crate::models::candidate::CandidateWithStatus;
use crate::routes::form::FormParts;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CandidateListResponse {
    pub candidates: Vec<CandidateWithStatus>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

fn attachment(content_type: &str, file_name: &str) -> [(header::HeaderName, String); 2] {
    [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ]
}

/// POST /api/v1/candidates (multipart: full_name, email, phone, job_title, cv)
pub async fn handle_register_candidate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let form = FormParts::collect(multipart).await?;
    let registration = Registration {
        full_name: form.require_text("full_name")?,
        email: form.require_text("email")?,
        phone: form.text("phone"),
        job_title: form.require_text("job_title")?,
        cv: form.require_file("cv")?,
    };

    let response = register_candidate(&state, registration).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/jobs/:title/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Path(job_title): Path<String>,
) -> Result<Json<CandidateListResponse>, AppError> {
    Ok(Json(CandidateListResponse {
        candidates: list_candidates(&state, &job_title).await?,
    }))
}

/// DELETE /api/v1/jobs/:title/candidates/:candidate_id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path((job_title, candidate_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, AppError> {
    delete_candidate(&state, &job_title, &candidate_id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// GET /api/v1/candidates/:candidate_id/cv
pub async fn handle_download_cv(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cv = get_cv(&state, &candidate_id).await?;
    Ok((
        attachment("application/pdf", &format!("{candidate_id}_CV.pdf")),
        cv,
    ))
}

/// GET /api/v1/jobs/:title/candidates/:candidate_id/report
pub async fn handle_view_report(
    State(state): State<AppState>,
    Path((job_title, candidate_id)): Path<(String, String)>,
) -> Result<Json<ReportView>, AppError> {
    let report = get_report(&state, &job_title, &candidate_id).await?;
    Ok(Json(ReportView::from_text(
        String::from_utf8_lossy(&report).into_owned(),
    )))
}

/// GET /api/v1/jobs/:title/candidates/:candidate_id/report/download
pub async fn handle_download_report(
    State(state): State<AppState>,
    Path((job_title, candidate_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let report = get_report(&state, &job_title, &candidate_id).await?;
    Ok((
        attachment(
            "text/plain; charset=utf-8",
            &format!("report_{candidate_id}.txt"),
        ),
        report,
    ))
}
