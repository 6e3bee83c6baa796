//! Axum route handlers for the Job Catalog.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::jobs::catalog::{
    create_job, delete_job, get_job, interview_link, list_jobs, JobDeletion,
};
use crate::models::job::JobSummary;
use crate::routes::form::FormParts;
use crate::state::AppState;

#[derive(Serialize)]
pub struct JobListResponse {
    pub job_descriptions: Vec<JobSummary>,
}

#[derive(Serialize)]
pub struct JobDescriptionResponse {
    pub title: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct InterviewLinkResponse {
    pub interview_url: String,
}

/// POST /api/v1/jobs (multipart: job_title, file)
pub async fn handle_create_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobSummary>), AppError> {
    let form = FormParts::collect(multipart).await?;
    let title = form.require_text("job_title")?;
    let description = form.require_file("file")?;

    let summary = create_job(&state, &title, description).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<JobListResponse>, AppError> {
    Ok(Json(JobListResponse {
        job_descriptions: list_jobs(&state).await?,
    }))
}

/// GET /api/v1/jobs/:title
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<JobDescriptionResponse>, AppError> {
    let job = get_job(&state, &title).await?;
    Ok(Json(JobDescriptionResponse {
        title: job.title,
        content: job.description,
    }))
}

/// DELETE /api/v1/jobs/:title
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<JobDeletion>, AppError> {
    Ok(Json(delete_job(&state, &title).await?))
}

/// POST /api/v1/jobs/:title/interview-link
pub async fn handle_interview_link(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<InterviewLinkResponse>, AppError> {
    Ok(Json(InterviewLinkResponse {
        interview_url: interview_link(&state, &title).await?,
    }))
}
