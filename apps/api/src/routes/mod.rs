pub mod form;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::candidates::handlers as candidates;
use crate::interview::handlers as interview;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Upper bound on multipart uploads (job descriptions and CVs).
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job catalog
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:title",
            get(jobs::handle_get_job).delete(jobs::handle_delete_job),
        )
        .route(
            "/api/v1/jobs/:title/interview-link",
            post(jobs::handle_interview_link),
        )
        // Reviewer views of a job's candidates
        .route(
            "/api/v1/jobs/:title/candidates",
            get(candidates::handle_list_candidates),
        )
        .route(
            "/api/v1/jobs/:title/candidates/:candidate_id",
            delete(candidates::handle_delete_candidate),
        )
        .route(
            "/api/v1/jobs/:title/candidates/:candidate_id/report",
            get(candidates::handle_view_report),
        )
        .route(
            "/api/v1/jobs/:title/candidates/:candidate_id/report/download",
            get(candidates::handle_download_report),
        )
        // Candidate registration
        .route(
            "/api/v1/candidates",
            post(candidates::handle_register_candidate),
        )
        .route(
            "/api/v1/candidates/:candidate_id/cv",
            get(candidates::handle_download_cv),
        )
        // Interview
        .route(
            "/api/v1/interviews/start",
            post(interview::handle_start_interview),
        )
        .route(
            "/api/v1/interviews/message",
            post(interview::handle_send_message),
        )
        .route(
            "/api/v1/interviews/:session_id",
            get(interview::handle_session_info),
        )
        .route(
            "/api/v1/interviews/:session_id/report",
            post(interview::handle_retry_report),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
