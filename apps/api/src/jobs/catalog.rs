//! Job Catalog: postings keyed by title, each backed by a stored description.

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::candidates::registry::purge_candidate;
use crate::config::DuplicateJobPolicy;
use crate::errors::AppError;
use crate::models::job::{JobPosting, JobSummary};
use crate::state::AppState;
use crate::storage::{validate_segment, ArtifactKey};

#[derive(Debug, Serialize)]
pub struct JobDeletion {
    pub job_title: String,
    pub removed_candidates: Vec<String>,
}

/// Titles double as storage keys, so they must be path-safe.
pub fn validate_title(title: &str) -> Result<(), AppError> {
    validate_segment(title).map_err(|_| {
        AppError::Validation(format!(
            "Job title {title:?} must be non-empty and must not contain path separators"
        ))
    })
}

fn summary(title: String) -> JobSummary {
    JobSummary {
        file_name: format!("{title}.txt"),
        title,
    }
}

pub async fn create_job(
    state: &AppState,
    title: &str,
    description: Bytes,
) -> Result<JobSummary, AppError> {
    validate_title(title)?;
    if description.is_empty() {
        return Err(AppError::Validation("No file uploaded".to_string()));
    }

    let _guard = state.job_locks.exclusive(title).await;
    let key = ArtifactKey::job(title);

    if state.store.exists(&key).await? {
        match state.config.duplicate_job_policy {
            DuplicateJobPolicy::Reject => {
                return Err(AppError::DuplicateJob(format!(
                    "A job description for '{title}' already exists"
                )))
            }
            DuplicateJobPolicy::Overwrite => {
                warn!("Overwriting existing job description for '{title}'");
            }
        }
    }

    state.store.put(&key, description).await?;
    info!("Job description stored for '{title}'");
    Ok(summary(title.to_string()))
}

pub async fn get_job(state: &AppState, title: &str) -> Result<JobPosting, AppError> {
    let not_found = || AppError::NotFound(format!("Job description for '{title}' not found"));
    if validate_segment(title).is_err() {
        return Err(not_found());
    }

    let bytes = state
        .store
        .get(&ArtifactKey::job(title))
        .await?
        .ok_or_else(not_found)?;

    Ok(JobPosting {
        title: title.to_string(),
        description: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Every stored posting. Order is whatever the backend yields.
pub async fn list_jobs(state: &AppState) -> Result<Vec<JobSummary>, AppError> {
    Ok(state
        .store
        .list_job_titles()
        .await?
        .into_iter()
        .map(summary)
        .collect())
}

/// Candidate-facing link for a posting.
pub async fn interview_link(state: &AppState, title: &str) -> Result<String, AppError> {
    validate_title(title)?;
    if !state.store.exists(&ArtifactKey::job(title)).await? {
        return Err(AppError::NotFound(format!(
            "Job description for '{title}' not found"
        )));
    }

    let base = format!("{}/", state.config.public_base_url.trim_end_matches('/'));
    let url = reqwest::Url::parse_with_params(&base, &[("job_title", title)])
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid PUBLIC_BASE_URL: {e}")))?;
    Ok(url.to_string())
}

/// Removes a posting with every candidate, CV, report and session under it.
///
/// Runs under the job's exclusive lock. Sub-step failures do not stop the
/// cascade; they are collected into `CascadeIncomplete`. The description is
/// removed last so a partially failed delete can simply be retried.
pub async fn delete_job(state: &AppState, title: &str) -> Result<JobDeletion, AppError> {
    if validate_segment(title).is_err() {
        return Err(AppError::NotFound(format!("Job '{title}' not found")));
    }

    let _guard = state.job_locks.exclusive(title).await;
    let job_key = ArtifactKey::job(title);
    if !state.store.exists(&job_key).await? {
        return Err(AppError::NotFound(format!("Job '{title}' not found")));
    }

    let mut failures = Vec::new();
    let mut removed_candidates = Vec::new();

    match state.candidates.list_for_job(title).await {
        Ok(candidates) => {
            for candidate in candidates {
                let step_failures = purge_candidate(state, &candidate).await;
                if step_failures.is_empty() {
                    removed_candidates.push(candidate.candidate_id);
                } else {
                    failures.extend(step_failures);
                }
            }
        }
        Err(e) => failures.push(format!("listing candidates: {e}")),
    }

    if let Err(e) = state.store.delete_job_reports(title).await {
        failures.push(format!("removing report folder: {e}"));
    }

    if failures.is_empty() {
        if let Err(e) = state.store.delete(&job_key).await {
            failures.push(format!("removing {job_key}: {e}"));
        }
    } else {
        warn!("Keeping description for '{title}' so the delete can be retried");
    }

    if !failures.is_empty() {
        return Err(AppError::CascadeIncomplete(failures));
    }

    info!(
        "Deleted job '{title}' with {} candidate(s)",
        removed_candidates.len()
    );
    Ok(JobDeletion {
        job_title: title.to_string(),
        removed_candidates,
    })
}
