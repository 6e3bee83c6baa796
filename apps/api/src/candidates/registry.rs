//! Candidate Registry: registration, listing with derived status, cascading delete.

use bytes::Bytes;
use chrono::{Local, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::id::generate_candidate_id;
use crate::errors::AppError;
use crate::interview::report::candidate_status;
use crate::models::candidate::{Candidate, CandidateWithStatus};
use crate::state::AppState;
use crate::storage::{validate_segment, ArtifactKey};

/// Registration form, already pulled out of the multipart body.
#[derive(Debug, Clone)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub job_title: String,
    pub cv: Bytes,
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub session_id: Uuid,
    pub candidate_id: String,
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn candidate_not_found(candidate_id: &str) -> AppError {
    AppError::NotFound(format!("Candidate {candidate_id} not found"))
}

/// Registers a candidate against an existing job, stores the CV and opens a
/// not-yet-started interview session.
pub async fn register_candidate(
    state: &AppState,
    registration: Registration,
) -> Result<RegistrationResponse, AppError> {
    let Registration {
        full_name,
        email,
        phone,
        job_title,
        cv,
    } = registration;

    require("full_name", &full_name)?;
    require("email", &email)?;
    require("job_title", &job_title)?;
    if cv.is_empty() {
        return Err(AppError::Validation("cv file is required".to_string()));
    }

    let job_missing =
        || AppError::JobNotFound(format!("Job description for '{job_title}' does not exist"));
    if validate_segment(&job_title).is_err() {
        return Err(job_missing());
    }

    // Held until the candidate and session exist, so a concurrent job delete
    // either runs first (and we fail below) or sees this candidate.
    let _guard = state.job_locks.shared(&job_title).await;
    if !state.store.exists(&ArtifactKey::job(&job_title)).await? {
        return Err(job_missing());
    }

    let candidate_id = {
        let mut rng = rand::thread_rng();
        generate_candidate_id(&full_name, &phone, Local::now().naive_local(), &mut rng)
    }
    .ok_or_else(|| AppError::Validation("full_name is required".to_string()))?;

    let cv_key = ArtifactKey::cv(&candidate_id);
    state.store.put(&cv_key, cv).await?;

    let candidate = Candidate {
        candidate_id: candidate_id.clone(),
        full_name,
        email,
        phone,
        job_title: job_title.clone(),
        cv_key: cv_key.to_string(),
        report_key: None,
        created_at: Utc::now(),
    };

    if let Err(e) = state.candidates.insert(candidate).await {
        if let Err(cleanup) = state.store.delete(&cv_key).await {
            warn!("Could not remove CV for rejected registration {candidate_id}: {cleanup}");
        }
        return Err(e);
    }

    let session_id = state.sessions.create(&job_title, &candidate_id).await;
    info!("Registered candidate {candidate_id} for '{job_title}' (session {session_id})");

    Ok(RegistrationResponse {
        session_id,
        candidate_id,
    })
}

pub async fn get_candidate(state: &AppState, candidate_id: &str) -> Result<Candidate, AppError> {
    state
        .candidates
        .get(candidate_id)
        .await?
        .ok_or_else(|| candidate_not_found(candidate_id))
}

/// Candidates for a job, each annotated with `passed` read from its report.
pub async fn list_candidates(
    state: &AppState,
    job_title: &str,
) -> Result<Vec<CandidateWithStatus>, AppError> {
    let _guard = state.job_locks.shared(job_title).await;
    let candidates = state.candidates.list_for_job(job_title).await?;

    let mut listed = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let passed = candidate_status(state, job_title, &candidate.candidate_id).await?;
        listed.push(CandidateWithStatus { candidate, passed });
    }
    Ok(listed)
}

/// Removes a candidate's CV, report, session and record. Returns the steps
/// that failed; already-missing artifacts are not failures.
///
/// The record is kept when an artifact could not be removed, so a retried
/// delete still finds the candidate and finishes the job.
pub async fn purge_candidate(state: &AppState, candidate: &Candidate) -> Vec<String> {
    let id = &candidate.candidate_id;
    let mut failures = Vec::new();

    for key in [
        ArtifactKey::cv(id),
        ArtifactKey::report(&candidate.job_title, id),
    ] {
        if let Err(e) = state.store.delete(&key).await {
            failures.push(format!("removing {key}: {e}"));
        }
    }

    let sessions = state.sessions.remove_for_candidate(id).await;
    if sessions > 0 {
        info!("Dropped {sessions} session(s) for candidate {id}");
    }

    if !failures.is_empty() {
        warn!("Keeping candidate record {id} so the delete can be retried");
        return failures;
    }

    if let Err(e) = state.candidates.remove(id).await {
        failures.push(format!("removing candidate record {id}: {e}"));
    }

    failures
}

pub async fn delete_candidate(
    state: &AppState,
    job_title: &str,
    candidate_id: &str,
) -> Result<(), AppError> {
    // Exclusive so an interview of this job cannot write a report for the
    // candidate between the purge steps.
    let _guard = state.job_locks.exclusive(job_title).await;

    let candidate = state
        .candidates
        .get(candidate_id)
        .await?
        .filter(|c| c.job_title == job_title)
        .ok_or_else(|| candidate_not_found(candidate_id))?;

    let failures = purge_candidate(state, &candidate).await;
    if !failures.is_empty() {
        return Err(AppError::CascadeIncomplete(failures));
    }

    info!("Deleted candidate {candidate_id} from '{job_title}'");
    Ok(())
}

pub async fn get_cv(state: &AppState, candidate_id: &str) -> Result<Bytes, AppError> {
    get_candidate(state, candidate_id).await?;
    state
        .store
        .get(&ArtifactKey::cv(candidate_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("CV for {candidate_id} not found")))
}

pub async fn get_report(
    state: &AppState,
    job_title: &str,
    candidate_id: &str,
) -> Result<Bytes, AppError> {
    let not_found = || AppError::NotFound("Report not found".to_string());
    let key = ArtifactKey::report(job_title, candidate_id);
    if key.validate().is_err() {
        return Err(not_found());
    }
    state.store.get(&key).await?.ok_or_else(not_found)
}
