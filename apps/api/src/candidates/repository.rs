//! Candidate persistence behind a pluggable trait.
//!
//! Default: `InMemoryCandidateRepository` (process lifetime, no setup).
//! With `DATABASE_URL` set: `PgCandidateRepository` over the `candidates` table.
//!
//! `AppState` holds an `Arc<dyn CandidateRepository>`, chosen at startup.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::candidate::Candidate;

#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Fails with `Validation` when the id is already taken.
    async fn insert(&self, candidate: Candidate) -> Result<(), AppError>;

    async fn get(&self, candidate_id: &str) -> Result<Option<Candidate>, AppError>;

    async fn list_for_job(&self, job_title: &str) -> Result<Vec<Candidate>, AppError>;

    /// Removes and returns the record, `None` if it did not exist.
    async fn remove(&self, candidate_id: &str) -> Result<Option<Candidate>, AppError>;

    async fn attach_report(&self, candidate_id: &str, report_key: &str) -> Result<(), AppError>;
}

fn id_taken(candidate_id: &str) -> AppError {
    AppError::Validation(format!(
        "Candidate id {candidate_id} is already registered; please retry"
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryCandidateRepository {
    candidates: RwLock<HashMap<String, Candidate>>,
}

impl InMemoryCandidateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateRepository for InMemoryCandidateRepository {
    async fn insert(&self, candidate: Candidate) -> Result<(), AppError> {
        let mut candidates = self.candidates.write().await;
        if candidates.contains_key(&candidate.candidate_id) {
            return Err(id_taken(&candidate.candidate_id));
        }
        candidates.insert(candidate.candidate_id.clone(), candidate);
        Ok(())
    }

    async fn get(&self, candidate_id: &str) -> Result<Option<Candidate>, AppError> {
        Ok(self.candidates.read().await.get(candidate_id).cloned())
    }

    async fn list_for_job(&self, job_title: &str) -> Result<Vec<Candidate>, AppError> {
        let mut list: Vec<Candidate> = self
            .candidates
            .read()
            .await
            .values()
            .filter(|c| c.job_title == job_title)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn remove(&self, candidate_id: &str) -> Result<Option<Candidate>, AppError> {
        Ok(self.candidates.write().await.remove(candidate_id))
    }

    async fn attach_report(&self, candidate_id: &str, report_key: &str) -> Result<(), AppError> {
        match self.candidates.write().await.get_mut(candidate_id) {
            Some(candidate) => {
                candidate.report_key = Some(report_key.to_string());
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Candidate {candidate_id} not found"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgCandidateRepository {
    pool: PgPool,
}

impl PgCandidateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn insert(&self, candidate: Candidate) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO candidates
                (candidate_id, full_name, email, phone, job_title, cv_key, report_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (candidate_id) DO NOTHING
            "#,
        )
        .bind(&candidate.candidate_id)
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.job_title)
        .bind(&candidate.cv_key)
        .bind(&candidate.report_key)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(id_taken(&candidate.candidate_id));
        }
        Ok(())
    }

    async fn get(&self, candidate_id: &str) -> Result<Option<Candidate>, AppError> {
        let candidate =
            sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE candidate_id = $1")
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(candidate)
    }

    async fn list_for_job(&self, job_title: &str) -> Result<Vec<Candidate>, AppError> {
        let candidates = sqlx::query_as::<_, Candidate>(
            "SELECT * FROM candidates WHERE job_title = $1 ORDER BY created_at",
        )
        .bind(job_title)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    async fn remove(&self, candidate_id: &str) -> Result<Option<Candidate>, AppError> {
        let removed = sqlx::query_as::<_, Candidate>(
            "DELETE FROM candidates WHERE candidate_id = $1 RETURNING *",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(removed)
    }

    async fn attach_report(&self, candidate_id: &str, report_key: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE candidates SET report_key = $1 WHERE candidate_id = $2")
            .bind(report_key)
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Candidate {candidate_id} not found"
            )));
        }
        Ok(())
    }
}
