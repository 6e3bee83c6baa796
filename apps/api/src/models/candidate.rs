use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered candidate. `cv_key` and `report_key` hold the logical
/// artifact keys (`cv:{id}`, `report:{job}:{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub candidate_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub job_title: String,
    pub cv_key: String,
    pub report_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Candidate row as shown on the reviewer dashboard. `passed` is derived
/// from the stored report at read time, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateWithStatus {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub passed: bool,
}
