use serde::{Deserialize, Serialize};

/// Catalog entry returned by `list_jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub title: String,
    pub file_name: String,
}

/// A job posting with its full description text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
}
