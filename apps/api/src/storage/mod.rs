//! Artifact storage for job descriptions, CVs and reports.
//!
//! Keys are logical (`job:{title}`, `cv:{candidate_id}`,
//! `report:{job_title}:{candidate_id}`); each backend maps them to its own
//! layout. Missing artifacts are `Ok(None)` / `Ok(false)`, never errors.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod fs;
pub mod s3;

pub use fs::FsArtifactStore;
pub use s3::S3ArtifactStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Invalid artifact key segment: {0:?}")]
    InvalidKey(String),
}

/// Logical address of one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    Job { title: String },
    Cv { candidate_id: String },
    Report { job_title: String, candidate_id: String },
}

impl ArtifactKey {
    pub fn job(title: &str) -> Self {
        ArtifactKey::Job {
            title: title.to_string(),
        }
    }

    pub fn cv(candidate_id: &str) -> Self {
        ArtifactKey::Cv {
            candidate_id: candidate_id.to_string(),
        }
    }

    pub fn report(job_title: &str, candidate_id: &str) -> Self {
        ArtifactKey::Report {
            job_title: job_title.to_string(),
            candidate_id: candidate_id.to_string(),
        }
    }

    /// Every user-supplied segment of the key, for validation.
    fn segments(&self) -> Vec<&str> {
        match self {
            ArtifactKey::Job { title } => vec![title.as_str()],
            ArtifactKey::Cv { candidate_id } => vec![candidate_id.as_str()],
            ArtifactKey::Report {
                job_title,
                candidate_id,
            } => vec![job_title.as_str(), candidate_id.as_str()],
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        self.segments()
            .into_iter()
            .try_for_each(validate_segment)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKey::Job { title } => write!(f, "job:{title}"),
            ArtifactKey::Cv { candidate_id } => write!(f, "cv:{candidate_id}"),
            ArtifactKey::Report {
                job_title,
                candidate_id,
            } => write!(f, "report:{job_title}:{candidate_id}"),
        }
    }
}

/// A segment must be usable verbatim as a file name and an object key component.
pub fn validate_segment(segment: &str) -> Result<(), StorageError> {
    let invalid = segment.trim().is_empty()
        || segment == "."
        || segment == ".."
        || segment
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());
    if invalid {
        return Err(StorageError::InvalidKey(segment.to_string()));
    }
    Ok(())
}

/// Blob store for interview artifacts. Carried in `AppState` as `Arc<dyn ArtifactStore>`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Writes the artifact, replacing any previous content.
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<(), StorageError>;

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, StorageError>;

    async fn exists(&self, key: &ArtifactKey) -> Result<bool, StorageError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, key: &ArtifactKey) -> Result<bool, StorageError>;

    /// Titles of every stored job description. Order unspecified.
    async fn list_job_titles(&self) -> Result<Vec<String>, StorageError>;

    /// Removes every report stored under a job title.
    async fn delete_job_reports(&self, job_title: &str) -> Result<(), StorageError>;
}
