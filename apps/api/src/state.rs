use std::sync::Arc;

use crate::candidates::repository::CandidateRepository;
use crate::config::Config;
use crate::interview::session::SessionTable;
use crate::jobs::locks::JobLocks;
use crate::llm_client::{ChatModel, SpeechSynthesizer};
use crate::storage::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Job descriptions, CVs and reports. Filesystem or S3, chosen at startup.
    pub store: Arc<dyn ArtifactStore>,
    /// In-memory by default, Postgres when `DATABASE_URL` is set.
    pub candidates: Arc<dyn CandidateRepository>,
    pub sessions: SessionTable,
    pub job_locks: JobLocks,
    pub chat: Arc<dyn ChatModel>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}
