//! Scripted backends and state builders shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use crate::candidates::repository::InMemoryCandidateRepository;
use crate::config::{Config, DuplicateJobPolicy, StorageBackend};
use crate::interview::session::SessionTable;
use crate::jobs::locks::JobLocks;
use crate::llm_client::{ChatMessage, ChatModel, LlmError, ModelPurpose, SpeechSynthesizer};
use crate::state::AppState;
use crate::storage::{ArtifactKey, ArtifactStore, FsArtifactStore, StorageError};

pub const DEFAULT_REPORT: &str =
    "CANDIDATE EVALUATION REPORT\nOVERALL DECISION: PASS\nFINAL DECISION: PASS\n";

/// Chat backend with canned replies. Evaluation requests return the
/// configured report text.
pub struct ScriptedChat {
    report: String,
    fail_next: AtomicBool,
    fail_evaluation: AtomicBool,
    total: AtomicUsize,
    evaluations: AtomicUsize,
    last_evaluation: Mutex<Option<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn with_report(report: &str) -> Self {
        Self {
            report: report.to_string(),
            fail_next: AtomicBool::new(false),
            fail_evaluation: AtomicBool::new(false),
            total: AtomicUsize::new(0),
            evaluations: AtomicUsize::new(0),
            last_evaluation: Mutex::new(None),
        }
    }

    /// The next call of any kind fails.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The next evaluation call fails.
    pub fn fail_evaluation(&self) {
        self.fail_evaluation.store(true, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Successful evaluation calls only.
    pub fn evaluation_calls(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn last_evaluation_context(&self) -> Option<Vec<ChatMessage>> {
        self.last_evaluation.lock().unwrap().clone()
    }
}

fn scripted_failure() -> LlmError {
    LlmError::Api {
        status: 500,
        message: "scripted failure".to_string(),
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(
        &self,
        purpose: ModelPurpose,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(scripted_failure());
        }

        match purpose {
            ModelPurpose::Interview => Ok(format!(
                "Interviewer reply after {} messages",
                messages.len()
            )),
            ModelPurpose::Evaluation => {
                if self.fail_evaluation.swap(false, Ordering::SeqCst) {
                    return Err(scripted_failure());
                }
                self.evaluations.fetch_add(1, Ordering::SeqCst);
                *self.last_evaluation.lock().unwrap() = Some(messages.to_vec());
                Ok(self.report.clone())
            }
        }
    }
}

/// Returns a fixed audio blob for every text.
pub struct FixedSpeech;

#[async_trait]
impl SpeechSynthesizer for FixedSpeech {
    async fn synthesize(&self, _text: &str) -> Result<Option<Bytes>, LlmError> {
        Ok(Some(Bytes::from_static(b"ID3-fake-audio")))
    }
}

pub struct FailingSpeech;

#[async_trait]
impl SpeechSynthesizer for FailingSpeech {
    async fn synthesize(&self, _text: &str) -> Result<Option<Bytes>, LlmError> {
        Err(LlmError::Timeout)
    }
}

/// Filesystem store whose report writes take `delay` before landing.
pub struct SlowReportStore {
    inner: FsArtifactStore,
    delay: Duration,
}

impl SlowReportStore {
    pub fn wrap(inner: FsArtifactStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl ArtifactStore for SlowReportStore {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<(), StorageError> {
        if matches!(key, ArtifactKey::Report { .. }) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.put(key, bytes).await
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, StorageError> {
        self.inner.get(key).await
    }

    async fn exists(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        self.inner.delete(key).await
    }

    async fn list_job_titles(&self) -> Result<Vec<String>, StorageError> {
        self.inner.list_job_titles().await
    }

    async fn delete_job_reports(&self, job_title: &str) -> Result<(), StorageError> {
        self.inner.delete_job_reports(job_title).await
    }
}

pub fn test_config(turn_limit: u32) -> Config {
    Config {
        openai_api_key: "test-key".to_string(),
        port: 8080,
        rust_log: "debug".to_string(),
        turn_limit,
        chat_model: "gpt-4-turbo".to_string(),
        report_model: "gpt-4o".to_string(),
        tts_model: "tts-1".to_string(),
        tts_voice: "nova".to_string(),
        speech_enabled: true,
        backend_timeout_secs: 5,
        storage_backend: StorageBackend::Filesystem,
        upload_dir: String::new(),
        s3: None,
        database_url: None,
        duplicate_job_policy: DuplicateJobPolicy::Reject,
        public_base_url: "http://localhost:8080".to_string(),
    }
}

fn plain_store(store: FsArtifactStore) -> Arc<dyn ArtifactStore> {
    Arc::new(store)
}

async fn build_state(
    config: Config,
    chat: Arc<dyn ChatModel>,
    wrap_store: impl FnOnce(FsArtifactStore) -> Arc<dyn ArtifactStore>,
) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::open(dir.path()).await.unwrap();
    let state = AppState {
        config,
        store: wrap_store(store),
        candidates: Arc::new(InMemoryCandidateRepository::new()),
        sessions: SessionTable::new(),
        job_locks: JobLocks::new(),
        chat,
        speech: Arc::new(FixedSpeech),
    };
    (state, dir)
}

pub async fn test_state(turn_limit: u32) -> (AppState, TempDir) {
    test_state_with(turn_limit, |_| {}).await
}

pub async fn test_state_with(
    turn_limit: u32,
    configure: impl FnOnce(&mut Config),
) -> (AppState, TempDir) {
    let mut config = test_config(turn_limit);
    configure(&mut config);
    build_state(
        config,
        Arc::new(ScriptedChat::with_report(DEFAULT_REPORT)),
        plain_store,
    )
    .await
}

pub async fn test_state_with_backends(
    turn_limit: u32,
    chat: Arc<ScriptedChat>,
) -> (AppState, TempDir) {
    build_state(test_config(turn_limit), chat, plain_store).await
}

pub async fn test_state_with_store(
    turn_limit: u32,
    wrap_store: impl FnOnce(FsArtifactStore) -> Arc<dyn ArtifactStore>,
) -> (AppState, TempDir) {
    build_state(
        test_config(turn_limit),
        Arc::new(ScriptedChat::with_report(DEFAULT_REPORT)),
        wrap_store,
    )
    .await
}
