mod candidates;
mod config;
mod db;
mod errors;
mod interview;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::candidates::repository::{
    CandidateRepository, InMemoryCandidateRepository, PgCandidateRepository,
};
use crate::config::{Config, StorageBackend};
use crate::db::create_pool;
use crate::interview::session::SessionTable;
use crate::jobs::locks::JobLocks;
use crate::llm_client::{NoSpeech, OpenAiClient, OpenAiModels, SpeechSynthesizer};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ArtifactStore, FsArtifactStore, S3ArtifactStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;
    let candidates = build_candidate_repository(&config).await?;

    let openai = OpenAiClient::new(
        config.openai_api_key.clone(),
        OpenAiModels {
            chat: config.chat_model.clone(),
            report: config.report_model.clone(),
            tts: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
        },
        Duration::from_secs(config.backend_timeout_secs),
    )?;
    info!(
        "OpenAI client initialized (chat: {}, report: {})",
        openai.models().chat,
        openai.models().report
    );

    let speech: Arc<dyn SpeechSynthesizer> = if config.speech_enabled {
        info!("Speech synthesis enabled (voice: {})", openai.models().voice);
        Arc::new(openai.clone())
    } else {
        info!("Speech synthesis disabled");
        Arc::new(NoSpeech)
    };

    info!("Interview turn limit: {}", config.turn_limit);

    let state = AppState {
        config: config.clone(),
        store,
        candidates,
        sessions: SessionTable::new(),
        job_locks: JobLocks::new(),
        chat: Arc::new(openai),
        speech,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<dyn ArtifactStore>> {
    match (&config.storage_backend, &config.s3) {
        (StorageBackend::S3, Some(s3)) => Ok(Arc::new(S3ArtifactStore::connect(s3).await)),
        (StorageBackend::S3, None) => anyhow::bail!("S3 storage selected without S3 settings"),
        (StorageBackend::Filesystem, _) => {
            Ok(Arc::new(FsArtifactStore::open(&config.upload_dir).await?))
        }
    }
}

async fn build_candidate_repository(config: &Config) -> Result<Arc<dyn CandidateRepository>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            Ok(Arc::new(PgCandidateRepository::new(pool)))
        }
        None => {
            info!("DATABASE_URL not set, candidate registry is in-memory");
            Ok(Arc::new(InMemoryCandidateRepository::new()))
        }
    }
}
