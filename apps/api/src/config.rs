use anyhow::{bail, Context, Result};

/// Where job descriptions, CVs and reports are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Plain directory tree under `upload_dir`.
    Filesystem,
    /// S3 / MinIO bucket.
    S3,
}

/// What `create_job` does when the title already has a stored description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateJobPolicy {
    Reject,
    Overwrite,
}

/// Credentials and endpoint for the S3 artifact backend.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Number of candidate answers before the interview is concluded.
    pub turn_limit: u32,
    pub chat_model: String,
    pub report_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub speech_enabled: bool,
    pub backend_timeout_secs: u64,
    pub storage_backend: StorageBackend,
    pub upload_dir: String,
    pub s3: Option<S3Config>,
    /// Postgres candidate registry. In-memory registry when unset.
    pub database_url: Option<String>,
    pub duplicate_job_policy: DuplicateJobPolicy,
    pub public_base_url: String,
}

pub const DEFAULT_TURN_LIMIT: u32 = 8;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let turn_limit = match std::env::var("TURN_LIMIT") {
            Ok(raw) => raw
                .parse::<u32>()
                .context("TURN_LIMIT must be a positive integer")?,
            Err(_) => DEFAULT_TURN_LIMIT,
        };
        if turn_limit == 0 {
            bail!("TURN_LIMIT must be at least 1");
        }

        let storage_backend = match optional_env("STORAGE_BACKEND").as_deref() {
            None | Some("fs") => StorageBackend::Filesystem,
            Some("s3") => StorageBackend::S3,
            Some(other) => bail!("STORAGE_BACKEND must be 'fs' or 's3', got '{other}'"),
        };

        let s3 = if storage_backend == StorageBackend::S3 {
            Some(S3Config {
                bucket: require_env("S3_BUCKET")?,
                endpoint: require_env("S3_ENDPOINT")?,
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            })
        } else {
            None
        };

        let duplicate_job_policy = match optional_env("DUPLICATE_JOB_POLICY").as_deref() {
            None | Some("reject") => DuplicateJobPolicy::Reject,
            Some("overwrite") => DuplicateJobPolicy::Overwrite,
            Some(other) => {
                bail!("DUPLICATE_JOB_POLICY must be 'reject' or 'overwrite', got '{other}'")
            }
        };

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            turn_limit,
            chat_model: optional_env("CHAT_MODEL").unwrap_or_else(|| "gpt-4-turbo".to_string()),
            report_model: optional_env("REPORT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            tts_model: optional_env("TTS_MODEL").unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: optional_env("TTS_VOICE").unwrap_or_else(|| "nova".to_string()),
            speech_enabled: optional_env("SPEECH_ENABLED")
                .map(|v| !matches!(v.as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            backend_timeout_secs: optional_env("BACKEND_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("BACKEND_TIMEOUT_SECS must be a number of seconds")?
                .unwrap_or(120),
            storage_backend,
            upload_dir: optional_env("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            s3,
            database_url: optional_env("DATABASE_URL"),
            duplicate_job_policy,
            public_base_url: optional_env("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
