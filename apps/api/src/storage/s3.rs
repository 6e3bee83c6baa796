//! S3 / MinIO artifact backend. Object keys mirror the filesystem layout:
//! `jobs/{title}.txt`, `cvs/{id}_CV.pdf`, `reports/{job}/report_{id}.txt`.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

use super::{validate_segment, ArtifactKey, ArtifactStore, StorageError};
use crate::config::S3Config;

const JOBS_PREFIX: &str = "jobs/";

pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
}

impl S3ArtifactStore {
    /// Constructs a client configured for MinIO (local) or AWS (production).
    pub async fn connect(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "screener-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        info!("S3 artifact store using bucket {}", config.bucket);
        Self {
            client: Client::new(&s3_config),
            bucket: config.bucket.clone(),
        }
    }

    fn object_key(key: &ArtifactKey) -> Result<String, StorageError> {
        key.validate()?;
        Ok(match key {
            ArtifactKey::Job { title } => format!("{JOBS_PREFIX}{title}.txt"),
            ArtifactKey::Cv { candidate_id } => format!("cvs/{candidate_id}_CV.pdf"),
            ArtifactKey::Report {
                job_title,
                candidate_id,
            } => format!("reports/{job_title}/report_{candidate_id}.txt"),
        })
    }

    /// Every object key under `prefix`, following continuation tokens.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StorageError::S3(format!("list {prefix} failed: {e}")))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|o| o.key().map(str::to_string)),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<(), StorageError> {
        let object_key = Self::object_key(key)?;
        let len = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("upload of {key} failed: {e}")))?;
        debug!("Uploaded {key} ({len} bytes) to s3://{}/{object_key}", self.bucket);
        Ok(())
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, StorageError> {
        let object_key = Self::object_key(key)?;
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(StorageError::S3(format!("download of {key} failed: {e}"))),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(format!("reading {key} failed: {e}")))?;
        Ok(Some(data.into_bytes()))
    }

    async fn exists(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        let object_key = Self::object_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::S3(format!("head of {key} failed: {e}"))),
        }
    }

    async fn delete(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        // S3 deletes are silent for missing objects; check first so callers
        // can tell the two apart.
        if !self.exists(key).await? {
            return Ok(false);
        }
        let object_key = Self::object_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("delete of {key} failed: {e}")))?;
        Ok(true)
    }

    async fn list_job_titles(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .list_keys(JOBS_PREFIX)
            .await?
            .into_iter()
            .filter_map(|k| {
                k.strip_prefix(JOBS_PREFIX)
                    .and_then(|rest| rest.strip_suffix(".txt"))
                    .filter(|t| !t.is_empty() && !t.contains('/'))
                    .map(str::to_string)
            })
            .collect())
    }

    async fn delete_job_reports(&self, job_title: &str) -> Result<(), StorageError> {
        validate_segment(job_title)?;
        let prefix = format!("reports/{job_title}/");
        for object_key in self.list_keys(&prefix).await? {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&object_key)
                .send()
                .await
                .map_err(|e| StorageError::S3(format!("delete of {object_key} failed: {e}")))?;
        }
        Ok(())
    }
}
