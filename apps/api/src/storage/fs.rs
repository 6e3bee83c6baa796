//! Filesystem artifact backend.
//!
//! Layout under `root`:
//! - `{title}.txt`: job descriptions
//! - `cvs/{candidate_id}_CV.pdf`
//! - `reports/{job_title}/report_{candidate_id}.txt`

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use super::{validate_segment, ArtifactKey, ArtifactStore, StorageError};

const JOB_EXTENSION: &str = ".txt";

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Opens (and creates if needed) the upload tree rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join("cvs")).await?;
        fs::create_dir_all(root.join("reports")).await?;
        info!("Artifact store rooted at {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, key: &ArtifactKey) -> Result<PathBuf, StorageError> {
        key.validate()?;
        Ok(match key {
            ArtifactKey::Job { title } => self.root.join(format!("{title}{JOB_EXTENSION}")),
            ArtifactKey::Cv { candidate_id } => {
                self.root.join("cvs").join(format!("{candidate_id}_CV.pdf"))
            }
            ArtifactKey::Report {
                job_title,
                candidate_id,
            } => self
                .root
                .join("reports")
                .join(job_title)
                .join(format!("report_{candidate_id}.txt")),
        })
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &ArtifactKey, bytes: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;
        debug!("Wrote {key} ({} bytes) to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<Bytes>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_job_titles(&self) -> Result<Vec<String>, StorageError> {
        let mut titles = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(title) = name
                .to_str()
                .and_then(|n| n.strip_suffix(JOB_EXTENSION))
                .filter(|t| !t.is_empty())
            {
                titles.push(title.to_string());
            }
        }
        Ok(titles)
    }

    async fn delete_job_reports(&self, job_title: &str) -> Result<(), StorageError> {
        validate_segment(job_title)?;
        let folder = self.root.join("reports").join(job_title);
        match fs::remove_dir_all(&folder).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
