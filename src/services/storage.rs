use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::models::StagedFile;

/// How many fresh names the stager tries before giving up on collisions.
pub const MAX_STAGE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not find a free file name after {0} attempts")]
    NameExhausted(usize),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {}: {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A regular file found in the upload directory.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Write `data` under a freshly generated name.
    async fn stage(&self, data: &[u8]) -> StorageResult<StagedFile>;
    /// Read at most `len` bytes from the start of the file.
    async fn read_header(&self, path: &Path, len: usize) -> StorageResult<Vec<u8>>;
    async fn delete_file(&self, path: &Path) -> StorageResult<()>;
    async fn list_files(&self) -> StorageResult<Vec<StoredEntry>>;
    /// Root-relative URL a generated name is served under.
    fn public_path(&self, file_name: &str) -> String;
    fn root(&self) -> &Path;
}

/// Upload directory on the local filesystem.
pub struct LocalStorageService {
    base_path: PathBuf,
    public_prefix: String,
    name_prefix: String,
    extension: String,
}

impl LocalStorageService {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
        name_prefix: impl Into<String>,
        extension: impl Into<String>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        // Absolute paths keep StagedFile::path meaningful regardless of cwd.
        let base_path = fs::canonicalize(&base_path).await?;

        Ok(Self {
            base_path,
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
            name_prefix: name_prefix.into(),
            extension: extension.into(),
        })
    }

    /// `{prefix}-{unix millis}-{random}{ext}`
    pub fn generate_name(&self) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
        format!(
            "{}-{}-{}{}",
            self.name_prefix,
            Utc::now().timestamp_millis(),
            suffix,
            self.extension
        )
    }

    async fn write_new(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(path).await {
                tracing::warn!("Failed to remove partial file {}: {}", path.display(), cleanup);
            }
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn stage(&self, data: &[u8]) -> StorageResult<StagedFile> {
        for attempt in 1..=MAX_STAGE_ATTEMPTS {
            let file_name = self.generate_name();
            let path = self.base_path.join(&file_name);

            match self.write_new(&path, data).await {
                Ok(()) => {
                    tracing::debug!(
                        file = %file_name,
                        size_bytes = data.len(),
                        attempt,
                        "Staged upload"
                    );
                    return Ok(StagedFile { file_name, path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::warn!("Staging name collision on {}, retrying", file_name);
                }
                Err(source) => return Err(StorageError::Write { path, source }),
            }
        }

        Err(StorageError::NameExhausted(MAX_STAGE_ATTEMPTS))
    }

    async fn read_header(&self, path: &Path, len: usize) -> StorageResult<Vec<u8>> {
        let read = async {
            let file = fs::File::open(path).await?;
            let mut header = Vec::with_capacity(len);
            file.take(len as u64).read_to_end(&mut header).await?;
            Ok::<_, std::io::Error>(header)
        }
        .await;

        read.map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn delete_file(&self, path: &Path) -> StorageResult<()> {
        fs::remove_file(path)
            .await
            .map_err(|source| StorageError::Delete {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn list_files(&self) -> StorageResult<Vec<StoredEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                // Removed between readdir and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            entries.push(StoredEntry {
                file_name,
                path: entry.path(),
                modified: metadata.modified()?,
            });
        }

        Ok(entries)
    }

    fn public_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }

    fn root(&self) -> &Path {
        &self.base_path
    }
}
