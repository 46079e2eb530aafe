use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::UploadConfig;
use crate::models::{PublishedFile, UploadCandidate};
use crate::services::metadata::{MetadataService, SanitizeError};
use crate::services::retention::RetentionSlot;
use crate::services::signature::SignatureChecker;
use crate::services::storage::{StorageError, StorageService};
use crate::utils::validation::{ValidationError, ValidationRules, validate_candidate};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    InvalidType(ValidationError),

    #[error("{0}")]
    TooLarge(ValidationError),

    #[error("{0}")]
    InvalidName(ValidationError),

    #[error("File content is not a valid MP3 file")]
    InvalidContent,

    #[error("Audio file could not be processed: {0}")]
    ParseError(#[source] SanitizeError),

    #[error("Storage failure: {0}")]
    Io(#[from] StorageError),
}

impl From<ValidationError> for UploadError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidType(_) => UploadError::InvalidType(err),
            ValidationError::TooLarge { .. } => UploadError::TooLarge(err),
            ValidationError::InvalidName(_) => UploadError::InvalidName(err),
        }
    }
}

impl UploadError {
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::InvalidType(_) => "INVALID_TYPE",
            UploadError::TooLarge(_) => "TOO_LARGE",
            UploadError::InvalidName(_) => "INVALID_NAME",
            UploadError::InvalidContent => "INVALID_CONTENT",
            UploadError::ParseError(_) => "PARSE_ERROR",
            UploadError::Io(_) => "IO_ERROR",
        }
    }
}

/// Validate, stage, verify, sanitize, publish. One call per request.
pub struct UploadService {
    storage: Arc<dyn StorageService>,
    retention: Arc<dyn RetentionSlot>,
    signature: SignatureChecker,
    rules: ValidationRules,
}

impl UploadService {
    pub fn new(
        storage: Arc<dyn StorageService>,
        retention: Arc<dyn RetentionSlot>,
        config: &UploadConfig,
    ) -> Self {
        Self {
            storage,
            retention,
            signature: SignatureChecker::default(),
            rules: ValidationRules::from_config(config),
        }
    }

    pub async fn current(&self) -> Option<PublishedFile> {
        self.retention.current().await
    }

    pub async fn process(&self, candidate: UploadCandidate) -> Result<PublishedFile, UploadError> {
        // 1. Request metadata only; nothing is written on failure.
        validate_candidate(&candidate, &self.rules)?;

        // 2. Stage
        let staged = self.storage.stage(&candidate.bytes).await?;
        drop(candidate);

        // 3. Signature
        match self.signature.check(self.storage.as_ref(), &staged.path).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard(&staged.path, "signature mismatch").await;
                return Err(UploadError::InvalidContent);
            }
            Err(e) => {
                self.discard(&staged.path, "unreadable staged file").await;
                return Err(e.into());
            }
        }

        // 4. Parse and strip
        let audio = match MetadataService::sanitize_file(staged.path.clone()).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!("Sanitizing {} failed: {}", staged.file_name, e);
                self.discard(&staged.path, "metadata parse failure").await;
                return Err(UploadError::ParseError(e));
            }
        };

        // 5. Commit, then evict whatever was there before
        let public_path = self.storage.public_path(&staged.file_name);
        let published = PublishedFile::from_staged(staged, public_path, audio);
        let previous = self.retention.publish(published.clone()).await;

        if let Some(previous) = previous {
            self.discard(&previous.path, "superseded").await;
        }

        tracing::info!(
            file = %published.file_name,
            size_bytes = published.size,
            duration_secs = published.audio.duration.as_secs(),
            "Published new audio file"
        );

        Ok(published)
    }

    /// Best-effort delete; a failure here never changes the outcome of the request.
    async fn discard(&self, path: &Path, reason: &str) {
        match self.storage.delete_file(path).await {
            Ok(()) => tracing::debug!("Deleted {} ({})", path.display(), reason),
            Err(e) => tracing::error!("Cleanup of {} ({}) failed: {}", path.display(), reason, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StagedFile;
    use crate::services::metadata::tests::{id3v23, mpeg_frames};
    use crate::services::retention::MemoryRetentionSlot;
    use crate::services::storage::{LocalStorageService, StorageResult, StoredEntry};
    use bytes::Bytes;
    use tempfile::TempDir;

    /// Local storage whose deletes always fail.
    struct UndeletableStorage(LocalStorageService);

    #[async_trait::async_trait]
    impl StorageService for UndeletableStorage {
        async fn stage(&self, data: &[u8]) -> StorageResult<StagedFile> {
            self.0.stage(data).await
        }
        async fn read_header(&self, path: &Path, len: usize) -> StorageResult<Vec<u8>> {
            self.0.read_header(path, len).await
        }
        async fn delete_file(&self, path: &Path) -> StorageResult<()> {
            Err(StorageError::Delete {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
        async fn list_files(&self) -> StorageResult<Vec<StoredEntry>> {
            self.0.list_files().await
        }
        fn public_path(&self, file_name: &str) -> String {
            self.0.public_path(file_name)
        }
        fn root(&self) -> &Path {
            self.0.root()
        }
    }

    async fn undeletable_service(dir: &TempDir) -> (UploadService, Arc<MemoryRetentionSlot>) {
        let config = UploadConfig::development(dir.path());
        let storage = LocalStorageService::new(dir.path(), "/uploads", "audio", ".mp3")
            .await
            .unwrap();
        let slot = Arc::new(MemoryRetentionSlot::new());
        (
            UploadService::new(Arc::new(UndeletableStorage(storage)), slot.clone(), &config),
            slot,
        )
    }

    fn mp3_candidate(title: &str) -> UploadCandidate {
        let mut bytes = id3v23(&[(b"TIT2", title)]);
        bytes.extend_from_slice(&mpeg_frames(8));
        UploadCandidate::new(Bytes::from(bytes), Some("audio/mpeg".to_string()), "take.mp3")
    }

    async fn service(dir: &TempDir) -> (UploadService, Arc<MemoryRetentionSlot>) {
        let config = UploadConfig::development(dir.path());
        let storage = LocalStorageService::new(dir.path(), "/uploads", "audio", ".mp3")
            .await
            .unwrap();
        let slot = Arc::new(MemoryRetentionSlot::new());
        (
            UploadService::new(Arc::new(storage), slot.clone(), &config),
            slot,
        )
    }

    fn file_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_invalid_type_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (service, slot) = service(&dir).await;

        let candidate = UploadCandidate::new(
            Bytes::from_static(b"ID3 whatever"),
            Some("audio/wav".to_string()),
            "track-01.mp3",
        );
        let err = service.process(candidate).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_TYPE");
        assert_eq!(file_count(&dir), 0);
        assert!(slot.current().await.is_none());
    }

    #[tokio::test]
    async fn test_bad_name_rejected_before_staging() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir).await;

        let candidate = UploadCandidate::new(
            Bytes::from_static(b"ID3 whatever"),
            Some("audio/mpeg".to_string()),
            "../../etc/passwd.mp3",
        );
        let err = service.process(candidate).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_NAME");
        assert_eq!(file_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_signature_mismatch_deletes_staged_file() {
        let dir = TempDir::new().unwrap();
        let (service, slot) = service(&dir).await;

        let candidate = UploadCandidate::new(
            Bytes::from(vec![0u8; 50]),
            Some("audio/mpeg".to_string()),
            "track-01.mp3",
        );
        let err = service.process(candidate).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidContent));
        assert_eq!(file_count(&dir), 0);
        assert!(slot.current().await.is_none());
    }

    #[tokio::test]
    async fn test_parse_failure_deletes_staged_file() {
        let dir = TempDir::new().unwrap();
        let (service, slot) = service(&dir).await;

        let mut bytes = b"ID3\x03\x00\x00\x00\x00\x07\x68".to_vec();
        bytes.extend_from_slice(b"garbage after a lying header");
        let candidate = UploadCandidate::new(
            Bytes::from(bytes),
            Some("audio/mpeg".to_string()),
            "track-01.mp3",
        );
        let err = service.process(candidate).await.unwrap_err();
        assert_eq!(err.code(), "PARSE_ERROR");
        assert_eq!(file_count(&dir), 0);
        assert!(slot.current().await.is_none());
    }

    #[tokio::test]
    async fn test_process_publishes_and_replaces() {
        let dir = TempDir::new().unwrap();
        let (service, slot) = service(&dir).await;

        let first = service.process(mp3_candidate("First")).await.unwrap();
        let second = service.process(mp3_candidate("Second")).await.unwrap();

        assert_ne!(first.path, second.path);
        assert!(!first.path.exists());
        assert_eq!(std::fs::read(&second.path).unwrap(), mpeg_frames(8));
        assert_eq!(slot.current().await.unwrap().path, second.path);
        assert_eq!(file_count(&dir), 1);
    }

    #[tokio::test]
    async fn test_failed_eviction_does_not_fail_the_upload() {
        let dir = TempDir::new().unwrap();
        let (service, slot) = undeletable_service(&dir).await;

        let first = service.process(mp3_candidate("First")).await.unwrap();
        let second = service.process(mp3_candidate("Second")).await.unwrap();

        // The new file is live even though the old one could not be removed.
        assert_eq!(slot.current().await.unwrap().path, second.path);
        assert!(first.path.exists());
        assert!(second.path.exists());
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_rejection_reason() {
        let dir = TempDir::new().unwrap();
        let (service, slot) = undeletable_service(&dir).await;

        let candidate = UploadCandidate::new(
            Bytes::from(vec![0u8; 50]),
            Some("audio/mpeg".to_string()),
            "track-01.mp3",
        );
        let err = service.process(candidate).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidContent));
        assert!(slot.current().await.is_none());
    }
}
