use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// A client upload as received by the HTTP layer, before any check has run.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub file_name: String,
    pub size: usize,
}

impl UploadCandidate {
    pub fn new(bytes: Bytes, content_type: Option<String>, file_name: impl Into<String>) -> Self {
        let size = bytes.len();
        Self {
            bytes,
            content_type,
            file_name: file_name.into(),
            size,
        }
    }
}

/// Bytes written to the upload directory under a generated name, not yet trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub file_name: String,
    pub path: PathBuf,
}

/// What the sanitizer measured while parsing the staged file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioSummary {
    pub duration: Duration,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub removed_tags: Vec<String>,
    /// Bytes left on disk once the tags are gone
    pub stripped_size: u64,
}

/// The one file currently served to every client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFile {
    pub file_name: String,
    pub path: PathBuf,
    pub public_path: String,
    pub size: u64,
    pub published_at: DateTime<Utc>,
    pub audio: AudioSummary,
}

impl PublishedFile {
    pub fn from_staged(staged: StagedFile, public_path: String, audio: AudioSummary) -> Self {
        Self {
            file_name: staged.file_name,
            path: staged.path,
            public_path,
            size: audio.stripped_size,
            published_at: Utc::now(),
            audio,
        }
    }
}
