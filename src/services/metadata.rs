use lofty::config::{ParseOptions, ParsingMode};
use lofty::error::LoftyError;
use lofty::file::{AudioFile, FileType, TaggedFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::TagType;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::AudioSummary;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("File could not be parsed: {0}")]
    Malformed(#[source] LoftyError),

    #[error("Expected an MPEG audio file, found {0}")]
    NotMpeg(String),

    #[error("File contains no playable audio stream")]
    NoAudioStream,

    #[error("Failed to strip tags: {0}")]
    Strip(#[source] LoftyError),

    #[error("Tags still present after stripping: {0:?}")]
    TagsRemain(Vec<String>),

    #[error("Sanitizer task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct MetadataService;

impl MetadataService {
    fn read(path: &Path) -> Result<TaggedFile, LoftyError> {
        let options = ParseOptions::new()
            .read_properties(true)
            .parsing_mode(ParsingMode::Strict);

        let tagged_file = Probe::open(path)?
            .options(options)
            .guess_file_type()?
            .read()?;
        Ok(tagged_file)
    }

    fn tag_types(tagged_file: &TaggedFile) -> Vec<TagType> {
        tagged_file.tags().iter().map(|tag| tag.tag_type()).collect()
    }

    fn tag_names(tag_types: &[TagType]) -> Vec<String> {
        tag_types.iter().map(|t| format!("{:?}", t)).collect()
    }

    /// Parses the whole file, then removes every tag it found in place.
    ///
    /// Only tag types present on the first read are removed: lofty writes an
    /// empty ID3v1 trailer when asked to remove one that is not there.
    ///
    /// A file that does not parse as MPEG audio is rejected before anything is
    /// written. Blocking; see [`MetadataService::sanitize_file`].
    pub fn sanitize(path: &Path) -> Result<AudioSummary, SanitizeError> {
        let tagged_file = Self::read(path).map_err(SanitizeError::Malformed)?;

        let file_type = tagged_file.file_type();
        if file_type != FileType::Mpeg {
            return Err(SanitizeError::NotMpeg(format!("{:?}", file_type)));
        }

        let properties = tagged_file.properties();
        let sample_rate = properties
            .sample_rate()
            .filter(|rate| *rate > 0)
            .ok_or(SanitizeError::NoAudioStream)?;

        let found = Self::tag_types(&tagged_file);
        let mut summary = AudioSummary {
            duration: properties.duration(),
            bitrate_kbps: properties.audio_bitrate(),
            sample_rate: Some(sample_rate),
            channels: properties.channels(),
            removed_tags: Self::tag_names(&found),
            stripped_size: 0,
        };

        for tag_type in found {
            tag_type
                .remove_from_path(path)
                .map_err(SanitizeError::Strip)?;
        }

        let stripped = Self::read(path).map_err(SanitizeError::Malformed)?;
        let remaining = Self::tag_names(&Self::tag_types(&stripped));
        if !remaining.is_empty() {
            return Err(SanitizeError::TagsRemain(remaining));
        }
        summary.stripped_size = std::fs::metadata(path)?.len();

        tracing::debug!(
            path = %path.display(),
            duration_ms = summary.duration.as_millis() as u64,
            sample_rate,
            removed = ?summary.removed_tags,
            "Sanitized audio file"
        );

        Ok(summary)
    }

    /// [`MetadataService::sanitize`] on the blocking pool.
    pub async fn sanitize_file(path: PathBuf) -> Result<AudioSummary, SanitizeError> {
        tokio::task::spawn_blocking(move || Self::sanitize(&path))
            .await
            .map_err(|e| SanitizeError::Task(e.to_string()))?
    }
}
