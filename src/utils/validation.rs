use crate::config::{EXPECTED_EXTENSION, EXPECTED_MIME_TYPE, UploadConfig};
use crate::models::UploadCandidate;
use thiserror::Error;

/// Why a candidate was turned away before touching disk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("MIME type '{0}' is not allowed, only audio/mpeg is accepted")]
    InvalidType(String),

    #[error("File size {size} bytes must be below {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Filename '{0}' is not allowed")]
    InvalidName(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidType(_) => "INVALID_TYPE",
            ValidationError::TooLarge { .. } => "TOO_LARGE",
            ValidationError::InvalidName(_) => "INVALID_NAME",
        }
    }
}

/// Limits the validator enforces, taken from [`UploadConfig`].
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub expected_mime: &'static str,
    pub extension: &'static str,
    pub max_file_size: usize,
    pub max_filename_length: usize,
}

impl ValidationRules {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            expected_mime: EXPECTED_MIME_TYPE,
            extension: EXPECTED_EXTENSION,
            max_file_size: config.max_file_size,
            max_filename_length: config.max_filename_length,
        }
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

/// Declared type must be the expected one. Parameters and case are ignored.
pub fn validate_mime_type(content_type: Option<&str>, rules: &ValidationRules) -> Result<(), ValidationError> {
    let declared = content_type.unwrap_or("");
    let normalized = declared
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if normalized == rules.expected_mime {
        return Ok(());
    }

    Err(ValidationError::InvalidType(declared.to_string()))
}

/// Size must be strictly below the ceiling.
pub fn validate_file_size(size: usize, rules: &ValidationRules) -> Result<(), ValidationError> {
    if size >= rules.max_file_size {
        return Err(ValidationError::TooLarge {
            size,
            max: rules.max_file_size,
        });
    }
    Ok(())
}

fn is_allowed_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '(' | ')' | '.' | ' ')
}

/// Letters, digits, `-_(). ` only, ending in the expected extension with a
/// non-empty stem, and no longer than the configured length.
///
/// The name is never used to build a path; this only rejects names a
/// well-behaved client would not send.
pub fn validate_filename(file_name: &str, rules: &ValidationRules) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidName(file_name.to_string());

    if file_name.chars().count() > rules.max_filename_length {
        return Err(invalid());
    }

    if !file_name.chars().all(is_allowed_filename_char) {
        if file_name.contains("..") || file_name.contains('/') || file_name.contains('\\') {
            tracing::warn!("Path traversal attempt detected: {}", file_name);
        }
        return Err(invalid());
    }

    // ASCII-only at this point, so byte slicing is safe.
    let ext_len = rules.extension.len();
    if file_name.len() <= ext_len {
        return Err(invalid());
    }
    let (_, ext) = file_name.split_at(file_name.len() - ext_len);
    if !ext.eq_ignore_ascii_case(rules.extension) {
        return Err(invalid());
    }

    Ok(())
}

/// Full pre-staging check: type, then size, then name. Stops at the first failure.
pub fn validate_candidate(candidate: &UploadCandidate, rules: &ValidationRules) -> Result<(), ValidationError> {
    validate_mime_type(candidate.content_type.as_deref(), rules)?;
    validate_file_size(candidate.size, rules)?;
    validate_filename(&candidate.file_name, rules)?;
    Ok(())
}
