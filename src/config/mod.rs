use clap::ValueEnum;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// The only container format the service accepts.
pub const EXPECTED_MIME_TYPE: &str = "audio/mpeg";
pub const EXPECTED_EXTENSION: &str = ".mp3";

/// What the process runs.
///
/// The orphan sweeper has to see the retention slot to know which file is
/// live, and the slot lives in the API process. There is no sweeper-only mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// HTTP API only; orphaned staged files are left on disk
    Api,
    /// HTTP API plus the orphan sweeper over the same slot
    All,
}

impl RunMode {
    pub fn runs_sweeper(self) -> bool {
        matches!(self, RunMode::All)
    }
}

/// Configuration for the upload pipeline and its HTTP surface
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory holding staged and published files (default: "uploads")
    pub upload_dir: PathBuf,

    /// URL prefix the upload directory is served under (default: "/uploads")
    pub public_path: String,

    /// Static assets served as the router fallback (default: "public")
    pub static_dir: PathBuf,

    /// Multipart field carrying the file, also the generated-name prefix (default: "audio")
    pub field_name: String,

    /// Exclusive upper bound on upload size in bytes (default: 7,000,000)
    pub max_file_size: usize,

    /// Inclusive upper bound on client filename length (default: 70)
    pub max_filename_length: usize,

    /// Unpublished files older than this are swept (default: 1 hour)
    pub orphan_max_age_secs: u64,

    /// Sweep period (default: 10 minutes)
    pub sweep_interval_secs: u64,

    /// Third-party search endpoint; search is disabled when unset
    pub search_api_url: Option<String>,
    /// Key forwarded to the search endpoint
    pub search_api_key: Option<String>,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            public_path: "/uploads".to_string(),
            static_dir: PathBuf::from("public"),
            field_name: "audio".to_string(),
            max_file_size: 7_000_000,
            max_filename_length: 70,
            orphan_max_age_secs: 60 * 60,
            sweep_interval_secs: 10 * 60,
            search_api_url: None,
            search_api_key: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            public_path: env::var("PUBLIC_UPLOAD_PATH")
                .ok()
                .map(|v| normalize_public_path(&v))
                .unwrap_or(default.public_path),

            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.static_dir),

            field_name: env::var("UPLOAD_FIELD_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.field_name),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_filename_length: env::var("MAX_FILENAME_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_filename_length),

            orphan_max_age_secs: env::var("ORPHAN_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.orphan_max_age_secs),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &u64| *v > 0)
                .unwrap_or(default.sweep_interval_secs),

            search_api_url: env::var("SEARCH_API_URL").ok().filter(|v| !v.is_empty()),
            search_api_key: env::var("SEARCH_API_KEY").ok().filter(|v| !v.is_empty()),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Config rooted at a throwaway directory, with search disabled
    pub fn development(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }

    pub fn orphan_max_age(&self) -> Duration {
        Duration::from_secs(self.orphan_max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// "/uploads/", "uploads" and "/uploads" all become "/uploads"
fn normalize_public_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    format!("/{}", trimmed)
}
