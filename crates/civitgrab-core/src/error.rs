//! Error types for civitgrab.
//!
//! Every failure a job or a reconciliation run can hit is a variant of
//! [`CivitError`]. [`CivitError::kind`] folds the variants into the coarse
//! categories the batch driver reports.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the civitgrab library.
#[derive(Debug, Error)]
pub enum CivitError {
    // Input errors
    #[error("Could not find model ID in input \u{201c}{input}\u{201d}")]
    Parse { input: String },

    // Lookup errors
    #[error("Could not find version {version_id} of model {model_id}")]
    VersionNotFound { model_id: u64, version_id: u64 },

    #[error("Could not find {generation} version of model {model_id}")]
    NoDefaultGenerationVersion { model_id: u64, generation: String },

    #[error("Could not find any checkpoint files in version {version_id}")]
    NoCheckpointFiles { version_id: u64 },

    #[error("Could not find model with ID \u{201c}{model_id}\u{201d}")]
    ModelNotFound { model_id: u64 },

    // Network errors
    #[error("Could not fetch model {model_id}: {message}")]
    Fetch {
        model_id: u64,
        status: Option<u16>,
        message: String,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // Catalog errors
    #[error("Target file \u{201c}{0}\u{201d} does not exist")]
    CatalogMissing(PathBuf),

    #[error("Invalid catalog {path:?}: {message}")]
    InvalidCatalog { path: PathBuf, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for civitgrab operations.
pub type Result<T> = std::result::Result<T, CivitError>;

/// Coarse failure category used when reporting job outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed model reference.
    Parse,
    /// Version, file or model could not be located.
    Lookup,
    /// Metadata service answered with an error or an unexpected shape.
    Fetch,
    /// An artifact stream failed after the retry budget ran out.
    Download,
    /// Catalog reconciliation precondition failed.
    Reconcile,
    /// Local filesystem or serialization failure.
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Lookup => "lookup",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Download => "download",
            ErrorKind::Reconcile => "reconcile",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<std::io::Error> for CivitError {
    fn from(err: std::io::Error) -> Self {
        CivitError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CivitError {
    fn from(err: serde_json::Error) -> Self {
        CivitError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_yaml::Error> for CivitError {
    fn from(err: serde_yaml::Error) -> Self {
        CivitError::Yaml {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for CivitError {
    fn from(err: reqwest::Error) -> Self {
        CivitError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CivitError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CivitError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Category of this error for batch reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CivitError::Parse { .. } => ErrorKind::Parse,

            CivitError::VersionNotFound { .. }
            | CivitError::NoDefaultGenerationVersion { .. }
            | CivitError::NoCheckpointFiles { .. }
            | CivitError::ModelNotFound { .. } => ErrorKind::Lookup,

            CivitError::Fetch { .. } => ErrorKind::Fetch,

            CivitError::Network { .. }
            | CivitError::DownloadFailed { .. }
            | CivitError::HashMismatch { .. } => ErrorKind::Download,

            CivitError::CatalogMissing(_) | CivitError::InvalidCatalog { .. } => {
                ErrorKind::Reconcile
            }

            CivitError::Io { .. }
            | CivitError::Json { .. }
            | CivitError::Yaml { .. }
            | CivitError::Other(_) => ErrorKind::Io,
        }
    }
}
