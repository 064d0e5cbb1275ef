use std::path::PathBuf;
use thiserror::Error;

/// Everything that can fail while loading, importing or exporting a schedule.
///
/// Bad individual records never end up here; they are skipped where they are read.
#[derive(Error, Debug)]
pub enum GanttError {
    /// The request never produced a response
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("API error from {endpoint}: {status} - {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// A response or file body could not be decoded
    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// Reading or writing a file failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A P6 export is structurally unusable
    #[error("Invalid XER file: {0}")]
    Xer(String),

    /// The settings file exists but cannot be used
    #[error("Invalid config at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Writing an export failed
    #[error("CSV export failed")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GanttError>;

impl GanttError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GanttError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            GanttError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
