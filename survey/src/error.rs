use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the survey core.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// An answer arrived without one of its ratings.
    #[error("incomplete answer: missing {missing}")]
    Validation { missing: &'static str },
    /// No real photo matched any synthetic image.
    #[error("no image pairs available")]
    EmptyUniverse,
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("failed to list {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SurveyError {
    /// Whether the caller should simply re-prompt for the same question.
    pub fn is_validation(&self) -> bool {
        matches!(self, SurveyError::Validation { .. })
    }
}

/// Failures raised while persisting responses.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("sink rejected rows with status {status}")]
    Rejected { status: u16 },
    #[error("failed to encode rows: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenience result type used throughout this crate.
pub type Result<T> = std::result::Result<T, SurveyError>;
