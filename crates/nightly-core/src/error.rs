//! Error taxonomy for scheduling a decision task.

use std::path::PathBuf;

use nightly_jsone::RenderError;

/// Errors that abort a scheduling run. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The repository is not reachable as an HTTPS GitHub remote
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("git error: {0}")]
    Git(String),

    /// `.taskcluster.yml` is missing or is not valid YAML
    #[error("failed to load template {}: {reason}", path.display())]
    TemplateLoad { path: PathBuf, reason: String },

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The rendered template did not produce exactly one usable task
    #[error("unexpected rendered shape: {0}")]
    Shape(String),

    /// The queue rejected the task or could not be reached
    #[error("task submission failed: {0}")]
    Submission(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ScheduleError {
    fn from(err: reqwest::Error) -> Self {
        ScheduleError::Submission(err.to_string())
    }
}

/// Result type for scheduling operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
