use std::path::PathBuf;

use cv_core::{PayloadError, RequestError, SlotFailure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("usage: cv-app <job.json>")]
    Usage,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CV_API_KEY is not set (set CV_OFFLINE=1 to use the synthetic endpoint)")]
    MissingApiKey,

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid job file: {0}")]
    Job(#[from] serde_json::Error),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("generation failed: {} ({})", .0.message, .0.kind)]
    Generation(SlotFailure),

    #[error("nothing was generated")]
    NothingGenerated,

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("generation task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}
