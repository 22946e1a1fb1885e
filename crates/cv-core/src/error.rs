use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification attached to every failure coming back from a generation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    ServiceUnavailable,
    ServerError,
    InvalidRequest,
    Unauthorized,
    Timeout,
    Cancelled,
    Transport,
    Decode,
    /// The endpoint answered but produced nothing of the expected kind.
    EmptyOutput,
    Other,
}

impl ErrorKind {
    /// Maps an HTTP status code onto a classification.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            503 => Self::ServiceUnavailable,
            500 => Self::ServerError,
            401 | 403 => Self::Unauthorized,
            408 | 504 => Self::Timeout,
            400 | 404 | 413 | 422 => Self::InvalidRequest,
            _ => Self::Other,
        }
    }

    /// Only transient server-side conditions are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServiceUnavailable | Self::ServerError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::ServerError => "server_error",
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::EmptyOutput => "empty_output",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the retry loop can inspect for a classification.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct GenError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GenError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "generation cancelled")
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {}ms", limit.as_millis()),
        )
    }

    pub fn unsupported(what: &str) -> Self {
        Self::new(ErrorKind::InvalidRequest, format!("{what} is not supported by this endpoint"))
    }
}

impl Classify for GenError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Batch-level precondition failures. These reject a whole operation before any slot runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("batch width must be at least 1")]
    ZeroWidth,

    #[error("instruction must not be empty")]
    EmptyInstruction,

    #[error("input {index} carries no data")]
    EmptyInput { index: usize },

    #[error("input {index} has no media type")]
    MissingMediaType { index: usize },

    #[error("a line-item batch needs at least one item")]
    NoItems,

    #[error("line item {index} is blank")]
    BlankItem { index: usize },
}

/// Illegal transitions on a batch's slot collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot {index} is out of range for a batch of {width}")]
    OutOfRange { index: usize, width: usize },

    #[error("slot {index} has already settled")]
    AlreadySettled { index: usize },

    #[error("slot {index} can only settle to a terminal state")]
    NotTerminal { index: usize },
}
