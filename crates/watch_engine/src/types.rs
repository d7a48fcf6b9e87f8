use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use watch_core::Validators;

/// Source of "now"; injected so version ids are deterministic under test.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    NotModified,
    Fetched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub status: FetchStatus,
    /// Empty for `NotModified`.
    pub body: String,
    /// Validators sent with this response; absent headers are `None`.
    pub validators: Validators,
}

impl FetchResult {
    pub fn not_modified(validators: Validators) -> Self {
        Self {
            status: FetchStatus::NotModified,
            body: String::new(),
            validators,
        }
    }

    pub fn fetched(body: String, validators: Validators) -> Self {
        Self {
            status: FetchStatus::Fetched,
            body,
            validators,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
    /// Number of attempts made before giving up.
    pub attempts: u32,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 1,
        }
    }

    pub(crate) fn exhausted(self, attempts: u32) -> Self {
        Self {
            message: format!("gave up after {attempts} attempts: {}", self.message),
            attempts,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl FailureKind {
    /// Everything except a malformed URL is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::InvalidUrl)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
