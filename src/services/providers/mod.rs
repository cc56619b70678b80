/// External model providers
///
/// The selector and the try-on cache talk to language and image models only
/// through these traits. Calls never raise: every outcome is a `CallResult`,
/// and callers decide how to degrade.
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod openai;

pub use openai::OpenAiProvider;

/// Broad class of an external call failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No credentials configured; the call was never attempted
    NotConfigured,
    Timeout,
    Network,
    /// Non-2xx status not covered by a more specific kind
    Status,
    /// Rejected credentials or an unverified organization
    Permission,
    /// Quota exhausted or rate limited
    RateLimited,
    /// Response arrived but did not have the expected shape
    BadResponse,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::NotConfigured => "not configured",
            FailureKind::Timeout => "timeout",
            FailureKind::Network => "network error",
            FailureKind::Status => "unexpected status",
            FailureKind::Permission => "permission denied",
            FailureKind::RateLimited => "quota or rate limit exceeded",
            FailureKind::BadResponse => "bad response",
        };
        write!(f, "{}", name)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CallFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl CallFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type CallResult<T> = Result<T, CallFailure>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Body of a chat-completion request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// Chat-completion capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends one request and returns the first choice's message content
    async fn complete(&self, request: &ChatRequest) -> CallResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Image-composition capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageProvider: Send + Sync {
    /// Edits `base` using `garments` as references; returns the decoded image
    async fn compose(
        &self,
        base: &Path,
        garments: &[PathBuf],
        instruction: &str,
    ) -> CallResult<Vec<u8>>;

    fn name(&self) -> &'static str;
}

/// Maps a transport error to a failure kind
pub(crate) fn classify_transport(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_decode() {
        FailureKind::BadResponse
    } else {
        FailureKind::Network
    }
}

/// Maps a non-2xx status to a failure kind
pub(crate) fn classify_status(status: reqwest::StatusCode) -> FailureKind {
    match status.as_u16() {
        401 | 403 => FailureKind::Permission,
        429 => FailureKind::RateLimited,
        408 | 504 => FailureKind::Timeout,
        _ => FailureKind::Status,
    }
}

/// Builds an HTTP client whose requests cannot outlive `timeout`
pub fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
