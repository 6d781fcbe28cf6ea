//! Error types for model invocation
//!
//! [`UpstreamError`] is what a [`crate::ModelClient`] reports for a failed
//! call. [`UpstreamError::classify`] maps it onto the handful of kinds the
//! invoker reacts to. [`InvokeError`] is what callers of the invoker see.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Prefix of every user-visible invocation error.
pub const ERROR_SENTINEL: &str = "GEMINI ERROR: ";

/// Guidance attached to quota failures.
pub const QUOTA_REMEDIATION: &str = "Quota exceeded. Please wait a few minutes and try again, or check your API billing/quota settings.";

static RETRY_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"retry in ([\d.]+)s").expect("valid retry-delay regex"));

/// Why the model refused to produce output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Safety,
    Recitation,
    Other,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safety => write!(f, "Safety filter blocked."),
            Self::Recitation => write!(f, "Content recitation blocked."),
            Self::Other => write!(f, "Generation blocked for other reasons."),
        }
    }
}

/// A failed call as reported by the model service.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamError {
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Service status name such as `RESOURCE_EXHAUSTED`
    pub status_text: Option<String>,
    pub message: String,
    /// Delay suggested through structured retry information
    pub retry_delay: Option<Duration>,
}

impl UpstreamError {
    /// An error with only a free-text description.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            status_text: None,
            message: message.into(),
            retry_delay: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    /// Maps the error onto the kinds the invoker distinguishes.
    ///
    /// Structured status codes decide first. Free-tier limits of zero are
    /// recognised before generic quota errors since both mention quotas.
    /// Errors without a telling status fall back to substring matching.
    pub fn classify(&self) -> ErrorKind {
        let lower = self.message.to_lowercase();

        if lower.contains("free_tier") && lower.contains("limit: 0") {
            return ErrorKind::QuotaExhaustedAtZero;
        }

        match (self.status, self.status_text.as_deref()) {
            (Some(429), _) | (_, Some("RESOURCE_EXHAUSTED")) => return ErrorKind::RateLimited,
            (Some(404), _) | (_, Some("NOT_FOUND")) => return ErrorKind::ModelUnavailable,
            _ => {}
        }

        if lower.contains("429") || lower.contains("quota") || lower.contains("rate limit") {
            ErrorKind::RateLimited
        } else if lower.contains("404")
            || lower.contains("not found")
            || lower.contains("not supported")
        {
            ErrorKind::ModelUnavailable
        } else {
            ErrorKind::Other
        }
    }

    /// How long the service asked us to wait, if it said so.
    ///
    /// Structured retry information wins. Otherwise a `retry in <secs>s`
    /// phrase in the message is used with `buffer` added.
    pub fn suggested_delay(&self, buffer: Duration) -> Option<Duration> {
        if let Some(delay) = self.retry_delay {
            return Some(delay);
        }
        let lower = self.message.to_lowercase();
        let seconds: f64 = RETRY_IN.captures(&lower)?.get(1)?.as_str().parse().ok()?;
        Duration::try_from_secs_f64(seconds)
            .ok()
            .map(|delay| delay.saturating_add(buffer))
    }
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// Classification of an [`UpstreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient; retried on the same model after a backoff
    RateLimited,
    /// The model does not exist or cannot generate content
    ModelUnavailable,
    /// The free tier grants this model no quota at all
    QuotaExhaustedAtZero,
    /// Anything else; surfaced immediately
    Other,
}

impl ErrorKind {
    pub fn is_quota(self) -> bool {
        matches!(self, Self::RateLimited | Self::QuotaExhaustedAtZero)
    }
}

/// Failure of a whole invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvokeError {
    #[error("GEMINI ERROR: {reason}")]
    Blocked { reason: BlockReason },

    #[error("GEMINI ERROR: Empty response from LLM.")]
    EmptyResponse,

    #[error("GEMINI ERROR: {message}")]
    Other { message: String },

    #[error("GEMINI ERROR: {} Last error: {last_error}", QUOTA_REMEDIATION)]
    QuotaExceeded { last_error: String },

    #[error("GEMINI ERROR: All models failed. Last error: {last_error}")]
    AllModelsFailed { last_error: String },
}

impl InvokeError {
    /// Whether a smaller prompt cannot help.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
