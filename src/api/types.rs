//! Wire types and the error taxonomy for the ingestion service.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::IngestRequest;

/// Form body posted to the ingestion endpoint.
#[derive(Debug, Serialize)]
pub(super) struct IngestForm<'a> {
    pub input_text: &'a str,
    pub pattern_type: &'static str,
    pub pattern: &'a str,
    pub max_file_size: u32,
}

impl<'a> From<&'a IngestRequest> for IngestForm<'a> {
    fn from(request: &'a IngestRequest) -> Self {
        Self {
            input_text: request.repository_url(),
            pattern_type: request.pattern_mode().as_str(),
            pattern: request.pattern(),
            max_file_size: request.max_file_size_kb(),
        }
    }
}

/// Structured (JSON) answer from the ingestion endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct StructuredPayload {
    pub summary: Option<String>,
    pub tree: Option<String>,
    pub content: Option<String>,
    #[serde(alias = "ingestId")]
    pub ingest_id: Option<String>,
}

/// Repository metadata returned by the GitHub API (only the star count is used).
#[derive(Debug, Deserialize)]
pub(super) struct RepoInfo {
    #[serde(default)]
    pub stargazers_count: u64,
}

// ============================================================================
// Error taxonomy
// ============================================================================

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP 429; never retried automatically
    RateLimited,
    /// No response within the request budget
    Timeout,
    /// Transport failure or non-success HTTP status
    Network,
    /// Response received but the digest could not be located
    ParseFailure,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Whether offering a retry makes sense without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Network)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "Too many requests. Please try again later.",
            ErrorKind::Timeout => "Request timed out",
            ErrorKind::Network => "Failed to connect to server. Is it running?",
            ErrorKind::ParseFailure => "Failed to parse repository data",
            ErrorKind::Unknown => "An unknown error occurred",
        }
    }
}

/// Failure of a single ingestion request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("Rate limit exceeded (HTTP 429)")]
    RateLimited,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{}", network_message(.status, .message))]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to parse repository data: {0}")]
    ParseFailure(String),

    /// Deliberate cancellation by the caller. Never shown to the user.
    #[error("Request was cancelled")]
    Cancelled,

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

fn network_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP error (status {}): {}", code, message),
        None => format!("Network error: {}", message),
    }
}

impl IngestError {
    pub(super) fn http_status(status: u16, message: impl Into<String>) -> Self {
        if status == 429 {
            return IngestError::RateLimited;
        }
        IngestError::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    pub(super) fn transport(err: &reqwest::Error) -> Self {
        IngestError::Network {
            status: None,
            message: err.to_string(),
        }
    }

    /// Category shown to the user; `None` for cancellation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            IngestError::RateLimited => Some(ErrorKind::RateLimited),
            IngestError::Timeout(_) => Some(ErrorKind::Timeout),
            IngestError::Network { .. } => Some(ErrorKind::Network),
            IngestError::ParseFailure(_) => Some(ErrorKind::ParseFailure),
            IngestError::Cancelled => None,
            IngestError::Unknown(_) => Some(ErrorKind::Unknown),
        }
    }

    /// HTTP status carried by a network failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            IngestError::Network { status, .. } => *status,
            IngestError::RateLimited => Some(429),
            _ => None,
        }
    }
}
