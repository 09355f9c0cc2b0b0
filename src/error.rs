//! Error types for media-courier
//!
//! This module provides error handling for the library, including:
//! - A structured error taxonomy for the media extractor collaborator
//! - Orchestrator-level errors (session expiry, size limits, single-flight rejection)
//! - HTTP status code mapping for the enumeration API
//! - Per-kind user-facing remediation messages for the message channel

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for media-courier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classified failure kinds reported by the media extractor collaborator.
///
/// The extractor contract returns a structured kind rather than leaving the
/// orchestrator to pattern-match raw upstream messages. Implementations that
/// wrap a CLI tool classify its output once, at the collaborator boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorErrorKind {
    /// Upstream rate limiting or bot detection (sign-in challenge, HTTP 429)
    RateLimited,
    /// Content exists but is private
    PrivateContent,
    /// Content removed, deleted, or otherwise unavailable
    Unavailable,
    /// Content blocked on copyright grounds
    CopyrightBlocked,
    /// Anything the extractor could not classify
    Other,
}

/// Error raised by a [`MediaExtractor`](crate::extractor::MediaExtractor) call
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ExtractorError {
    /// Classified failure kind
    pub kind: ExtractorErrorKind,
    /// Raw message from the underlying extractor, kept for logging and for
    /// surfacing unclassified failures verbatim
    pub message: String,
}

impl ExtractorError {
    /// Create an extractor error with an explicit kind
    pub fn new(kind: ExtractorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create an unclassified extractor error
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ExtractorErrorKind::Other, message)
    }
}

/// Main error type for media-courier
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_file_size_mb")
        key: Option<String>,
    },

    /// Media extractor failure, already classified by the collaborator
    #[error("extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    /// Quality-selection session token not found in the cache (expired or consumed)
    #[error("session expired or already used")]
    SessionExpired,

    /// Requester already has a job in flight (pre-flight rejection, not a job failure)
    #[error("requester {0} already has an active download")]
    AlreadyRunning(String),

    /// Downloaded artifact exceeds the configured size limit
    #[error("file is {size_mb} MB, exceeding the {limit_mb} MB limit")]
    TooLarge {
        /// Actual artifact size in megabytes
        size_mb: u64,
        /// Configured limit in megabytes
        limit_mb: u64,
    },

    /// Message channel delivery failure
    #[error("message channel error: {0}")]
    Channel(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),

    /// Invalid inbound request (bad callback payload, unparseable URL)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// User-facing message for this error, suitable for sending over the
    /// message channel. Classified extractor failures get a specific
    /// remediation message; unclassified ones surface the raw message.
    pub fn user_message(&self) -> String {
        match self {
            Error::Extractor(e) => match e.kind {
                ExtractorErrorKind::RateLimited => {
                    "The source is rate-limiting requests right now. \
                     Please wait a few minutes and try again."
                        .to_string()
                }
                ExtractorErrorKind::PrivateContent => {
                    "This content is private and cannot be downloaded.".to_string()
                }
                ExtractorErrorKind::Unavailable => {
                    "This content is unavailable. It may have been removed.".to_string()
                }
                ExtractorErrorKind::CopyrightBlocked => {
                    "This content is blocked for copyright reasons.".to_string()
                }
                ExtractorErrorKind::Other => format!("Download failed: {}", e.message),
            },
            Error::SessionExpired => {
                "This selection has expired. Please send the link again.".to_string()
            }
            Error::AlreadyRunning(_) => {
                "You already have an active download. Please wait for it to finish.".to_string()
            }
            Error::TooLarge { size_mb, limit_mb } => format!(
                "The file is too large ({size_mb} MB). The limit is {limit_mb} MB. \
                 Try a lower quality."
            ),
            other => format!("Something went wrong: {other}"),
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;
}

impl ToHttpStatus for ExtractorErrorKind {
    fn status_code(&self) -> u16 {
        match self {
            ExtractorErrorKind::RateLimited => 429,
            ExtractorErrorKind::PrivateContent => 403,
            ExtractorErrorKind::Unavailable => 404,
            ExtractorErrorKind::CopyrightBlocked => 403,
            ExtractorErrorKind::Other => 500,
        }
    }
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } | Error::InvalidRequest(_) => 400,
            Error::Extractor(e) => e.kind.status_code(),
            Error::SessionExpired => 410,
            Error::AlreadyRunning(_) => 409,
            Error::TooLarge { .. } => 413,
            Error::Network(_) => 502,
            Error::Channel(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::ApiServer(_)
            | Error::Other(_) => 500,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractor_kinds_map_to_distinct_user_messages() {
        let kinds = [
            ExtractorErrorKind::RateLimited,
            ExtractorErrorKind::PrivateContent,
            ExtractorErrorKind::Unavailable,
            ExtractorErrorKind::CopyrightBlocked,
        ];

        let messages: Vec<String> = kinds
            .iter()
            .map(|&kind| Error::Extractor(ExtractorError::new(kind, "raw")).user_message())
            .collect();

        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b, "each classified kind needs its own message");
            }
        }
    }

    #[test]
    fn unclassified_error_surfaces_raw_message() {
        let err = Error::Extractor(ExtractorError::other("ERROR: weird failure 0x7f"));
        assert!(
            err.user_message().contains("weird failure 0x7f"),
            "unclassified errors should pass the raw message through"
        );
    }

    #[test]
    fn too_large_message_names_both_sizes() {
        let err = Error::TooLarge {
            size_mb: 120,
            limit_mb: 50,
        };
        let msg = err.user_message();
        assert!(msg.contains("120"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn status_codes_follow_api_contract() {
        assert_eq!(
            Error::Extractor(ExtractorError::new(ExtractorErrorKind::RateLimited, "x"))
                .status_code(),
            429
        );
        assert_eq!(
            Error::Extractor(ExtractorError::new(ExtractorErrorKind::Unavailable, "x"))
                .status_code(),
            404
        );
        assert_eq!(
            Error::Extractor(ExtractorError::new(ExtractorErrorKind::PrivateContent, "x"))
                .status_code(),
            403
        );
        assert_eq!(
            Error::InvalidRequest("missing channel parameter".into()).status_code(),
            400
        );
        assert_eq!(Error::Other("boom".into()).status_code(), 500);
    }
}
