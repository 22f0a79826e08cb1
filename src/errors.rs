/*!
 * Error types for the stbatch application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with translation backends
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The call did not complete before its deadline
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::ConnectionError(format!("timeout: {}", error))
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while reading or writing subtitle files
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// An entry is missing its timespan line
    #[error("Malformed subtitle entry '{id}' near line {line}: {message}")]
    MalformedEntry {
        /// Identifier of the broken entry
        id: String,
        /// One-based line number where the entry started
        line: usize,
        /// What is wrong with it
        message: String,
    },

    /// Underlying file system error
    #[error("Subtitle file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the batch translation pipeline
#[derive(Error, Debug)]
pub enum TranslationError {
    /// A single segment does not fit into the batch budget; fatal for the run
    #[error("Segment {id} is too large to process: {size} characters exceed the batch budget of {budget}")]
    SegmentTooLarge {
        /// Identifier of the offending segment
        id: String,
        /// Size of its formatted block (with reference)
        size: usize,
        /// Configured budget
        budget: usize,
    },

    /// The backend call failed outright
    #[error("Transport error: {0}")]
    Transport(#[from] ProviderError),

    /// The backend answered, but not in the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A translated block is disproportionately longer than its source
    #[error("Translated block {index} has {translated} characters for a source of {original}")]
    OversizeTranslation {
        /// Zero-based position of the block inside the batch
        index: usize,
        /// Length of the translated text
        translated: usize,
        /// Length of the source text
        original: usize,
    },

    /// Every attempt of a batch failed
    #[error("Failed to translate segments after {attempts} attempts: {last}")]
    ExhaustedRetries {
        /// Number of attempts made
        attempts: u32,
        /// The error of the final attempt
        last: Box<TranslationError>,
    },

    /// The run was cancelled before this work completed
    #[error("Translation cancelled")]
    Cancelled,
}

impl TranslationError {
    /// Whether another attempt of the same batch may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::MalformedResponse(_) | Self::OversizeTranslation { .. }
        )
    }

    /// Classification used for per-segment error state
    pub fn kind(&self) -> SegmentErrorKind {
        match self {
            Self::SegmentTooLarge { .. } => SegmentErrorKind::Sizing,
            Self::Transport(_) => SegmentErrorKind::Transport,
            Self::MalformedResponse(_) => SegmentErrorKind::MalformedResponse,
            Self::OversizeTranslation { .. } => SegmentErrorKind::OversizeTranslation,
            Self::ExhaustedRetries { .. } => SegmentErrorKind::ExhaustedRetries,
            Self::Cancelled => SegmentErrorKind::Cancelled,
        }
    }
}

/// Kind of failure recorded on a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentErrorKind {
    Sizing,
    Transport,
    MalformedResponse,
    OversizeTranslation,
    ExhaustedRetries,
    Cancelled,
}

impl fmt::Display for SegmentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sizing => "sizing",
            Self::Transport => "transport",
            Self::MalformedResponse => "malformed-response",
            Self::OversizeTranslation => "oversize-translation",
            Self::ExhaustedRetries => "exhausted-retries",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Error tag attached to a single segment of a result.
///
/// Unlike [`TranslationError`] this is cheap to clone, so one batch failure can
/// be stamped on every segment of the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SegmentError {
    /// Classification of the failure
    pub kind: SegmentErrorKind,
    /// Human readable description
    pub message: String,
}

impl From<&TranslationError> for SegmentError {
    fn from(error: &TranslationError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<TranslationError> for SegmentError {
    fn from(error: TranslationError) -> Self {
        Self::from(&error)
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
