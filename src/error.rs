use std::result;

use crate::retry::RetryableError;
use thiserror::Error;

/// Error types for corpus harvesting operations
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Remote search was unavailable or rejected the query
    #[error("Search failed in {database} for query {query:?}: {message}")]
    SearchError {
        database: String,
        query: String,
        message: String,
    },

    /// Fetching raw documents failed for an identifier (or identifier group)
    #[error("Fetch failed for identifier {id}: {message}")]
    FetchError { id: String, message: String },

    /// A raw document could not be parsed
    #[error("Malformed document for identifier {id}: {message}")]
    ParseError { id: String, message: String },

    /// XML parsing failed before the identifier is known
    #[error("XML parsing failed: {0}")]
    XmlError(String),

    /// The publication date column held a value that is not a date
    #[error("Invalid pub_date {value:?} at row {row}")]
    DateCoercionError { row: usize, value: String },

    /// A chunk worker failed; wraps the chunk-local error
    #[error("Chunk {chunk} (starting at identifier {first_id}) failed: {source}")]
    ChunkFailed {
        chunk: usize,
        first_id: String,
        #[source]
        source: Box<CorpusError>,
    },

    /// A chunk worker panicked or was cancelled
    #[error("Worker for chunk {chunk} did not complete: {message}")]
    WorkerFailed { chunk: usize, message: String },

    /// A path expression could not be compiled
    #[error("Invalid path expression {expression:?}: {message}")]
    InvalidPath { expression: String, message: String },

    /// Run or client configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Database family name not recognised
    #[error("Unknown database: {0} (expected \"pubmed\" or \"pmc\")")]
    UnknownDatabase(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// API error with HTTP status code
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// API rate limit exceeded
    #[error("API rate limit exceeded")]
    RateLimitExceeded,

    /// IO error for file operations
    #[error("IO error: {message}")]
    IoError { message: String },
}

pub type Result<T> = result::Result<T, CorpusError>;

impl CorpusError {
    /// Attach the failing identifier to a context-free XML error.
    ///
    /// Errors that already carry an identifier are returned unchanged.
    pub fn with_identifier(self, id: &str) -> Self {
        match self {
            CorpusError::XmlError(message) => CorpusError::ParseError {
                id: id.to_string(),
                message,
            },
            other => other,
        }
    }
}

impl From<std::io::Error> for CorpusError {
    fn from(err: std::io::Error) -> Self {
        CorpusError::IoError {
            message: err.to_string(),
        }
    }
}

impl RetryableError for CorpusError {
    fn is_retryable(&self) -> bool {
        match self {
            CorpusError::RequestError(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }

                // Server errors (5xx) and throttling
                if let Some(status) = err.status() {
                    return status.is_server_error() || status.as_u16() == 429;
                }

                !err.is_builder() && !err.is_redirect() && !err.is_decode()
            }

            CorpusError::RateLimitExceeded => true,

            CorpusError::ApiError { status, message } => {
                (*status >= 500 && *status < 600) || *status == 429 || {
                    let lower_msg = message.to_lowercase();
                    lower_msg.contains("temporarily unavailable")
                        || lower_msg.contains("timeout")
                        || lower_msg.contains("connection")
                }
            }

            CorpusError::SearchError { .. }
            | CorpusError::FetchError { .. }
            | CorpusError::ParseError { .. }
            | CorpusError::XmlError(_)
            | CorpusError::DateCoercionError { .. }
            | CorpusError::ChunkFailed { .. }
            | CorpusError::WorkerFailed { .. }
            | CorpusError::InvalidPath { .. }
            | CorpusError::InvalidConfig(_)
            | CorpusError::UnknownDatabase(_)
            | CorpusError::JsonError(_)
            | CorpusError::IoError { .. } => false,
        }
    }

    fn retry_reason(&self) -> &str {
        if self.is_retryable() {
            match self {
                CorpusError::RequestError(err) if err.is_timeout() => "Request timeout",
                CorpusError::RequestError(err) if err.is_connect() => "Connection error",
                CorpusError::RequestError(_) => "Network error",
                CorpusError::RateLimitExceeded => "Rate limit exceeded",
                CorpusError::ApiError { status, .. } => match status {
                    429 => "Rate limit exceeded",
                    500..=599 => "Server error",
                    _ => "Temporary API error",
                },
                _ => "Transient error",
            }
        } else {
            match self {
                CorpusError::JsonError(_) => "Invalid JSON response",
                CorpusError::XmlError(_) | CorpusError::ParseError { .. } => {
                    "Invalid XML response"
                }
                CorpusError::InvalidConfig(_) | CorpusError::InvalidPath { .. } => {
                    "Invalid input"
                }
                CorpusError::IoError { .. } => "File system error",
                _ => "Non-transient error",
            }
        }
    }
}
