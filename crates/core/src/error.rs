//! Error types for dropkit-core

use reqwest::StatusCode;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dropkit-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dropkit-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// Any response whose status is not 200
    #[error("Dropbox API error: {0}")]
    Api(ApiResponse),

    /// Upload rejected with 409, treated as a signal to back off
    #[error("Rate limited: {0}")]
    RateLimit(ApiResponse),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// True when the request never produced an HTTP response
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout | Error::HttpClient(_))
    }

    /// The failed response, for `Api` and `RateLimit` errors
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Error::Api(resp) | Error::RateLimit(resp) => Some(resp),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_connect() {
            Error::Network(err.to_string())
        } else if err.is_request() || err.is_builder() {
            Error::HttpClient(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

/// Snapshot of a non-200 response kept for the caller to inspect.
///
/// The body has already been drained from the connection, so it is stored
/// as text; use [`ApiResponse::json`] to get the decoded form.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
    /// Value of the `Retry-After` header, if the server sent one
    pub retry_after: Option<String>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>, retry_after: Option<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after,
        }
    }

    /// Canonical reason phrase for the status ("Conflict", "Not Found", ...)
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    /// The body decoded as JSON, if it is JSON
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// The `error_summary` field Dropbox puts on error bodies
    pub fn error_summary(&self) -> Option<String> {
        self.json()?
            .get("error_summary")?
            .as_str()
            .map(str::to_string)
    }
}

impl fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.reason())?;
        match self.error_summary() {
            Some(summary) => write!(f, " ({})", summary),
            None if !self.body.is_empty() => write!(f, " ({})", self.body.trim()),
            None => Ok(()),
        }
    }
}
