//! Error types for the XS2A gateway.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::path::PathBuf;

/// Errors from the bank transport layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Client certificate or key could not be loaded
    #[error("Cannot load client identity from {}: {message}", .path.display())]
    Certificate {
        /// File that failed to load
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// URL could not be composed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid request (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from the bank
        message: String,
    },

    /// Rejected credentials or consent (401/403 response)
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Error message from the bank
        message: String,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a certificate loading error.
    #[must_use]
    pub fn certificate(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Certificate { path: path.into(), message: message.into() }
    }

    /// Map a non-success status and its body to the matching variant.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::BadRequest { message },
            401 | 403 => Self::Unauthorized { status, message },
            404 => Self::NotFound { resource: message },
            500..=599 => Self::Server { status, message },
            _ => Self::UnexpectedStatus { status, message },
        }
    }

    /// HTTP status reported by the bank, if the error came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { .. } => Some(400),
            Self::NotFound { .. } => Some(404),
            Self::Unauthorized { status, .. }
            | Self::Server { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from the authorization flow and account data operations.
#[derive(thiserror::Error, Debug)]
pub enum AisError {
    /// Startup misconfiguration; the process must not serve traffic
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Session token is missing or unknown
    #[error("Invalid state")]
    InvalidState,

    /// Session exists but has not completed the token exchange
    #[error("Unauthorized: please login first")]
    Unauthorized,

    /// Inbound request is missing a required parameter
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bank API failure (transport, status or body)
    #[error("Upstream error: {0}")]
    Upstream(#[from] ClientError),

    /// Request body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AisError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns true for session errors that the caller can fix by logging in again.
    #[must_use]
    pub const fn is_session_error(&self) -> bool {
        matches!(self, Self::InvalidState | Self::Unauthorized)
    }

    /// Convert to the message shown to the browser application.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::InvalidState => "Invalid State".to_string(),
            Self::Unauthorized => "Please login first".to_string(),
            Self::Upstream(err) => format!("Data error: {err}"),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for transport operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for flow operations.
pub type AisResult<T> = Result<T, AisError>;
