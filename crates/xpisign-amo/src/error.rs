//! Error types for signing API operations

use thiserror::Error;

use crate::client::DEFAULT_REQUEST_TIMEOUT;

/// Signing API errors
#[derive(Debug, Error)]
pub enum AmoError {
    // ============ Configuration Errors ============
    #[error("Invalid API URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Signing took too long to complete (waited {timeout:?})")]
    SigningTimeout { timeout: std::time::Duration },

    // ============ Authentication Errors ============
    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    #[error("Failed to create JWT: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // ============ Response Errors ============
    #[error("Unexpected API response: {message}")]
    InvalidResponse { message: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for signing API operations
pub type Result<T> = std::result::Result<T, AmoError>;

impl From<reqwest::Error> for AmoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AmoError::Timeout {
                seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            }
        } else if e.is_connect() {
            AmoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            AmoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else if e.is_decode() {
            AmoError::InvalidResponse {
                message: e.to_string(),
            }
        } else {
            AmoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for AmoError {
    fn from(e: url::ParseError) -> Self {
        AmoError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
