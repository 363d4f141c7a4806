//! Transport error types.
//!
//! These describe failures to get any response at all. A session does not
//! abort on them: the failure is recorded as a status-0 response and the
//! run continues.

use thiserror::Error;

/// Errors that can occur while sending a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Connection failures, DNS resolution errors and other network-level
    /// issues.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The request took longer than the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The target could not be used as a URL, typically because it is still
    /// relative after `base_url` resolution.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Certificate validation errors, handshake failures and other TLS
    /// issues.
    #[error("TLS/SSL error: {0}")]
    TlsError(String),

    /// The HTTP client could not be configured or the request assembled.
    #[error("Request build error: {0}")]
    BuildError(String),

    /// Writing a request or response dump failed.
    #[error("Dump error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_builder() {
            RequestError::BuildError(message)
        } else if message.contains("certificate") || message.contains("TLS") || message.contains("SSL")
        {
            RequestError::TlsError(message)
        } else if err.is_connect() {
            RequestError::NetworkError(format!("Connection failed: {}", message))
        } else {
            RequestError::NetworkError(message)
        }
    }
}

impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrl(err.to_string())
    }
}
