//! HTTP response data models.
//!
//! This module defines the response returned by a transport: status line,
//! ordered headers and raw body bytes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Represents an HTTP response received from a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    ///
    /// Zero when the transport failed before any status line was received.
    pub status_code: u16,

    /// HTTP status text (e.g., "OK", "Not Found").
    ///
    /// Holds the transport error message when `status_code` is zero.
    pub status_text: String,

    /// Protocol version from the status line, e.g. "HTTP/1.1".
    pub http_version: String,

    /// Response headers in the order they were received.
    ///
    /// Lookups are case-insensitive and return the first match.
    pub headers: Vec<(String, String)>,

    /// Response body as raw bytes.
    ///
    /// Kept as `Vec<u8>` so binary responses survive untouched.
    pub body: Vec<u8>,

    /// Total request duration from start to completion.
    pub duration: Duration,
}

impl HttpResponse {
    /// Creates a new HttpResponse with the given status code and text.
    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            http_version: "HTTP/1.1".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            duration: Duration::from_secs(0),
        }
    }

    /// Creates the response recorded when the transport itself failed.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// Returns the status line, e.g. `HTTP/1.1 200 OK`.
    pub fn status_line(&self) -> String {
        format!("{} {} {}", self.http_version, self.status_code, self.status_text)
    }

    /// Checks if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Checks if the transport failed before receiving a status.
    pub fn is_transport_failure(&self) -> bool {
        self.status_code == 0
    }

    /// Returns the first value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns the declared Content-Length, or 0 when absent or invalid.
    pub fn content_length(&self) -> u64 {
        self.header("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Returns true when the media type is `application/json` or `*/*+json`.
    ///
    /// Parameters such as `charset` are ignored.
    pub fn is_json(&self) -> bool {
        self.content_type().map_or(false, is_json_media_type)
    }

    /// Attempts to parse the response body as UTF-8 text.
    pub fn body_as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    /// Adds a header to the response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Sets the response body.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }
}

/// Checks a Content-Type value for a JSON media type.
pub fn is_json_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if media_type == "application/json" {
        return true;
    }

    match media_type.split_once('/') {
        Some((kind, subtype)) => !kind.is_empty() && subtype.len() > 5 && subtype.ends_with("+json"),
        None => false,
    }
}
