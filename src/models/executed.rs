//! Record of a request that went through a transport.

use super::{HttpResponse, RequestDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A request together with the response it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedRequest {
    /// Sequence identifier, unique within the session directory.
    pub identifier: u32,

    /// Name of the action that produced the request.
    pub action_name: String,

    pub request: RequestDescriptor,

    pub response: HttpResponse,

    /// Directory holding the request and response dumps; unsaved sessions
    /// write none.
    pub dump_directory: Option<PathBuf>,

    pub executed_at: DateTime<Utc>,
}

impl ExecutedRequest {
    pub fn new(
        identifier: u32,
        action_name: impl Into<String>,
        request: RequestDescriptor,
        response: HttpResponse,
        dump_directory: Option<PathBuf>,
    ) -> Self {
        Self {
            identifier,
            action_name: action_name.into(),
            request,
            response,
            dump_directory,
            executed_at: Utc::now(),
        }
    }

    /// Declared length of the response body, or the received length when
    /// the response does not declare one.
    pub fn content_length(&self) -> u64 {
        match self.response.content_length() {
            0 => self.response.body.len() as u64,
            declared => declared,
        }
    }

    /// Whether the response carries a JSON media type.
    pub fn is_json(&self) -> bool {
        self.response.is_json()
    }
}
