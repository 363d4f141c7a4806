//! Error types for project loading, request building and session orchestration.
//!
//! Unresolved template references are deliberately absent from this taxonomy:
//! they evaluate to `Null` (or an empty string inside a larger template) rather
//! than failing.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of named resource that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Action,
    Flow,
    Session,
    Context,
}

impl ResourceKind {
    /// Returns the lowercase name of the resource kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Action => "action",
            ResourceKind::Flow => "flow",
            ResourceKind::Session => "session",
            ResourceKind::Context => "context",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that abort an operation.
#[derive(Debug, Error)]
pub enum Error {
    /// An action, flow, session or context name does not exist in the project.
    #[error("Unknown {kind}: {name}")]
    NotFound {
        /// What was being looked up
        kind: ResourceKind,
        /// The name that failed to resolve
        name: String,
    },

    /// A stored definition exists but could not be parsed.
    #[error("Malformed configuration in {}: {message}", path.display())]
    MalformedConfig {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The interpolated action cannot be turned into a request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Error::MalformedConfig {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
