//! Settings schema for a rest-flow project.
//!
//! This module defines the settings structure and validation logic for
//! everything a project can configure in its `rest-flow.yaml` file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Project-wide settings.
///
/// Missing settings fall back to defaults; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Request timeout in milliseconds, enforced by the HTTP transport.
    ///
    /// Defaults to 30000ms. Must be greater than 0.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether the HTTP transport follows 3xx redirects. Defaults to true.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow. Defaults to 10.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Whether to validate TLS certificates. Defaults to true.
    ///
    /// **Warning:** Disabling validation exposes requests to interception.
    #[serde(default = "default_validate_ssl")]
    pub validate_ssl: bool,

    /// Headers added to every request unless the action sets them itself.
    #[serde(default = "default_headers")]
    pub default_headers: BTreeMap<String, String>,

    /// Contexts included in every session after the explicit ones.
    ///
    /// When unset, the default variant of every context in the project is
    /// included.
    #[serde(default)]
    pub default_contexts: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            validate_ssl: default_validate_ssl(),
            default_headers: default_headers(),
            default_contexts: None,
        }
    }
}

impl Settings {
    /// Validates the settings and returns a message for the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if let Some(name) = self
            .default_headers
            .keys()
            .find(|name| name.trim().is_empty())
        {
            return Err(format!("defaultHeaders contains an empty header name: {:?}", name));
        }

        Ok(())
    }

    /// Returns the timeout as a `Duration`.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Merges with `other`, whose values take precedence.
    ///
    /// Default headers are combined, with `other` winning on conflicts.
    pub fn merge(&self, other: &Settings) -> Self {
        let mut default_headers = self.default_headers.clone();
        default_headers.extend(other.default_headers.clone());

        Self {
            timeout: other.timeout,
            follow_redirects: other.follow_redirects,
            max_redirects: other.max_redirects,
            validate_ssl: other.validate_ssl,
            default_headers,
            default_contexts: other
                .default_contexts
                .clone()
                .or_else(|| self.default_contexts.clone()),
        }
    }
}

// Default value functions for serde

fn default_timeout() -> u64 {
    30000
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> u32 {
    10
}

fn default_validate_ssl() -> bool {
    true
}

fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(
        "User-Agent".to_string(),
        concat!("rest-flow/", env!("CARGO_PKG_VERSION")).to_string(),
    );
    headers
}
