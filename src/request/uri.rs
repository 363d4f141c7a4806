//! Target URI resolution.
//!
//! An action names its target either as a string, as a map of URI components
//! (`scheme`, `host`, `port`, `path`) or, when built programmatically, as a
//! ready [`Url`]. Relative targets are joined against `base_url` when one is
//! defined; absolute targets are never rewritten.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use url::{form_urlencoded, Url};

const DEFAULT_SCHEME: &str = "https";

/// A request target, absolute or relative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestUri {
    Absolute(Url),
    /// A relative reference kept verbatim, e.g. `messages/unread`.
    Relative(String),
}

impl RequestUri {
    /// Parses a string, treating anything without a scheme as relative.
    pub fn parse(input: &str) -> Result<Self> {
        match Url::parse(input) {
            Ok(url) => Ok(RequestUri::Absolute(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(RequestUri::Relative(input.to_string()))
            }
            Err(e) => Err(Error::InvalidRequest(format!("invalid URI '{}': {}", input, e))),
        }
    }

    /// Builds a URI from its components.
    ///
    /// Without a `host` the port is dropped and the result is the relative
    /// `path`. With a `host` but no `scheme`, the scheme defaults to https.
    pub fn from_components(components: &Map<String, Value>) -> Result<Self> {
        let path = component_str(components, "path").unwrap_or_default();

        let host = match component_str(components, "host") {
            Some(host) if !host.is_empty() => host,
            _ => return Ok(RequestUri::Relative(path)),
        };

        let scheme = component_str(components, "scheme").unwrap_or_else(|| DEFAULT_SCHEME.to_string());
        let mut url = Url::parse(&format!("{}://{}", scheme, host))
            .map_err(|e| Error::InvalidRequest(format!("invalid host '{}': {}", host, e)))?;

        if let Some(port) = component_port(components)? {
            url.set_port(Some(port))
                .map_err(|_| Error::InvalidRequest(format!("cannot set port {} on {}", port, url)))?;
        }
        if !path.is_empty() {
            url.set_path(&path);
        }

        Ok(RequestUri::Absolute(url))
    }

    /// Converts an interpolated value into a URI.
    ///
    /// Returns `None` for `Null`.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Self::parse(s).map(Some),
            Value::Object(components) => Self::from_components(components).map(Some),
            other => Err(Error::InvalidRequest(format!(
                "cannot build a URI from {}",
                other
            ))),
        }
    }

    /// Joins a relative URI against an absolute base.
    ///
    /// Absolute URIs, and any URI when the base is missing or itself
    /// relative, come back unchanged.
    pub fn resolve_against(self, base: Option<&RequestUri>) -> Result<Self> {
        match (self, base) {
            (RequestUri::Relative(reference), Some(RequestUri::Absolute(base))) => base
                .join(&reference)
                .map(RequestUri::Absolute)
                .map_err(|e| {
                    Error::InvalidRequest(format!(
                        "cannot resolve '{}' against '{}': {}",
                        reference, base, e
                    ))
                }),
            (uri, _) => Ok(uri),
        }
    }

    /// Appends query pairs, keeping any query already present.
    pub fn append_query<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let pairs: Vec<(&str, String)> = pairs.into_iter().collect();
        if pairs.is_empty() {
            return;
        }

        match self {
            RequestUri::Absolute(url) => {
                let mut query = url.query_pairs_mut();
                for (key, value) in pairs {
                    query.append_pair(key, &value);
                }
            }
            RequestUri::Relative(reference) => {
                let mut serializer = form_urlencoded::Serializer::new(String::new());
                for (key, value) in pairs {
                    serializer.append_pair(key, &value);
                }
                let encoded = serializer.finish();
                reference.push(if reference.contains('?') { '&' } else { '?' });
                reference.push_str(&encoded);
            }
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, RequestUri::Absolute(_))
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            RequestUri::Absolute(url) => Some(url),
            RequestUri::Relative(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RequestUri::Absolute(url) => url.as_str(),
            RequestUri::Relative(reference) => reference,
        }
    }
}

impl From<Url> for RequestUri {
    fn from(url: Url) -> Self {
        RequestUri::Absolute(url)
    }
}

impl fmt::Display for RequestUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn component_str(components: &Map<String, Value>, key: &str) -> Option<String> {
    match components.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn component_port(components: &Map<String, Value>) -> Result<Option<u16>> {
    let invalid = |v: &Value| Error::InvalidRequest(format!("invalid port {}", v));
    match components.get("port") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .map(Some)
            .ok_or_else(|| invalid(&Value::Number(n.clone()))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| invalid(&Value::String(s.clone()))),
        Some(other) => Err(invalid(other)),
    }
}
