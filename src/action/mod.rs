//! Declarative request templates.
//!
//! An action is a map of fields describing one HTTP call (`method`, `url` or
//! `scheme`/`host`/`port`/`path`, `headers`, `query`, `json_body`, `body`,
//! `username`/`password`) plus an optional `outputs` map describing which
//! variables to derive from the response. Every field except the metadata
//! keys may contain templates.

use crate::scope::{interpolate_fields, Scope};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name used for inline actions that carry neither a title nor a name.
pub const INLINE_ACTION_NAME: &str = "inline";

/// A reference to an action: either its name in the project or the action
/// data itself.
///
/// Flow files list steps as plain strings or inline maps, which is exactly
/// how this type deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionRef {
    Named(String),
    Inline(Map<String, Value>),
}

impl ActionRef {
    pub fn named(name: impl Into<String>) -> Self {
        ActionRef::Named(name.into())
    }

    /// Builds an inline reference from a JSON object; other values yield an
    /// empty action.
    pub fn inline(data: Value) -> Self {
        match data {
            Value::Object(map) => ActionRef::Inline(map),
            _ => ActionRef::Inline(Map::new()),
        }
    }

    /// A short label for logs and dump directory names.
    pub fn label(&self) -> String {
        match self {
            ActionRef::Named(name) => name.clone(),
            ActionRef::Inline(fields) => inline_name(fields),
        }
    }
}

impl From<&str> for ActionRef {
    fn from(name: &str) -> Self {
        ActionRef::Named(name.to_string())
    }
}

impl From<String> for ActionRef {
    fn from(name: String) -> Self {
        ActionRef::Named(name)
    }
}

/// A loaded action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    name: String,
    fields: Map<String, Value>,
}

impl Action {
    pub fn new(name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Wraps inline action data, deriving its name from `action_name` or
    /// `title` when present.
    pub fn inline(fields: Map<String, Value>) -> Self {
        let name = inline_name(&fields);
        Self { name, fields }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw, uninterpolated fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Human-readable title: the `title` field, falling back to the name.
    pub fn title(&self) -> String {
        self.fields
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.name.clone())
    }

    /// The declared output expressions, if any.
    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        self.fields.get("outputs").and_then(Value::as_object)
    }

    /// Interpolates the request fields against a scope, leaving the
    /// metadata keys untouched.
    pub fn interpolate(&self, scope: &Scope) -> Map<String, Value> {
        interpolate_fields(scope, &self.fields)
    }
}

fn inline_name(fields: &Map<String, Value>) -> String {
    ["action_name", "title"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .unwrap_or(INLINE_ACTION_NAME)
        .to_string()
}
