//! Hierarchical variable scopes.
//!
//! A [`Scope`] owns a map of local variables and an ordered list of parent
//! scopes. Lookups check the locals first and then each parent in declaration
//! order, so the first parent that knows a name wins.
//!
//! Parents are shared through [`Arc`] and can only be attached when the scope
//! is constructed. A scope therefore never references anything younger than
//! itself, which rules out cycles without any runtime check.
//!
//! # Example
//!
//! ```
//! use rest_flow::scope::Scope;
//! use serde_json::json;
//!
//! let company = Scope::with_locals(json!({"company": {"legal_name": "X"}}))
//!     .into_shared();
//! let scope = Scope::new(json!({"email": "a@b"}), vec![company]);
//!
//! assert!(scope.has_variable("company"));
//! assert_eq!(scope.evaluate("company.legal_name"), json!("X"));
//! assert_eq!(scope.evaluate("org.name"), serde_json::Value::Null);
//! ```

pub mod interpolate;

pub use interpolate::{
    interpolate, interpolate_fields, template_references, to_template_string, UNINTERPOLATED_KEYS,
};

use serde_json::{Map, Value};
use std::sync::Arc;

/// A variable namespace with ordered parent scopes.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    locals: Map<String, Value>,
    parents: Vec<Arc<Scope>>,
}

impl Scope {
    /// Creates a scope from a value and a list of existing parents.
    ///
    /// Only an object value contributes locals; `Null` and any other
    /// non-object value produce an empty local map.
    pub fn new(locals: Value, parents: Vec<Arc<Scope>>) -> Self {
        Self {
            locals: into_map(locals),
            parents,
        }
    }

    /// Creates a root scope without parents.
    pub fn with_locals(locals: Value) -> Self {
        Self::new(locals, Vec::new())
    }

    /// Creates a scope from an already-built map.
    pub fn from_map(locals: Map<String, Value>, parents: Vec<Arc<Scope>>) -> Self {
        Self { locals, parents }
    }

    /// Creates an empty root scope.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps the scope so it can be used as a parent of other scopes.
    pub fn into_shared(self) -> Arc<Scope> {
        Arc::new(self)
    }

    pub fn locals(&self) -> &Map<String, Value> {
        &self.locals
    }

    pub fn parents(&self) -> &[Arc<Scope>] {
        &self.parents
    }

    /// Returns true if the name is defined locally or by any ancestor.
    pub fn has_variable(&self, name: &str) -> bool {
        self.locals.contains_key(name) || self.parents.iter().any(|p| p.has_variable(name))
    }

    /// Resolves a single identifier.
    ///
    /// Absence is not an error: unknown names resolve to `Null`.
    pub fn resolve(&self, name: &str) -> Value {
        if let Some(value) = self.locals.get(name) {
            return value.clone();
        }

        self.parents
            .iter()
            .find(|parent| parent.has_variable(name))
            .map(|parent| parent.resolve(name))
            .unwrap_or(Value::Null)
    }

    /// Evaluates a dotted path such as `company.legal_name`.
    ///
    /// The first segment goes through [`Scope::resolve`]; every following
    /// segment indexes into a map. Hitting `Null` or a non-map yields `Null`.
    pub fn evaluate(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let first = match segments.next() {
            Some(first) => first,
            None => return Value::Null,
        };

        let mut current = self.resolve(first);
        for segment in segments {
            current = match current {
                Value::Object(mut map) => map.remove(segment).unwrap_or(Value::Null),
                _ => return Value::Null,
            };
        }
        current
    }

    /// Interpolates a value against this scope. See [`interpolate`].
    pub fn interpolate(&self, value: &Value) -> Value {
        interpolate::interpolate(self, value)
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
