//! Template interpolation over JSON-compatible values.
//!
//! The only template syntax is `{{identifier(.identifier)*}}` where an
//! identifier is made of ASCII letters, digits and underscores. A string that
//! consists of exactly one template is replaced by the referenced value
//! itself, keeping its type, which lets a template expand to a map or a list.
//! Templates embedded in a larger string are replaced by the string form of
//! their value, with `Null` rendering as the empty string.

use super::Scope;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Action keys that are metadata and never interpolated.
pub const UNINTERPOLATED_KEYS: &[&str] = &["outputs", "title", "action_name"];

/// Matches a string that is a single template and nothing else.
static WHOLE_TEMPLATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\{([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\}\}$")
        .expect("Failed to compile whole template regex")
});

/// Matches every template occurrence inside a string.
static TEMPLATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\}\}")
        .expect("Failed to compile template regex")
});

/// Interpolates a value against a scope.
///
/// Maps and lists are rebuilt with every member interpolated; numbers,
/// booleans and `Null` pass through unchanged.
///
/// # Examples
///
/// ```
/// use rest_flow::scope::{interpolate, Scope};
/// use serde_json::json;
///
/// let scope = Scope::with_locals(json!({"x": 5, "list": [1, 2]}));
///
/// assert_eq!(interpolate(&scope, &json!("a{{x}}b")), json!("a5b"));
/// assert_eq!(interpolate(&scope, &json!("{{list}}")), json!([1, 2]));
/// ```
pub fn interpolate(scope: &Scope, value: &Value) -> Value {
    match value {
        Value::String(text) => interpolate_str(scope, text),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, member)| (key.clone(), interpolate(scope, member)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|item| interpolate(scope, item)).collect()),
        other => other.clone(),
    }
}

fn interpolate_str(scope: &Scope, text: &str) -> Value {
    if !text.contains("{{") {
        return Value::String(text.to_string());
    }

    if let Some(caps) = WHOLE_TEMPLATE_REGEX.captures(text) {
        return scope.evaluate(&caps[1]);
    }

    let rendered = TEMPLATE_REGEX.replace_all(text, |caps: &Captures| {
        to_template_string(&scope.evaluate(&caps[1]))
    });
    Value::String(rendered.into_owned())
}

/// Interpolates the fields of an action.
///
/// Keys listed in [`UNINTERPOLATED_KEYS`] keep their original template
/// values; every other field is interpolated. Key order is preserved.
pub fn interpolate_fields(scope: &Scope, fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| {
            let value = if UNINTERPOLATED_KEYS.contains(&key.as_str()) {
                value.clone()
            } else {
                interpolate(scope, value)
            };
            (key.clone(), value)
        })
        .collect()
}

/// Renders a value the way it appears inside a larger string.
pub fn to_template_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Lists the distinct template expressions referenced anywhere in a value,
/// in order of first appearance.
pub fn template_references(value: &Value) -> Vec<String> {
    let mut references = Vec::new();
    collect_references(value, &mut references);
    references
}

fn collect_references(value: &Value, references: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            for caps in TEMPLATE_REGEX.captures_iter(text) {
                let expression = caps[1].to_string();
                if !references.contains(&expression) {
                    references.push(expression);
                }
            }
        }
        Value::Object(map) => map.values().for_each(|v| collect_references(v, references)),
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, references)),
        _ => {}
    }
}
