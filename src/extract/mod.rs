//! Deriving variables from a response.
//!
//! An action's `outputs` map names new variables and gives a template for
//! each. The templates are interpolated against a scope whose locals are the
//! parsed JSON response body and whose parent is the session, so outputs may
//! combine response fields with existing session variables.

use crate::models::HttpResponse;
use crate::scope::Scope;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key under which a non-object JSON body is exposed to output templates.
pub const BODY_VARIABLE: &str = "body";

/// The variables a response contributes to output templates.
///
/// Object bodies contribute their members. Other JSON documents are exposed
/// under `body`. Non-JSON and unparsable bodies contribute nothing.
pub fn response_variables(response: &HttpResponse) -> Map<String, Value> {
    if !response.is_json() {
        return Map::new();
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert(BODY_VARIABLE.to_string(), other);
            map
        }
        Err(e) => {
            warn!("response declared JSON but could not be parsed: {}", e);
            Map::new()
        }
    }
}

/// The scope output templates are evaluated in.
pub fn response_scope(response: &HttpResponse, session: Arc<Scope>) -> Scope {
    Scope::from_map(response_variables(response), vec![session])
}

/// Evaluates output templates against a response.
///
/// Returns `None` when the action declares no outputs.
pub fn extract_outputs(
    outputs: Option<&Map<String, Value>>,
    response: &HttpResponse,
    session: Arc<Scope>,
) -> Option<Map<String, Value>> {
    let outputs = outputs?;
    let scope = response_scope(response, session);

    let values: Map<String, Value> = outputs
        .iter()
        .map(|(name, template)| (name.clone(), scope.interpolate(template)))
        .collect();

    debug!(
        "extracted outputs: {}",
        values.keys().cloned().collect::<Vec<_>>().join(", ")
    );
    Some(values)
}
