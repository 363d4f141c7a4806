//! Turns an action reference into a concrete request.
//!
//! Building happens in two stages. First the action is loaded and its fields
//! are interpolated against a scope made of the per-request variables, any
//! extra contexts, and the session. Then the interpolated fields are mapped
//! onto a [`RequestDescriptor`].

use super::uri::RequestUri;
use crate::action::{Action, ActionRef};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::{Credentials, HttpMethod, RequestDescriptor};
use crate::project::Project;
use crate::scope::{to_template_string, Scope};
use log::trace;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Per-request additions layered over the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    /// Contexts (`context` or `context/variant`) consulted before the
    /// session, in order.
    pub contexts: Vec<String>,

    /// Variables that take precedence over everything else.
    pub variables: Map<String, Value>,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.contexts.push(context.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

/// The result of building one request.
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    /// The action as loaded, before interpolation.
    pub action: Action,

    /// Interpolated fields. Metadata keys such as `outputs` are verbatim.
    pub fields: Map<String, Value>,

    pub descriptor: RequestDescriptor,
}

impl BuiltRequest {
    /// Output expressions declared by the action.
    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        self.fields.get("outputs").and_then(Value::as_object)
    }
}

/// Builds requests for one project against a fixed session scope.
pub struct RequestBuilder<'a> {
    project: &'a Project,
    session_scope: Arc<Scope>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(project: &'a Project, session_scope: Arc<Scope>) -> Self {
        Self {
            project,
            session_scope,
        }
    }

    /// The scope an action is interpolated against.
    ///
    /// Lookup order: per-request variables, then each extra context in the
    /// given order, then the session.
    pub fn scope(&self, options: &BuildOptions) -> Result<Scope> {
        let mut parents = Vec::with_capacity(options.contexts.len() + 1);
        for context in &options.contexts {
            parents.push(self.project.context_scope(context)?);
        }
        parents.push(Arc::clone(&self.session_scope));

        Ok(Scope::from_map(options.variables.clone(), parents))
    }

    /// Loads and interpolates an action without building a request.
    pub fn request_data(
        &self,
        action_ref: &ActionRef,
        options: &BuildOptions,
    ) -> Result<(Action, Map<String, Value>, Scope)> {
        let action = self.project.resolve_action(action_ref)?;
        let scope = self.scope(options)?;
        let fields = action.interpolate(&scope);
        Ok((action, fields, scope))
    }

    /// Builds the request for an action.
    pub fn build(&self, action_ref: &ActionRef, options: &BuildOptions) -> Result<BuiltRequest> {
        let (action, fields, scope) = self.request_data(action_ref, options)?;
        let descriptor = descriptor_from_fields(&fields, &scope, self.project.settings())?;
        trace!("built {} {} for {}", descriptor.method, descriptor.uri, action.name());

        Ok(BuiltRequest {
            action,
            fields,
            descriptor,
        })
    }
}

/// Maps interpolated action fields onto a request descriptor.
///
/// `base_url` is read from the fields, falling back to the scope. Default
/// headers from the settings are added only when the action does not set a
/// header of the same name.
pub fn descriptor_from_fields(
    fields: &Map<String, Value>,
    scope: &Scope,
    settings: &Settings,
) -> Result<RequestDescriptor> {
    let method = match fields.get("method") {
        None | Some(Value::Null) => HttpMethod::default(),
        Some(value) => {
            let name = to_template_string(value);
            HttpMethod::parse(&name)
                .ok_or_else(|| Error::InvalidRequest(format!("unsupported method '{}'", name)))?
        }
    };

    let mut uri = target_uri(fields)?;
    let base_url = match fields.get("base_url") {
        Some(value) if !value.is_null() => value.clone(),
        _ => scope.evaluate("base_url"),
    };
    let base = RequestUri::from_value(&base_url)?;
    uri = uri.resolve_against(base.as_ref())?;

    if let Some(query) = fields.get("query") {
        let pairs = expand_pairs("query", query)?;
        uri.append_query(pairs.iter().map(|(k, v)| (k.as_str(), v.clone())));
    }

    let mut descriptor = RequestDescriptor::new(method, uri);

    if let Some(headers) = fields.get("headers") {
        for (name, value) in expand_pairs("headers", headers)? {
            descriptor.add_header(name, value);
        }
    }

    match (fields.get("json_body"), fields.get("body")) {
        (Some(json_body), _) if !json_body.is_null() => {
            descriptor.body = Some(serde_json::to_vec(json_body)?);
            if !descriptor.has_header("Content-Type") {
                descriptor.add_header("Content-Type", "application/json");
            }
        }
        (_, Some(body)) if !body.is_null() => {
            descriptor.body = Some(to_template_string(body).into_bytes());
        }
        _ => {}
    }

    if let Some(username) = fields.get("username").filter(|v| !v.is_null()) {
        descriptor.credentials = Some(Credentials {
            username: to_template_string(username),
            password: fields
                .get("password")
                .filter(|v| !v.is_null())
                .map(to_template_string),
        });
    }

    for (name, value) in &settings.default_headers {
        if !descriptor.has_header(name) {
            descriptor.add_header(name.clone(), value.clone());
        }
    }

    Ok(descriptor)
}

/// The target named by `url`, or by the URI component fields.
fn target_uri(fields: &Map<String, Value>) -> Result<RequestUri> {
    if let Some(uri) = fields.get("url").map(RequestUri::from_value).transpose()?.flatten() {
        return Ok(uri);
    }
    RequestUri::from_components(fields)
}

/// Flattens a header or query map into name/value pairs.
///
/// List values become one pair per element; `Null` values are dropped.
fn expand_pairs(field: &str, value: &Value) -> Result<Vec<(String, String)>> {
    let map = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(Error::InvalidRequest(format!(
                "'{}' must be a mapping, got {}",
                field, other
            )))
        }
    };

    let mut pairs = Vec::new();
    for (name, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| (name.clone(), to_template_string(item))),
            ),
            other => pairs.push((name.clone(), to_template_string(other))),
        }
    }
    Ok(pairs)
}
