//! File-backed project store.
//!
//! A project is a directory laid out as follows:
//!
//! ```text
//! <root>/rest-flow.yaml                        optional settings
//! <root>/actions/**/<name>.yaml                action definitions
//! <root>/flows/**/<name>.yaml                  flow definitions
//! <root>/contexts/<context>/<variant>.yaml     context variables
//! <root>/sessions/<name>/session.yaml          persisted sessions
//! ```
//!
//! Contexts are addressed as `context` (meaning the `default` variant) or
//! `context/variant`.

pub mod store;

pub use store::{load_yaml_map, write_yaml_file, yaml_files_under};

use crate::action::{Action, ActionRef};
use crate::config::{load_settings, Settings};
use crate::error::{Error, ResourceKind, Result};
use crate::flow::Flow;
use crate::scope::Scope;
use crate::session::Session;
use log::debug;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Variant used when a context is named without one.
pub const DEFAULT_VARIANT: &str = "default";

/// Name of the session returned by [`Project::default_session`].
pub const DEFAULT_SESSION_NAME: &str = "default";

const DEFAULT_SESSION_TITLE: &str = "Default Session";

const YAML_EXTENSION: &str = ".yaml";

/// A project directory and its settings.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    settings: Settings,
}

impl Project {
    /// Opens a project, loading `rest-flow.yaml` when present.
    ///
    /// Relative paths are resolved against the current directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = absolute_path(path.as_ref())?;
        let settings = load_settings(&root)?;
        Ok(Self { root, settings })
    }

    /// Creates a project handle with explicit settings, ignoring any
    /// settings file.
    pub fn with_settings(path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            root: path.into(),
            settings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The project name: the final component of its path.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Creates the top-level project directories.
    pub fn create_skeleton(&self) -> Result<()> {
        for dir in [
            self.actions_path(),
            self.flows_path(),
            self.contexts_path(),
            self.sessions_path(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    // ===== ACTIONS =====

    pub fn actions_path(&self) -> PathBuf {
        self.root.join("actions")
    }

    /// Sorted action names, relative to the actions directory and without
    /// the `.yaml` extension (e.g. `messages/post`).
    pub fn action_names(&self) -> Result<Vec<String>> {
        yaml_names_under(&self.actions_path())
    }

    pub fn action_file_path(&self, action_name: &str) -> PathBuf {
        self.actions_path().join(with_yaml_extension(action_name))
    }

    /// Loads the raw data of an action, adding its `action_name`.
    ///
    /// Returns `Ok(None)` when no such action exists.
    pub fn action_data_named(&self, action_name: &str) -> Result<Option<Map<String, Value>>> {
        let path = self.action_file_path(action_name);
        if !path.is_file() {
            return Ok(None);
        }

        let mut data = load_yaml_map(&path)?;
        data.insert(
            "action_name".to_string(),
            Value::String(action_name.to_string()),
        );
        Ok(Some(data))
    }

    /// Loads an action, failing with [`Error::NotFound`] when it is missing.
    pub fn action_named(&self, action_name: &str) -> Result<Action> {
        self.action_data_named(action_name)?
            .map(|data| Action::new(action_name, data))
            .ok_or_else(|| Error::not_found(ResourceKind::Action, action_name))
    }

    /// Turns a reference into an action, loading it when referenced by name.
    pub fn resolve_action(&self, action_ref: &ActionRef) -> Result<Action> {
        match action_ref {
            ActionRef::Named(name) => self.action_named(name),
            ActionRef::Inline(fields) => Ok(Action::inline(fields.clone())),
        }
    }

    pub fn write_action_yaml(&self, action_name: &str, yaml: &str) -> Result<PathBuf> {
        let path = self.action_file_path(action_name);
        write_yaml_file(&path, yaml)?;
        Ok(path)
    }

    // ===== FLOWS =====

    pub fn flows_path(&self) -> PathBuf {
        self.root.join("flows")
    }

    pub fn flow_names(&self) -> Result<Vec<String>> {
        yaml_names_under(&self.flows_path())
    }

    pub fn flow_file_path(&self, flow_name: &str) -> PathBuf {
        self.flows_path().join(with_yaml_extension(flow_name))
    }

    /// Loads a flow, failing with [`Error::NotFound`] when it is missing.
    pub fn flow_named(&self, flow_name: &str) -> Result<Flow> {
        let path = self.flow_file_path(flow_name);
        if !path.is_file() {
            return Err(Error::not_found(ResourceKind::Flow, flow_name));
        }

        let data = load_yaml_map(&path)?;
        Flow::from_data(flow_name, data).map_err(|e| Error::malformed(&path, e))
    }

    pub fn write_flow_yaml(&self, flow_name: &str, yaml: &str) -> Result<PathBuf> {
        let path = self.flow_file_path(flow_name);
        write_yaml_file(&path, yaml)?;
        Ok(path)
    }

    // ===== CONTEXTS =====

    pub fn contexts_path(&self) -> PathBuf {
        self.root.join("contexts")
    }

    /// Sorted context names. Only directories count; hidden ones are skipped.
    pub fn context_names(&self) -> Result<Vec<String>> {
        let dir = self.contexts_path();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Sorted variant names of one context.
    pub fn variants_of_context(&self, context_name: &str) -> Result<Vec<String>> {
        let dir = self.contexts_path().join(context_name);
        if !dir.is_dir() {
            return Err(Error::not_found(ResourceKind::Context, context_name));
        }

        let mut variants = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = name.strip_suffix(YAML_EXTENSION) {
                if entry.file_type()?.is_file() {
                    variants.push(stem.to_string());
                }
            }
        }
        variants.sort();
        Ok(variants)
    }

    /// Path of the variables file for `context` or `context/variant`.
    pub fn variant_path_for_context(&self, context_or_variant: &str) -> PathBuf {
        let (context, variant) = split_context_name(context_or_variant);
        self.contexts_path()
            .join(context)
            .join(with_yaml_extension(variant))
    }

    /// Variables of a context variant; a missing variant file yields an
    /// empty map.
    pub fn variables_for_context(&self, context_or_variant: &str) -> Result<Map<String, Value>> {
        let path = self.variant_path_for_context(context_or_variant);
        if path.is_file() {
            load_yaml_map(&path)
        } else {
            Ok(Map::new())
        }
    }

    /// Variables of a context variant that must exist.
    pub fn context_variables(&self, context_or_variant: &str) -> Result<Map<String, Value>> {
        let path = self.variant_path_for_context(context_or_variant);
        if !path.is_file() {
            return Err(Error::not_found(ResourceKind::Context, context_or_variant));
        }
        load_yaml_map(&path)
    }

    /// Loads a context variant that must exist as a shareable scope.
    pub fn context_scope(&self, context_or_variant: &str) -> Result<Arc<Scope>> {
        let variables = self.context_variables(context_or_variant)?;
        Ok(Scope::from_map(variables, Vec::new()).into_shared())
    }

    /// Contexts included in every session after the explicit ones.
    pub fn default_context_names(&self) -> Result<Vec<String>> {
        match &self.settings.default_contexts {
            Some(names) => Ok(names.clone()),
            None => self.context_names(),
        }
    }

    /// Writes a context variant from a variable map.
    pub fn create_context(
        &self,
        context_or_variant: &str,
        variables: &Map<String, Value>,
    ) -> Result<PathBuf> {
        let yaml = serde_yaml::to_string(variables)?;
        self.write_context_yaml(context_or_variant, &yaml)
    }

    pub fn write_context_yaml(&self, context_or_variant: &str, yaml: &str) -> Result<PathBuf> {
        let path = self.variant_path_for_context(context_or_variant);
        write_yaml_file(&path, yaml)?;
        Ok(path)
    }

    /// Builds the parent scopes of a session.
    ///
    /// Explicit contexts come first, in the given order, and must exist.
    /// Default contexts follow, skipping any context already named
    /// explicitly (in any variant); a missing default variant contributes no
    /// variables.
    pub fn compose_contexts(&self, explicit: &[String]) -> Result<Vec<Arc<Scope>>> {
        let mut seen: Vec<String> = Vec::new();
        let mut scopes = Vec::new();

        for name in explicit {
            let (context, _) = split_context_name(name);
            if seen.iter().any(|s| s == context) {
                debug!("context '{}' listed twice, keeping the first variant", context);
                continue;
            }
            seen.push(context.to_string());
            scopes.push(self.context_scope(name)?);
        }

        for name in self.default_context_names()? {
            let (context, _) = split_context_name(&name);
            if seen.iter().any(|s| s == context) {
                continue;
            }
            let variables = self.variables_for_context(&name)?;
            scopes.push(Scope::from_map(variables, Vec::new()).into_shared());
        }

        Ok(scopes)
    }

    // ===== SESSIONS =====

    pub fn sessions_path(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn session_path(&self, session_name: &str) -> PathBuf {
        self.sessions_path().join(session_name)
    }

    /// Sorted names of the session directories.
    pub fn session_names(&self) -> Result<Vec<String>> {
        let dir = self.sessions_path();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Creates and immediately persists a session.
    pub fn create_session(
        &self,
        session_name: &str,
        context_names: Vec<String>,
        variables: Map<String, Value>,
    ) -> Result<Session> {
        Session::create(self, session_name, context_names, variables)
    }

    /// Creates and persists a session carrying a display title.
    pub fn create_titled_session(
        &self,
        session_name: &str,
        title: &str,
        context_names: Vec<String>,
        variables: Map<String, Value>,
    ) -> Result<Session> {
        let session =
            Session::new(self, session_name, context_names, variables)?.with_title(title);
        session.save()?;
        Ok(session)
    }

    /// Opens a persisted session by name.
    pub fn open_session(&self, session_name: &str) -> Result<Session> {
        Session::load(self, self.session_path(session_name))
    }

    /// The `default` session: persisted state when it exists on disk,
    /// otherwise a fresh session with no explicit contexts.
    pub fn default_session(&self) -> Result<Session> {
        let path = self.session_path(DEFAULT_SESSION_NAME);
        if path.is_dir() {
            Session::load(self, path)
        } else {
            Ok(Session::new(self, DEFAULT_SESSION_NAME, Vec::new(), Map::new())?
                .with_title(DEFAULT_SESSION_TITLE))
        }
    }

    /// An unsaved session composed from the given contexts.
    pub fn session_with_contexts(&self, context_names: Vec<String>) -> Result<Session> {
        Session::unsaved(self, context_names, Map::new())
    }

    /// An unsaved session holding the given variables.
    pub fn session_with_variables(&self, variables: Map<String, Value>) -> Result<Session> {
        Session::unsaved(self, Vec::new(), variables)
    }
}

/// Splits `context/variant` into its parts, defaulting the variant.
pub fn split_context_name(name: &str) -> (&str, &str) {
    match name.split_once('/') {
        Some((context, variant)) if !variant.is_empty() => {
            (context, variant.strip_suffix(YAML_EXTENSION).unwrap_or(variant))
        }
        Some((context, _)) => (context, DEFAULT_VARIANT),
        None => (name, DEFAULT_VARIANT),
    }
}

fn with_yaml_extension(name: &str) -> String {
    if name.ends_with(YAML_EXTENSION) {
        name.to_string()
    } else {
        format!("{}{}", name, YAML_EXTENSION)
    }
}

fn yaml_names_under(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = yaml_files_under(dir)?
        .iter()
        .filter_map(|path| path.strip_prefix(dir).ok())
        .map(|relative| {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            name.strip_suffix(YAML_EXTENSION).unwrap_or(&name).to_string()
        })
        .collect();
    names.sort();
    Ok(names)
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
