//! Sessions: the long-lived root scope requests run against.
//!
//! A session owns a list of context names and its own variables, persisted in
//! `sessions/<name>/session.yaml`. Every executed request gets a dump
//! directory `sessions/<name>/requests/<id>-<action>/`, where `id` continues
//! the highest identifier already on disk. Outputs extracted from responses
//! are merged into the session variables (last write wins) and the session is
//! saved after each request.
//!
//! Unsaved sessions ([`Session::unsaved`]) have no directory: their requests
//! are numbered in memory, no dumps are written and nothing is persisted.

use crate::action::ActionRef;
use crate::error::{Error, ResourceKind, Result};
use crate::extract::extract_outputs;
use crate::flow::FlowRun;
use crate::models::{ExecutedRequest, HttpResponse};
use crate::project::{load_yaml_map, write_yaml_file, Project};
use crate::request::{BuildOptions, BuiltRequest, RequestBuilder};
use crate::scope::Scope;
use crate::transport::dump::write_response_dump;
use crate::transport::{DumpPaths, Transport};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File holding the persisted session state.
pub const SESSION_FILE_NAME: &str = "session.yaml";

const REQUESTS_DIR: &str = "requests";

/// Name reported by sessions that have no directory.
pub const UNSAVED_SESSION_NAME: &str = "unsaved";

/// Persisted form of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, alias = "environments")]
    pub contexts: Vec<String>,

    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// A request dump directory found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedRequest {
    pub identifier: u32,
    pub action_name: String,
    pub directory: PathBuf,
}

/// An open session.
#[derive(Debug, Clone)]
pub struct Session {
    project: Project,
    name: String,
    title: Option<String>,
    directory: Option<PathBuf>,
    context_names: Vec<String>,
    variables: Map<String, Value>,
    parents: Vec<Arc<Scope>>,
    executed: Vec<ExecutedRequest>,
}

impl Session {
    /// Composes a session in `sessions/<name>` without persisting it yet.
    pub fn new(
        project: &Project,
        name: &str,
        context_names: Vec<String>,
        variables: Map<String, Value>,
    ) -> Result<Self> {
        let mut session = Self::compose(project, name, context_names, variables)?;
        session.directory = Some(project.session_path(name));
        Ok(session)
    }

    /// Composes a session that never touches the disk.
    pub fn unsaved(
        project: &Project,
        context_names: Vec<String>,
        variables: Map<String, Value>,
    ) -> Result<Self> {
        Self::compose(project, UNSAVED_SESSION_NAME, context_names, variables)
    }

    fn compose(
        project: &Project,
        name: &str,
        context_names: Vec<String>,
        variables: Map<String, Value>,
    ) -> Result<Self> {
        let parents = project.compose_contexts(&context_names)?;
        Ok(Self {
            project: project.clone(),
            name: name.to_string(),
            title: None,
            directory: None,
            context_names,
            variables,
            parents,
            executed: Vec::new(),
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Composes a session and immediately persists it.
    pub fn create(
        project: &Project,
        name: &str,
        context_names: Vec<String>,
        variables: Map<String, Value>,
    ) -> Result<Self> {
        let session = Self::new(project, name, context_names, variables)?;
        session.save()?;
        info!("created session '{}'", session.name);
        Ok(session)
    }

    /// Reconstructs a session from its directory.
    ///
    /// A directory without a session file loads as an empty session.
    pub fn load(project: &Project, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !path.is_dir() {
            return Err(Error::not_found(ResourceKind::Session, name));
        }

        let file_path = path.join(SESSION_FILE_NAME);
        let file = if file_path.is_file() {
            let data = load_yaml_map(&file_path)?;
            serde_json::from_value::<SessionFile>(Value::Object(data))
                .map_err(|e| Error::malformed(&file_path, e))?
        } else {
            debug!("{} has no {}, starting empty", path.display(), SESSION_FILE_NAME);
            SessionFile::default()
        };

        let parents = project.compose_contexts(&file.contexts)?;
        Ok(Self {
            project: project.clone(),
            name,
            title: file.title,
            directory: Some(path.to_path_buf()),
            context_names: file.contexts,
            variables: file.variables,
            parents,
            executed: Vec::new(),
        })
    }

    /// Writes the title, context names and variables to the session file.
    /// Unsaved sessions have nowhere to write and are left alone.
    pub fn save(&self) -> Result<()> {
        let Some(directory) = &self.directory else {
            debug!("session '{}' has no directory, not saving", self.name);
            return Ok(());
        };
        let file = SessionFile {
            title: self.title.clone(),
            contexts: self.context_names.clone(),
            variables: self.variables.clone(),
        };
        let yaml = serde_yaml::to_string(&file)?;
        write_yaml_file(&directory.join(SESSION_FILE_NAME), &yaml)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The session directory, or `None` for an unsaved session.
    pub fn path(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn is_saved(&self) -> bool {
        self.directory.is_some()
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn context_names(&self) -> &[String] {
        &self.context_names
    }

    /// The session's own variables, excluding those of its contexts.
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Sets one session variable. Call [`Session::save`] to persist it.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Merges variables into the session, overwriting existing names.
    pub fn merge_variables(&mut self, variables: Map<String, Value>) {
        for (name, value) in variables {
            if self.variables.contains_key(&name) {
                debug!("output '{}' overwrites an existing session variable", name);
            }
            self.variables.insert(name, value);
        }
    }

    /// A snapshot of the session as a scope: its variables over its contexts.
    pub fn scope(&self) -> Arc<Scope> {
        Scope::from_map(self.variables.clone(), self.parents.clone()).into_shared()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.scope().has_variable(name)
    }

    /// Evaluates a dot path against the session.
    pub fn evaluate(&self, path: &str) -> Value {
        self.scope().evaluate(path)
    }

    /// Interpolates an action without building the request.
    pub fn build_request_data(
        &self,
        action_ref: &ActionRef,
        options: &BuildOptions,
    ) -> Result<Map<String, Value>> {
        let (_, fields, _) = self.builder().request_data(action_ref, options)?;
        Ok(fields)
    }

    /// Builds the request for an action without sending it.
    pub fn build_request(&self, action_ref: &ActionRef, options: &BuildOptions) -> Result<BuiltRequest> {
        self.builder().build(action_ref, options)
    }

    /// Builds, sends and records one request, then merges its outputs and
    /// saves the session.
    ///
    /// A transport failure does not abort: it is recorded as a status-0
    /// response and outputs are still evaluated.
    pub fn perform_request<T: Transport + ?Sized>(
        &mut self,
        action_ref: &ActionRef,
        options: &BuildOptions,
        transport: &T,
    ) -> Result<ExecutedRequest> {
        let built = self.build_request(action_ref, options)?;
        let identifier = self.next_request_id()?;
        let dump_directory = self.requests_path().map(|requests| {
            requests.join(format!("{}-{}", identifier, dump_name(built.action.name())))
        });
        if let Some(dir) = &dump_directory {
            fs::create_dir_all(dir)?;
        }
        let dumps = dump_directory.as_deref().map(DumpPaths::in_directory);

        info!(
            "[{}] {} {} ({})",
            identifier,
            built.descriptor.method,
            built.descriptor.uri,
            built.action.name()
        );

        let response = match transport.send(&built.descriptor, dumps.as_ref()) {
            Ok(response) => response,
            Err(e) => {
                warn!("request {} failed: {}", identifier, e);
                let response = HttpResponse::transport_failure(e.to_string());
                if let Some(dumps) = dumps.as_ref().filter(|d| !d.response.exists()) {
                    write_response_dump(dumps, &response)?;
                }
                response
            }
        };
        info!("[{}] {}", identifier, response.status_line());

        if let Some(outputs) = extract_outputs(built.outputs(), &response, self.scope()) {
            self.merge_variables(outputs);
        }
        self.save()?;

        let executed = ExecutedRequest::new(
            identifier,
            built.action.name(),
            built.descriptor,
            response,
            dump_directory,
        );
        self.executed.push(executed.clone());
        Ok(executed)
    }

    /// Runs a named flow, step by step.
    ///
    /// The first failing step aborts the run; outputs merged by earlier steps
    /// remain in the session.
    pub fn perform_flow<T: Transport + ?Sized>(
        &mut self,
        flow_name: &str,
        transport: &T,
    ) -> Result<FlowRun> {
        let flow = self.project.flow_named(flow_name)?;
        flow.run(self, transport)
    }

    /// Requests executed by this session since it was opened.
    pub fn executed_requests(&self) -> &[ExecutedRequest] {
        &self.executed
    }

    pub fn request_count(&self) -> usize {
        self.executed.len()
    }

    /// Total response content length received since the session was opened.
    pub fn total_received(&self) -> u64 {
        self.executed.iter().map(ExecutedRequest::content_length).sum()
    }

    /// Where request dumps go, or `None` for an unsaved session.
    pub fn requests_path(&self) -> Option<PathBuf> {
        self.directory.as_ref().map(|dir| dir.join(REQUESTS_DIR))
    }

    /// Request dump directories on disk, ordered by identifier.
    pub fn recorded_requests(&self) -> Result<Vec<RecordedRequest>> {
        let Some(dir) = self.requests_path().filter(|dir| dir.is_dir()) else {
            return Ok(Vec::new());
        };

        let mut recorded = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some((identifier, action_name)) = parse_dump_name(&file_name) {
                recorded.push(RecordedRequest {
                    identifier,
                    action_name,
                    directory: entry.path(),
                });
            }
        }
        recorded.sort_by_key(|r| r.identifier);
        Ok(recorded)
    }

    /// One past the highest request identifier on disk or executed in
    /// this session.
    pub fn next_request_id(&self) -> Result<u32> {
        let highest = self
            .recorded_requests()?
            .iter()
            .map(|r| r.identifier)
            .chain(self.executed.iter().map(|e| e.identifier))
            .max()
            .unwrap_or(0);
        highest.checked_add(1).ok_or_else(|| {
            Error::InvalidRequest(format!(
                "request identifiers in session '{}' are exhausted",
                self.name
            ))
        })
    }

    fn builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.project, self.scope())
    }
}

/// Turns an action name into a directory-safe suffix.
fn dump_name(action_name: &str) -> String {
    action_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect()
}

/// Splits `<id>-<action>` into its parts.
fn parse_dump_name(name: &str) -> Option<(u32, String)> {
    let digits: String = name.chars().take_while(char::is_ascii_digit).collect();
    let identifier = digits.parse().ok()?;
    let rest = &name[digits.len()..];
    Some((identifier, rest.strip_prefix('-').unwrap_or(rest).to_string()))
}
