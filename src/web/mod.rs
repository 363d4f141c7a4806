//! Read-only web viewer.
//!
//! Routes:
//! - GET /sessions                        - List sessions
//! - GET /sessions/:name                  - Session contexts, variables and recorded requests
//! - GET /sessions/:name/requests/:id     - Recorded request and response dumps
//!
//! The project location is part of the router state; handlers reopen the
//! project on every call so they always see what is on disk.

use crate::error::Error;
use crate::project::Project;
use crate::session::{RecordedRequest, Session};
use crate::transport::DumpPaths;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub requests: usize,
    /// Why the session could not be opened, if it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub project: String,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub contexts: Vec<String>,
    pub variables: Map<String, Value>,
    pub requests: Vec<RecordedRequest>,
}

#[derive(Debug, Serialize)]
pub struct RecordedRequestResponse {
    pub identifier: u32,
    pub action_name: String,
    pub request: String,
    pub response: String,
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone)]
pub struct WebState {
    pub project_path: PathBuf,
}

impl WebState {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
        }
    }

    fn project(&self) -> Result<Project, StatusCode> {
        Project::open(&self.project_path).map_err(status_for)
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: WebState) -> Router {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/:name", get(show_session))
        .route("/sessions/:name/requests/:id", get(show_request))
        .with_state(state)
}

/// Serves the viewer until the process is stopped.
pub async fn serve(state: WebState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("web viewer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /sessions - List sessions
async fn list_sessions(
    State(state): State<WebState>,
) -> Result<Json<SessionListResponse>, StatusCode> {
    let project = state.project()?;
    let names = project.session_names().map_err(status_for)?;

    let sessions = names
        .into_iter()
        .map(|name| summarize_session(&project, name))
        .collect();

    Ok(Json(SessionListResponse {
        project: project.name(),
        sessions,
    }))
}

/// GET /sessions/:name - Session details
async fn show_session(
    State(state): State<WebState>,
    Path(name): Path<String>,
) -> Result<Json<SessionDetailResponse>, StatusCode> {
    let session = open_session(&state, &name)?;
    let requests = session.recorded_requests().map_err(status_for)?;

    Ok(Json(SessionDetailResponse {
        name: session.name().to_string(),
        title: session.title().map(str::to_string),
        contexts: session.context_names().to_vec(),
        variables: session.variables().clone(),
        requests,
    }))
}

/// GET /sessions/:name/requests/:id - Recorded dumps of one request
async fn show_request(
    State(state): State<WebState>,
    Path((name, id)): Path<(String, u32)>,
) -> Result<Json<RecordedRequestResponse>, StatusCode> {
    let session = open_session(&state, &name)?;
    let recorded = session
        .recorded_requests()
        .map_err(status_for)?
        .into_iter()
        .find(|r| r.identifier == id)
        .ok_or(StatusCode::NOT_FOUND)?;

    let dumps = DumpPaths::in_directory(&recorded.directory);
    Ok(Json(RecordedRequestResponse {
        identifier: recorded.identifier,
        action_name: recorded.action_name,
        request: read_dump(&dumps.request),
        response: read_dump(&dumps.response),
    }))
}

/// A broken session is reported in its own entry instead of failing the list.
fn summarize_session(project: &Project, name: String) -> SessionSummary {
    let opened = project.open_session(&name).and_then(|session| {
        let requests = session.recorded_requests()?.len();
        Ok((session, requests))
    });

    match opened {
        Ok((session, requests)) => SessionSummary {
            title: session.title().map(str::to_string),
            name,
            requests,
            error: None,
        },
        Err(e) => {
            log::warn!("cannot open session '{}': {}", name, e);
            SessionSummary {
                name,
                title: None,
                requests: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

fn open_session(state: &WebState, name: &str) -> Result<Session, StatusCode> {
    let project = state.project()?;
    if !project.session_names().map_err(status_for)?.iter().any(|n| n == name) {
        return Err(StatusCode::NOT_FOUND);
    }
    project.open_session(name).map_err(status_for)
}

fn read_dump(path: &std::path::Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn status_for(error: Error) -> StatusCode {
    match error {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        other => {
            log::error!("web viewer request failed: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
