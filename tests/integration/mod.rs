//! Integration tests module for rest-flow
//!
//! Shared fixtures: a temporary project on disk and a transport that records
//! every request instead of touching the network.

pub mod project_test;
pub mod session_flow_test;
pub mod transport_test;

use rest_flow::models::{HttpResponse, RequestDescriptor};
use rest_flow::project::Project;
use rest_flow::transport::{DumpPaths, RequestError, Transport};
use serde_json::Value;
use std::cell::RefCell;
use tempfile::TempDir;

type Responder = Box<dyn Fn(&RequestDescriptor) -> Result<HttpResponse, RequestError>>;

/// A transport that answers from a closure and records what it was sent.
pub struct RecordingTransport {
    responder: Responder,
    sent: RefCell<Vec<RequestDescriptor>>,
}

impl RecordingTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> Result<HttpResponse, RequestError> + 'static,
    {
        Self {
            responder: Box::new(responder),
            sent: RefCell::new(Vec::new()),
        }
    }

    /// Answers every request with the same JSON body.
    pub fn always_json(status: u16, body: Value) -> Self {
        Self::new(move |_| Ok(json_response(status, &body)))
    }

    pub fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl Transport for RecordingTransport {
    fn send(
        &self,
        request: &RequestDescriptor,
        _dumps: Option<&DumpPaths>,
    ) -> Result<HttpResponse, RequestError> {
        self.sent.borrow_mut().push(request.clone());
        (self.responder)(request)
    }
}

/// Helper to create a JSON response
pub fn json_response(status: u16, body: &Value) -> HttpResponse {
    let mut response = HttpResponse::new(status, if status < 400 { "OK" } else { "Error" });
    response.add_header("Content-Type", "application/json");
    response.set_body(serde_json::to_vec(body).unwrap());
    response
}

/// Helper to create an empty project with the standard directories
pub fn create_project() -> (TempDir, Project) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let project = Project::open(dir.path()).expect("Failed to open project");
    project.create_skeleton().expect("Failed to create project layout");
    (dir, project)
}

/// Helper to create a project with a small messaging API
pub fn create_messaging_project() -> (TempDir, Project) {
    let (dir, project) = create_project();

    project
        .write_context_yaml("api", "base_url: http://api.communique.dev/v2/\n")
        .unwrap();
    project
        .write_context_yaml("api/sandbox", "base_url: http://sandbox.communique.dev/v2/\n")
        .unwrap();
    project
        .write_context_yaml("user", "user: amelia\npassword: s3cret\n")
        .unwrap();

    project
        .write_action_yaml(
            "sessions/create",
            r#"method: POST
path: sessions
json_body:
  user: "{{user}}"
  password: "{{password}}"
outputs:
  session_id: "{{session.id}}"
"#,
        )
        .unwrap();
    project
        .write_action_yaml(
            "sessions/check",
            r#"path: "/sessions/{{session_id}}/x"
headers:
  Accept: application/json
"#,
        )
        .unwrap();
    project
        .write_flow_yaml(
            "login",
            "requests:\n  - sessions/create\n  - sessions/check\n",
        )
        .unwrap();

    (dir, project)
}
