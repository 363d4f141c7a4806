//! REST Flow: templated HTTP actions run through stateful sessions.
//!
//! A project declares HTTP requests as YAML *actions*, groups reusable
//! variables into *contexts*, and runs actions one at a time or as ordered
//! *flows* against a *session*. Each response can feed variables back into
//! the session, so later requests can use values produced by earlier ones.
//!
//! # Architecture
//!
//! - **scope**: hierarchical variable lookup and `{{path.to.value}}` templating
//! - **action**: request templates and references to them
//! - **request**: scope composition, interpolation and URI resolution
//! - **extract**: output variables derived from JSON responses
//! - **session**: the persistent root scope and request orchestration
//! - **flow**: ordered, output-chained action sequences
//! - **project**: the file-backed store for actions, flows, contexts and sessions
//! - **transport**: sending requests, with a reqwest-backed implementation
//! - **config**: project settings from `rest-flow.yaml`
//! - **web** (feature `web`): read-only viewer for sessions and recorded requests
//!
//! # Templates
//!
//! A string that is exactly one template keeps the type of the referenced
//! value:
//!
//! ```
//! use rest_flow::scope::Scope;
//! use serde_json::json;
//!
//! let scope = Scope::with_locals(json!({"ids": [1, 2], "user": {"name": "Amelia"}}));
//! assert_eq!(scope.interpolate(&json!("{{ids}}")), json!([1, 2]));
//! assert_eq!(scope.interpolate(&json!("Hi {{user.name}}!")), json!("Hi Amelia!"));
//! assert_eq!(scope.interpolate(&json!("{{missing}}")), json!(null));
//! ```
//!
//! # Running a flow
//!
//! ```no_run
//! use rest_flow::project::Project;
//! use rest_flow::transport::HttpTransport;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let project = Project::open("./api-project")?;
//! let transport = HttpTransport::new(project.settings())?;
//! let mut session = project.open_session("staging")?;
//!
//! let run = session.perform_flow("login", &transport)?;
//! for executed in &run.executed {
//!     println!("{} {}", executed.identifier, executed.response.status_line());
//! }
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod extract;
pub mod flow;
pub mod logging;
pub mod models;
pub mod project;
pub mod request;
pub mod scope;
pub mod session;
pub mod transport;

#[cfg(feature = "web")]
pub mod web;

pub use action::{Action, ActionRef};
pub use error::{Error, ResourceKind, Result};
pub use flow::{Flow, FlowRun};
pub use project::Project;
pub use request::{BuildOptions, RequestUri};
pub use scope::Scope;
pub use serde_json::Value;
pub use session::Session;
pub use transport::{HttpTransport, Transport};
