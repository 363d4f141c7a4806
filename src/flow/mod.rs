//! Flows: ordered lists of actions run against one session.
//!
//! Steps run strictly in order. Each step sees the outputs merged by the
//! steps before it, because they all share the session scope.

use crate::action::ActionRef;
use crate::error::Result;
use crate::models::ExecutedRequest;
use crate::request::BuildOptions;
use crate::session::Session;
use crate::transport::Transport;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flow definition as stored in `flows/<name>.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(skip)]
    name: String,

    #[serde(default)]
    requests: Vec<ActionRef>,
}

/// The requests a completed flow executed, in order.
#[derive(Debug, Clone)]
pub struct FlowRun {
    pub flow_name: String,
    pub executed: Vec<ExecutedRequest>,
}

impl Flow {
    pub fn new(name: impl Into<String>, requests: Vec<ActionRef>) -> Self {
        Self {
            name: name.into(),
            requests,
        }
    }

    /// Parses a flow from its stored mapping.
    pub fn from_data(
        name: impl Into<String>,
        data: Map<String, Value>,
    ) -> std::result::Result<Self, String> {
        let mut flow: Flow =
            serde_json::from_value(Value::Object(data)).map_err(|e| e.to_string())?;
        flow.name = name.into();
        Ok(flow)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requests(&self) -> &[ActionRef] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Performs every step against the session, stopping at the first error.
    pub fn run<T: Transport + ?Sized>(
        &self,
        session: &mut Session,
        transport: &T,
    ) -> Result<FlowRun> {
        info!("running flow '{}' ({} steps)", self.name, self.requests.len());

        let options = BuildOptions::default();
        let mut executed = Vec::with_capacity(self.requests.len());
        for step in &self.requests {
            executed.push(session.perform_request(step, &options, transport)?);
        }

        Ok(FlowRun {
            flow_name: self.name.clone(),
            executed,
        })
    }
}
