//! rest-flow command-line entry point.
//!
//! Every command is a thin wrapper over project and session operations.
//! Command output goes to stdout; logs go to stderr.

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use rest_flow::action::ActionRef;
use rest_flow::models::ExecutedRequest;
use rest_flow::project::Project;
use rest_flow::request::{BuildOptions, RequestBuilder};
use rest_flow::scope::{template_references, UNINTERPOLATED_KEYS};
use rest_flow::session::Session;
use rest_flow::transport::HttpTransport;
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rest-flow",
    about = "Run templated HTTP actions and flows against stateful sessions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory
    #[arg(long, short = 'p', env = "REST_FLOW_PATH", default_value = ".", global = true)]
    path: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List actions
    Actions,
    /// List flows
    Flows,
    /// List sessions
    Sessions,
    /// List contexts and their variants
    Contexts,
    /// Send one request
    Request {
        /// Action name
        action: String,
        #[command(flatten)]
        target: RequestTarget,
    },
    /// Run a flow
    Flow {
        /// Flow name
        flow: String,
        /// Session to run against (defaults to `default`)
        #[arg(long, short = 's')]
        session: Option<String>,
    },
    /// Print the interpolated fields of an action without sending it
    Interpolate {
        /// Action name
        action: String,
        #[command(flatten)]
        target: RequestTarget,
    },
    /// Create a session
    CreateSession {
        name: String,
        /// Display title stored with the session
        #[arg(long)]
        title: Option<String>,
        /// Contexts to compose, in lookup order (`context` or `context/variant`)
        #[arg(long = "context", short = 'c')]
        contexts: Vec<String>,
        /// Initial variable as NAME=VALUE
        #[arg(long = "var", value_parser = parse_variable)]
        variables: Vec<(String, Value)>,
    },
    /// Create a context variant
    CreateContext {
        /// `context` or `context/variant`
        name: String,
        /// Variable as NAME=VALUE
        #[arg(long = "var", value_parser = parse_variable)]
        variables: Vec<(String, Value)>,
    },
    /// Serve the read-only web viewer
    #[cfg(feature = "web")]
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:4567")]
        addr: std::net::SocketAddr,
    },
}

#[derive(Args)]
struct RequestTarget {
    /// Session to run against (defaults to `default`)
    #[arg(long, short = 's')]
    session: Option<String>,
    /// Extra context consulted before the session; repeatable
    #[arg(long = "context", short = 'c')]
    contexts: Vec<String>,
    /// Request variable as NAME=VALUE; repeatable
    #[arg(long = "var", value_parser = parse_variable)]
    variables: Vec<(String, Value)>,
}

impl RequestTarget {
    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            contexts: self.contexts.clone(),
            variables: to_map(&self.variables),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    rest_flow::logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let project = Project::open(&cli.path)
        .with_context(|| format!("failed to open project at {}", cli.path.display()))?;
    info!("project '{}' at {}", project.name(), project.path().display());

    match cli.command {
        Commands::Actions => print_lines(project.action_names()?),
        Commands::Flows => print_lines(project.flow_names()?),
        Commands::Sessions => print_lines(project.session_names()?),
        Commands::Contexts => {
            for context in project.context_names()? {
                let variants = project.variants_of_context(&context)?;
                println!("{} ({})", context, variants.join(", "));
            }
        }
        Commands::Request { action, target } => {
            let mut session = open_session(&project, target.session.as_deref())?;
            let transport = HttpTransport::new(project.settings())?;
            let executed = session.perform_request(
                &ActionRef::named(action),
                &target.build_options(),
                &transport,
            )?;
            print_executed(&executed);
        }
        Commands::Flow { flow, session } => {
            let mut session = open_session(&project, session.as_deref())?;
            let transport = HttpTransport::new(project.settings())?;
            let run = session.perform_flow(&flow, &transport)?;
            for executed in &run.executed {
                print_executed(executed);
            }
            println!(
                "flow '{}': {} requests, {} bytes received",
                run.flow_name,
                session.request_count(),
                session.total_received()
            );
        }
        Commands::Interpolate { action, target } => {
            let session = open_session(&project, target.session.as_deref())?;
            let builder = RequestBuilder::new(&project, session.scope());
            let (action, fields, scope) =
                builder.request_data(&ActionRef::named(action), &target.build_options())?;

            let templated: Map<String, Value> = action
                .fields()
                .iter()
                .filter(|(key, _)| !UNINTERPOLATED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            for reference in template_references(&Value::Object(templated)) {
                if scope.evaluate(&reference).is_null() {
                    warn!("'{}' does not resolve in this scope", reference);
                }
            }

            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
        Commands::CreateSession {
            name,
            title,
            contexts,
            variables,
        } => {
            if project.session_path(&name).exists() {
                bail!("session '{}' already exists", name);
            }
            let variables = to_map(&variables);
            match title {
                Some(title) => project.create_titled_session(&name, &title, contexts, variables)?,
                None => project.create_session(&name, contexts, variables)?,
            };
            println!("created session {}", project.session_path(&name).display());
        }
        Commands::CreateContext { name, variables } => {
            let path = project.create_context(&name, &to_map(&variables))?;
            println!("created context {}", path.display());
        }
        #[cfg(feature = "web")]
        Commands::Serve { addr } => {
            let state = rest_flow::web::WebState::new(project.path());
            tokio::runtime::Runtime::new()?.block_on(rest_flow::web::serve(state, addr))?;
        }
    }

    Ok(())
}

fn open_session(project: &Project, name: Option<&str>) -> Result<Session> {
    let session = match name {
        Some(name) => project.open_session(name)?,
        None => project.default_session()?,
    };
    info!("using session '{}'", session.name());
    Ok(session)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn print_executed(executed: &ExecutedRequest) {
    println!(
        "#{} {} {} {}",
        executed.identifier, executed.action_name, executed.request.method, executed.request.uri
    );
    println!("{}", executed.response.status_line());
    for (name, value) in &executed.response.headers {
        println!("{}: {}", name, value);
    }
    println!();
    println!("{}", String::from_utf8_lossy(&executed.response.body));
}

/// Parses `NAME=VALUE`; the value is read as YAML so numbers, booleans and
/// lists keep their type.
fn parse_variable(input: &str) -> std::result::Result<(String, Value), String> {
    let (name, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", input))?;
    if name.trim().is_empty() {
        return Err(format!("missing variable name in '{}'", input));
    }

    let value = match raw.trim() {
        "" => Value::String(String::new()),
        trimmed => serde_yaml::from_str::<Value>(trimmed)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    };
    Ok((name.trim().to_string(), value))
}

fn to_map(variables: &[(String, Value)]) -> Map<String, Value> {
    variables.iter().cloned().collect()
}
