//! Project store integration tests
//!
//! These tests verify listing, loading and writing of actions, flows,
//! contexts and sessions in a project directory.

use super::{create_messaging_project, create_project};
use rest_flow::error::Error;
use rest_flow::project::Project;
use serde_json::{json, Map};
use std::fs;

#[test]
fn test_listings() {
    let (_dir, project) = create_messaging_project();
    project.create_session("main", vec![], Map::new()).unwrap();
    project.create_session("admin", vec![], Map::new()).unwrap();

    assert_eq!(
        project.action_names().unwrap(),
        vec!["sessions/check", "sessions/create"]
    );
    assert_eq!(project.flow_names().unwrap(), vec!["login"]);
    assert_eq!(project.context_names().unwrap(), vec!["api", "user"]);
    assert_eq!(project.session_names().unwrap(), vec!["admin", "main"]);
    assert_eq!(
        project.variants_of_context("api").unwrap(),
        vec!["default", "sandbox"]
    );
}

#[test]
fn test_empty_project_lists_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let project = Project::open(dir.path()).unwrap();

    assert!(project.action_names().unwrap().is_empty());
    assert!(project.flow_names().unwrap().is_empty());
    assert!(project.context_names().unwrap().is_empty());
    assert!(project.session_names().unwrap().is_empty());
}

#[test]
fn test_malformed_action() {
    let (_dir, project) = create_project();
    project.write_action_yaml("broken", "path: [unclosed\n").unwrap();

    assert!(matches!(
        project.action_named("broken"),
        Err(Error::MalformedConfig { .. })
    ));
}

#[test]
fn test_malformed_flow() {
    let (_dir, project) = create_project();
    project.write_flow_yaml("broken", "requests: 12\n").unwrap();

    let err = project.flow_named("broken").unwrap_err();
    assert!(matches!(err, Error::MalformedConfig { .. }));
    assert!(err.to_string().contains("broken.yaml"));
}

#[test]
fn test_malformed_session_file() {
    let (_dir, project) = create_project();
    let dir = project.session_path("main");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("session.yaml"), "contexts: nope\n").unwrap();

    assert!(matches!(
        project.open_session("main"),
        Err(Error::MalformedConfig { .. })
    ));
}

#[test]
fn test_session_file_format() {
    let (_dir, project) = create_messaging_project();
    project
        .create_session(
            "main",
            vec!["api/sandbox".to_string()],
            json!({"token": "abc"}).as_object().unwrap().clone(),
        )
        .unwrap();

    let yaml = fs::read_to_string(project.session_path("main").join("session.yaml")).unwrap();
    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed["contexts"][0].as_str(), Some("api/sandbox"));
    assert_eq!(parsed["variables"]["token"].as_str(), Some("abc"));
}

#[test]
fn test_default_session_prefers_disk() {
    let (_dir, project) = create_messaging_project();
    assert!(project.default_session().unwrap().variables().is_empty());

    project
        .create_session(
            "default",
            vec![],
            json!({"token": "saved"}).as_object().unwrap().clone(),
        )
        .unwrap();
    assert_eq!(
        project.default_session().unwrap().variables()["token"],
        json!("saved")
    );
}

#[test]
fn test_session_with_variables() {
    let (_dir, project) = create_messaging_project();
    let session = project
        .session_with_variables(json!({"user": "override"}).as_object().unwrap().clone())
        .unwrap();

    assert_eq!(session.evaluate("user"), json!("override"));
    assert_eq!(session.evaluate("password"), json!("s3cret"));
    assert!(session.has_variable("base_url"));
    assert!(!session.has_variable("session_id"));
}

#[test]
fn test_settings_file_is_loaded() {
    let (dir, _project) = create_messaging_project();
    fs::write(
        dir.path().join("rest-flow.yaml"),
        "timeout: 5000\ndefaultContexts: [user]\ndefaultHeaders:\n  X-Client: tests\n",
    )
    .unwrap();

    let project = Project::open(dir.path()).unwrap();
    assert_eq!(project.settings().timeout, 5000);

    let session = project.session_with_contexts(vec![]).unwrap();
    assert_eq!(session.evaluate("user"), json!("amelia"));
    assert_eq!(session.evaluate("base_url"), json!(null));
}
