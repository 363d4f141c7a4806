//! Session and flow integration tests
//!
//! These tests run actions and flows against sessions backed by a temporary
//! project, using a recording transport in place of the network.

use super::{create_messaging_project, json_response, RecordingTransport};
use rest_flow::action::ActionRef;
use rest_flow::error::{Error, ResourceKind};
use rest_flow::models::HttpResponse;
use rest_flow::request::BuildOptions;
use rest_flow::transport::RequestError;
use serde_json::{json, Map};
use std::fs;

fn login_transport() -> RecordingTransport {
    RecordingTransport::new(|request| {
        if request.uri.as_str().ends_with("/sessions") {
            Ok(json_response(201, &json!({"session": {"id": "abc123"}})))
        } else {
            Ok(json_response(200, &json!({"ok": true})))
        }
    })
}

#[test]
fn test_flow_outputs_feed_next_step() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    let transport = login_transport();

    let run = session.perform_flow("login", &transport).unwrap();

    assert_eq!(run.flow_name, "login");
    assert_eq!(run.executed.len(), 2);
    assert_eq!(session.variables()["session_id"], json!("abc123"));
    assert!(run.executed[1]
        .request
        .uri
        .as_str()
        .contains("/sessions/abc123/x"));

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].body_text().unwrap(),
        r#"{"user":"amelia","password":"s3cret"}"#
    );
    assert_eq!(sent[1].uri.as_str(), "http://api.communique.dev/sessions/abc123/x");
}

#[test]
fn test_flow_state_is_persisted() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    session.perform_flow("login", &login_transport()).unwrap();

    let reloaded = project.open_session("main").unwrap();
    assert_eq!(reloaded.variables()["session_id"], json!("abc123"));
    assert!(reloaded.executed_requests().is_empty());

    let recorded = reloaded.recorded_requests().unwrap();
    let names: Vec<_> = recorded.iter().map(|r| r.action_name.as_str()).collect();
    assert_eq!(names, vec!["sessions-create", "sessions-check"]);
}

#[test]
fn test_unknown_action_aborts_flow_before_transport() {
    let (_dir, project) = create_messaging_project();
    project
        .write_flow_yaml(
            "broken",
            "requests:\n  - sessions/create\n  - sessions/delete\n  - sessions/check\n",
        )
        .unwrap();
    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    let transport = login_transport();

    let err = session.perform_flow("broken", &transport).unwrap_err();

    assert!(matches!(
        err,
        Error::NotFound { kind: ResourceKind::Action, ref name } if name == "sessions/delete"
    ));
    assert_eq!(transport.call_count(), 1);
    // Outputs merged before the failing step are kept.
    assert_eq!(session.variables()["session_id"], json!("abc123"));
}

#[test]
fn test_unknown_first_step_sends_nothing() {
    let (_dir, project) = create_messaging_project();
    project
        .write_flow_yaml("nothing", "requests:\n  - nope\n  - sessions/create\n")
        .unwrap();
    let mut session = project.session_with_contexts(vec![]).unwrap();
    let transport = login_transport();

    assert!(session.perform_flow("nothing", &transport).unwrap_err().is_not_found());
    assert_eq!(transport.call_count(), 0);
}

#[test]
fn test_unknown_flow() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.session_with_contexts(vec![]).unwrap();
    let err = session.perform_flow("signup", &login_transport()).unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: ResourceKind::Flow, .. }));
}

#[test]
fn test_inline_flow_steps() {
    let (_dir, project) = create_messaging_project();
    project
        .write_flow_yaml(
            "inline",
            r#"requests:
  - sessions/create
  - title: Ping session
    path: "ping/{{session_id}}"
    query:
      verbose: true
"#,
        )
        .unwrap();
    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    let transport = login_transport();

    let run = session.perform_flow("inline", &transport).unwrap();
    assert_eq!(run.executed[1].action_name, "Ping session");
    assert_eq!(
        run.executed[1].request.uri.as_str(),
        "http://api.communique.dev/v2/ping/abc123?verbose=true"
    );
    assert!(run.executed[1]
        .dump_directory
        .as_ref()
        .unwrap()
        .ends_with("2-Ping-session"));
}

#[test]
fn test_create_then_load_round_trip() {
    let (_dir, project) = create_messaging_project();
    let variables = json!({
        "token": "abc",
        "retries": 3,
        "nested": {"ids": [1, 2], "enabled": true}
    });

    let created = project
        .create_session(
            "round-trip",
            vec!["api/sandbox".to_string(), "user".to_string()],
            variables.as_object().unwrap().clone(),
        )
        .unwrap();
    let loaded = project.open_session("round-trip").unwrap();

    assert_eq!(loaded.context_names(), created.context_names());
    assert_eq!(loaded.variables(), created.variables());
    assert_eq!(loaded.evaluate("base_url"), json!("http://sandbox.communique.dev/v2/"));
    assert_eq!(loaded.path(), created.path());
}

#[test]
fn test_create_with_unknown_context_fails() {
    let (_dir, project) = create_messaging_project();
    let err = project
        .create_session("main", vec!["payments".to_string()], Map::new())
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: ResourceKind::Context, .. }));
    assert!(!project.session_path("main").exists());
}

#[test]
fn test_transport_failure_is_recorded() {
    let (_dir, project) = create_messaging_project();
    project
        .write_action_yaml(
            "whoami",
            "path: me\noutputs:\n  who: \"{{user}}\"\n  id: \"{{id}}\"\n",
        )
        .unwrap();
    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    let transport = RecordingTransport::new(|_| {
        Err(RequestError::NetworkError("Connection refused".to_string()))
    });

    let executed = session
        .perform_request(&ActionRef::named("whoami"), &BuildOptions::new(), &transport)
        .unwrap();

    assert_eq!(executed.response.status_code, 0);
    assert!(executed.response.is_transport_failure());
    assert!(executed.response.status_text.contains("Connection refused"));
    assert_eq!(session.variables()["who"], json!("amelia"));
    assert_eq!(session.variables()["id"], json!(null));

    let dump_directory = executed.dump_directory.as_ref().unwrap();
    let dump = fs::read_to_string(dump_directory.join("response.txt")).unwrap();
    assert!(dump.contains("Connection refused"));
}

#[test]
fn test_error_status_still_extracts_outputs() {
    let (_dir, project) = create_messaging_project();
    project
        .write_action_yaml(
            "sessions/create",
            "method: POST\npath: sessions\noutputs:\n  error_code: \"{{error.code}}\"\n",
        )
        .unwrap();
    let mut session = project.session_with_contexts(vec![]).unwrap();
    let transport =
        RecordingTransport::always_json(422, json!({"error": {"code": "weak_password"}}));

    let executed = session
        .perform_request(&ActionRef::named("sessions/create"), &BuildOptions::new(), &transport)
        .unwrap();

    assert_eq!(executed.response.status_code, 422);
    assert_eq!(session.variables()["error_code"], json!("weak_password"));
}

#[test]
fn test_later_outputs_overwrite_earlier_ones() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.session_with_contexts(vec![]).unwrap();
    session.set_variable("session_id", json!("stale"));

    session
        .perform_request(
            &ActionRef::named("sessions/create"),
            &BuildOptions::new(),
            &login_transport(),
        )
        .unwrap();
    assert_eq!(session.variables()["session_id"], json!("abc123"));
}

#[test]
fn test_actions_without_outputs_merge_nothing() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.session_with_contexts(vec![]).unwrap();
    session.set_variable("session_id", json!("kept"));
    let transport = RecordingTransport::always_json(200, json!({"session_id": "ignored"}));

    session
        .perform_request(&ActionRef::named("sessions/check"), &BuildOptions::new(), &transport)
        .unwrap();
    assert_eq!(session.variables().len(), 1);
    assert_eq!(session.variables()["session_id"], json!("kept"));
}

#[test]
fn test_sequence_identifiers_continue_across_reopen() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    let transport = login_transport();
    session.perform_flow("login", &transport).unwrap();

    let mut reopened = project.open_session("main").unwrap();
    let executed = reopened
        .perform_request(&ActionRef::named("sessions/check"), &BuildOptions::new(), &transport)
        .unwrap();
    assert_eq!(executed.identifier, 3);
    assert!(executed
        .dump_directory
        .as_ref()
        .unwrap()
        .ends_with("3-sessions-check"));
}

#[test]
fn test_request_options_take_precedence() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.session_with_contexts(vec![]).unwrap();
    session.set_variable("session_id", json!("from-session"));

    let options = BuildOptions::new()
        .with_context("api/sandbox")
        .with_variable("session_id", json!("from-options"));
    let built = session
        .build_request(&ActionRef::named("sessions/check"), &options)
        .unwrap();

    assert_eq!(
        built.descriptor.uri.as_str(),
        "http://sandbox.communique.dev/sessions/from-options/x"
    );
    assert_eq!(built.descriptor.header("accept"), Some("application/json"));
}

#[test]
fn test_build_request_data_does_not_send() {
    let (_dir, project) = create_messaging_project();
    let session = project.session_with_contexts(vec![]).unwrap();

    let fields = session
        .build_request_data(&ActionRef::named("sessions/create"), &BuildOptions::new())
        .unwrap();

    assert_eq!(fields["json_body"], json!({"user": "amelia", "password": "s3cret"}));
    assert_eq!(fields["outputs"], json!({"session_id": "{{session.id}}"}));
    assert_eq!(fields["action_name"], json!("sessions/create"));
    assert!(session.requests_path().is_none());
    assert!(!project.session_path("default").exists());
}

#[test]
fn test_inline_action_reference() {
    let (_dir, project) = create_messaging_project();
    let mut session = project.session_with_contexts(vec![]).unwrap();
    let transport = RecordingTransport::new(|_| Ok(HttpResponse::new(204, "No Content")));

    let executed = session
        .perform_request(
            &ActionRef::inline(json!({"method": "DELETE", "url": "https://other.dev/x"})),
            &BuildOptions::new(),
            &transport,
        )
        .unwrap();

    assert_eq!(executed.action_name, "inline");
    assert_eq!(executed.request.uri.as_str(), "https://other.dev/x");
    assert_eq!(session.total_received(), 0);
}

#[test]
fn test_unsaved_flow_leaves_default_session_alone() {
    let (_dir, project) = create_messaging_project();
    project
        .create_session(
            "default",
            vec!["api/sandbox".to_string()],
            json!({"token": "keep-me"}).as_object().unwrap().clone(),
        )
        .unwrap();

    let mut unsaved = project.session_with_contexts(vec![]).unwrap();
    let run = unsaved.perform_flow("login", &login_transport()).unwrap();
    assert_eq!(run.executed.len(), 2);
    assert_eq!(run.executed[1].identifier, 2);
    assert!(run.executed.iter().all(|e| e.dump_directory.is_none()));
    assert_eq!(unsaved.variables()["session_id"], json!("abc123"));

    let default = project.open_session("default").unwrap();
    assert_eq!(default.context_names(), ["api/sandbox".to_string()]);
    assert_eq!(default.variables().len(), 1);
    assert_eq!(default.variables()["token"], json!("keep-me"));
    assert!(default.recorded_requests().unwrap().is_empty());
}
