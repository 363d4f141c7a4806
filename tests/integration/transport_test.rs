//! HTTP transport integration tests
//!
//! These tests run the reqwest-backed transport against a local mockito
//! server, both directly and through a session.

use super::create_project;
use mockito::Matcher;
use rest_flow::action::ActionRef;
use rest_flow::config::Settings;
use rest_flow::models::{Credentials, HttpMethod, RequestDescriptor};
use rest_flow::request::{BuildOptions, RequestUri};
use rest_flow::transport::{DumpPaths, HttpTransport, RequestError, Transport};
use serde_json::{json, Map};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use tempfile::TempDir;

fn uri(server: &mockito::Server, path: &str) -> RequestUri {
    RequestUri::parse(&format!("{}{}", server.url(), path)).unwrap()
}

#[test]
fn test_post_json_with_credentials() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/messages")
        .match_header("content-type", "application/json")
        .match_header("authorization", "Basic YW1lbGlhOnB3")
        .match_body(Matcher::Json(json!({"text": "hi"})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 42}"#)
        .create();

    let mut request = RequestDescriptor::new(HttpMethod::POST, uri(&server, "/messages"));
    request.add_header("Content-Type", "application/json");
    request.body = Some(br#"{"text":"hi"}"#.to_vec());
    request.credentials = Some(Credentials {
        username: "amelia".to_string(),
        password: Some("pw".to_string()),
    });

    let transport = HttpTransport::new(&Settings::default()).unwrap();
    let response = transport.send(&request, None).unwrap();

    mock.assert();
    assert_eq!(response.status_code, 201);
    assert!(response.is_json());
    assert_eq!(response.body_as_string().unwrap(), r#"{"id": 42}"#);
}

#[test]
fn test_dumps_are_written() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/ping")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("pong")
        .create();

    let dir = TempDir::new().unwrap();
    let dumps = DumpPaths::in_directory(&dir.path().join("1-ping"));
    let request = RequestDescriptor::new(HttpMethod::GET, uri(&server, "/ping"));

    let transport = HttpTransport::new(&Settings::default()).unwrap();
    transport.send(&request, Some(&dumps)).unwrap();

    let sent = fs::read_to_string(&dumps.request).unwrap();
    assert!(sent.starts_with(&format!("GET {}/ping HTTP/1.1", server.url())));

    let received = fs::read_to_string(&dumps.response).unwrap();
    assert!(received.contains(" 200 OK\r\n"));
    assert!(received.ends_with("\r\n\r\npong"));
}

#[test]
fn test_redirects_can_be_disabled() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/old")
        .with_status(301)
        .with_header("location", "/new")
        .create();
    let target = server.mock("GET", "/new").with_status(200).expect(0).create();

    let settings = Settings {
        follow_redirects: false,
        ..Settings::default()
    };
    let transport = HttpTransport::new(&settings).unwrap();
    let response = transport
        .send(&RequestDescriptor::new(HttpMethod::GET, uri(&server, "/old")), None)
        .unwrap();

    assert_eq!(response.status_code, 301);
    assert_eq!(response.header("Location"), Some("/new"));
    target.assert();
}

#[test]
fn test_connection_refused_is_a_network_error() {
    let transport = HttpTransport::new(&Settings {
        timeout: 2000,
        ..Settings::default()
    })
    .unwrap();
    let request = RequestDescriptor::new(
        HttpMethod::GET,
        RequestUri::parse("http://127.0.0.1:9/unreachable").unwrap(),
    );

    match transport.send(&request, None) {
        Err(RequestError::NetworkError(_)) | Err(RequestError::Timeout) => {}
        other => panic!("expected a network error, got {:?}", other),
    }
}

#[test]
fn test_flow_against_server() {
    let mut server = mockito::Server::new();
    let create = server
        .mock("POST", "/v2/sessions")
        .match_header("user-agent", Matcher::Regex("^rest-flow/".to_string()))
        .match_body(Matcher::Json(json!({"user": "amelia"})))
        .with_status(201)
        .with_header("content-type", "application/json; charset=utf-8")
        .with_body(r#"{"session": {"id": "s-77"}}"#)
        .create();
    let check = server
        .mock("GET", "/v2/sessions/s-77")
        .match_query(Matcher::UrlEncoded("full".to_string(), "1".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"active": true}"#)
        .create();

    let (_dir, project) = create_project();
    project
        .write_context_yaml("api", &format!("base_url: {}/v2/\nuser: amelia\n", server.url()))
        .unwrap();
    project
        .write_action_yaml(
            "sessions/create",
            "method: POST\npath: sessions\njson_body:\n  user: \"{{user}}\"\noutputs:\n  session_id: \"{{session.id}}\"\n",
        )
        .unwrap();
    project
        .write_action_yaml(
            "sessions/check",
            "path: \"sessions/{{session_id}}\"\nquery:\n  full: 1\noutputs:\n  active: \"{{active}}\"\n",
        )
        .unwrap();
    project
        .write_flow_yaml("login", "requests: [sessions/create, sessions/check]\n")
        .unwrap();

    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    let transport = HttpTransport::new(project.settings()).unwrap();
    let run = session.perform_flow("login", &transport).unwrap();

    create.assert();
    check.assert();
    assert_eq!(run.executed.len(), 2);
    assert_eq!(session.variables()["session_id"], json!("s-77"));
    assert_eq!(session.variables()["active"], json!(true));

    let dump_directory = run.executed[1].dump_directory.as_ref().unwrap();
    let dump = fs::read_to_string(dump_directory.join("response.txt")).unwrap();
    assert!(dump.contains(r#"{"active": true}"#));
}

#[test]
fn test_relative_target_without_base_url() {
    let (_dir, project) = create_project();
    let mut session = project.create_session("main", vec![], Map::new()).unwrap();
    let transport = HttpTransport::new(project.settings()).unwrap();

    let executed = session
        .perform_request(
            &ActionRef::inline(json!({"path": "/nowhere"})),
            &BuildOptions::new(),
            &transport,
        )
        .unwrap();

    assert!(executed.response.is_transport_failure());
    assert!(executed.response.status_text.contains("Invalid URL"));
}

#[test]
fn test_truncated_body_keeps_status_and_headers() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).unwrap();
        stream
            .write_all(
                b"HTTP/1.1 202 Accepted\r\nContent-Type: text/plain\r\nX-Batch: 9\r\nContent-Length: 100\r\n\r\npartial",
            )
            .unwrap();
    });

    let transport = HttpTransport::new(&Settings::default()).unwrap();
    let request = RequestDescriptor::new(
        HttpMethod::GET,
        RequestUri::parse(&format!("http://{}/batch", addr)).unwrap(),
    );
    let response = transport.send(&request, None).unwrap();
    server.join().unwrap();

    assert_eq!(response.status_code, 202);
    assert!(!response.is_transport_failure());
    assert_eq!(response.header("X-Batch"), Some("9"));
    assert!(b"partial".starts_with(&response.body));
}
