//! Plain-text renderings of requests and responses.
//!
//! Dumps are written in HTTP/1.1 message form so they can be read, diffed or
//! replayed by hand.

use super::DumpPaths;
use crate::models::{HttpResponse, RequestDescriptor};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::io;

/// Renders a request as an HTTP/1.1 message.
pub fn render_request(request: &RequestDescriptor) -> Vec<u8> {
    let mut out = format!("{} {} HTTP/1.1\r\n", request.method, request.uri);

    for (name, value) in &request.headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    if let Some(credentials) = &request.credentials {
        let pair = format!(
            "{}:{}",
            credentials.username,
            credentials.password.as_deref().unwrap_or_default()
        );
        out.push_str(&format!("Authorization: Basic {}\r\n", STANDARD.encode(pair)));
    }
    out.push_str("\r\n");

    let mut bytes = out.into_bytes();
    if let Some(body) = &request.body {
        bytes.extend_from_slice(body);
    }
    bytes
}

/// Renders a response as an HTTP/1.1 message.
pub fn render_response(response: &HttpResponse) -> Vec<u8> {
    let mut out = format!("{}\r\n", response.status_line());
    for (name, value) in &response.headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&response.body);
    bytes
}

pub fn write_request_dump(paths: &DumpPaths, request: &RequestDescriptor) -> io::Result<()> {
    ensure_parent(paths)?;
    fs::write(&paths.request, render_request(request))
}

pub fn write_response_dump(paths: &DumpPaths, response: &HttpResponse) -> io::Result<()> {
    ensure_parent(paths)?;
    fs::write(&paths.response, render_response(response))
}

fn ensure_parent(paths: &DumpPaths) -> io::Result<()> {
    match paths.request.parent() {
        Some(dir) => fs::create_dir_all(dir),
        None => Ok(()),
    }
}
