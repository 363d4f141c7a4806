//! HTTP transport backed by a blocking reqwest client.

use super::dump::{write_request_dump, write_response_dump};
use super::{DumpPaths, RequestError, Transport};
use crate::config::Settings;
use crate::models::{HttpMethod, HttpResponse, RequestDescriptor};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::io::Read;
use std::time::Instant;

/// Sends requests over the network.
///
/// Timeout, redirect handling and certificate validation come from the
/// project [`Settings`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<Self, RequestError> {
        let redirect = if settings.follow_redirects {
            Policy::limited(settings.max_redirects as usize)
        } else {
            Policy::none()
        };

        if !settings.validate_ssl {
            warn!("TLS certificate validation is disabled");
        }

        let client = Client::builder()
            .timeout(settings.timeout_duration())
            .redirect(redirect)
            .danger_accept_invalid_certs(!settings.validate_ssl)
            .build()
            .map_err(|e| RequestError::BuildError(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: &RequestDescriptor,
        dumps: Option<&DumpPaths>,
    ) -> Result<HttpResponse, RequestError> {
        let url = request
            .uri
            .as_url()
            .cloned()
            .ok_or_else(|| RequestError::InvalidUrl(request.uri.to_string()))?;

        if let Some(paths) = dumps {
            write_request_dump(paths, request)?;
        }

        let start_time = Instant::now();
        let mut builder = self.client.request(to_reqwest_method(request.method), url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, credentials.password.as_ref());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        debug!("sending {} {}", request.method, request.uri);
        let mut response = builder.send()?;

        let mut result = HttpResponse::new(
            response.status().as_u16(),
            response.status().canonical_reason().unwrap_or("Unknown"),
        );
        result.http_version = format!("{:?}", response.version());

        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => result.add_header(name.as_str(), value),
                Err(_) => debug!("skipping non-text header {}", name),
            }
        }

        // The status line and headers already arrived; keep them along with
        // whatever part of the body was read.
        let mut body = Vec::new();
        if let Err(e) = response.read_to_end(&mut body) {
            warn!(
                "body of {} {} cut short after {} bytes: {}",
                request.method,
                request.uri,
                body.len(),
                e
            );
        }
        result.set_body(body);
        result.duration = start_time.elapsed();
        debug!(
            "received {} ({} bytes) in {:?}",
            result.status_code,
            result.body.len(),
            result.duration
        );

        if let Some(paths) = dumps {
            write_response_dump(paths, &result)?;
        }

        Ok(result)
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::GET => reqwest::Method::GET,
        HttpMethod::POST => reqwest::Method::POST,
        HttpMethod::PUT => reqwest::Method::PUT,
        HttpMethod::DELETE => reqwest::Method::DELETE,
        HttpMethod::PATCH => reqwest::Method::PATCH,
        HttpMethod::HEAD => reqwest::Method::HEAD,
        HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        HttpMethod::TRACE => reqwest::Method::TRACE,
        HttpMethod::CONNECT => reqwest::Method::CONNECT,
    }
}
