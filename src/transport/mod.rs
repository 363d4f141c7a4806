//! Sending requests.
//!
//! A [`Transport`] takes a fully built [`RequestDescriptor`] and returns the
//! [`HttpResponse`]. Sessions talk to transports only through this trait, so
//! tests can substitute a recording fake for the real HTTP client.

pub mod dump;
pub mod error;
pub mod http;

pub use error::RequestError;
pub use http::HttpTransport;

use crate::models::{HttpResponse, RequestDescriptor};
use std::path::{Path, PathBuf};

const REQUEST_DUMP_FILE: &str = "request.txt";
const RESPONSE_DUMP_FILE: &str = "response.txt";

/// Files receiving the raw request and response of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPaths {
    pub request: PathBuf,
    pub response: PathBuf,
}

impl DumpPaths {
    /// The standard dump files inside an execution directory.
    pub fn in_directory(dir: &Path) -> Self {
        Self {
            request: dir.join(REQUEST_DUMP_FILE),
            response: dir.join(RESPONSE_DUMP_FILE),
        }
    }
}

/// Something that can perform an HTTP exchange.
pub trait Transport {
    /// Sends the request and returns the response.
    ///
    /// When `dumps` is given, the transport writes the outbound and inbound
    /// messages to those files.
    fn send(
        &self,
        request: &RequestDescriptor,
        dumps: Option<&DumpPaths>,
    ) -> Result<HttpResponse, RequestError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(
        &self,
        request: &RequestDescriptor,
        dumps: Option<&DumpPaths>,
    ) -> Result<HttpResponse, RequestError> {
        (**self).send(request, dumps)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(
        &self,
        request: &RequestDescriptor,
        dumps: Option<&DumpPaths>,
    ) -> Result<HttpResponse, RequestError> {
        (**self).send(request, dumps)
    }
}
