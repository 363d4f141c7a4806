//! Data models for resolved requests and their responses.
//!
//! This module contains the structures passed between the request builder,
//! the transport and the session.

pub mod executed;
pub mod request;
pub mod response;

pub use executed::ExecutedRequest;
pub use request::{Credentials, HttpMethod, RequestDescriptor};
pub use response::{is_json_media_type, HttpResponse};
