//! Request construction from actions.

pub mod builder;
pub mod uri;

pub use builder::{descriptor_from_fields, BuildOptions, BuiltRequest, RequestBuilder};
pub use uri::RequestUri;
