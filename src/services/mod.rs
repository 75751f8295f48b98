//! Service layer for business logic
//!
//! Services sit between the HTTP handlers / CLI and the stores. They own
//! validation and identifier allocation, and hand counter updates to the
//! background updater so request paths never wait on them.

mod content_service;
mod url_service;

pub use content_service::*;
pub use url_service::*;
