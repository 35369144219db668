//! Docvault Infrastructure Library
//!
//! Shared infrastructure: telemetry initialization and HTTP middleware
//! (request IDs, security headers).

pub mod middleware;
pub mod telemetry;

pub use middleware::{request_id_middleware, security_headers_middleware, RequestId};
pub use telemetry::init_telemetry;
