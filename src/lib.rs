//! API gateway for the campus platform.
//!
//! Inbound requests are authenticated against the auth server, rewritten for
//! the matching downstream service (courses, payments, users), dispatched,
//! and the downstream (body, status) pair is relayed back verbatim. A
//! privileged status route fans out to every upstream and merges partial
//! failures into a composite health document.

pub mod auth;
pub mod config;
mod error;
pub mod forward;
pub mod http;
pub mod status;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use http::{GatewayState, router};
