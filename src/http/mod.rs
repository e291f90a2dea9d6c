//! HTTP transport for the admission controller.
//!
//! Thin shim: extracts the client key from a request header, asks the
//! controller for a decision, and translates the result into status codes
//! and headers. The core never sees the wire protocol.

mod server;
mod service;

pub use server::HttpServer;
pub use service::{router, AppState, CLIENT_ID_HEADER, RATELIMIT_RESET_HEADER};
