//! Card-scanning API gateway.
//!
//! Device attestation, per-device rate limiting and SSRF-hardened website
//! fetching in front of a generative completion backend.

pub mod attestation;
pub mod completion;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod outbound;
pub mod security;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
