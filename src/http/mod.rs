//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request id, trace span)
//!     → middleware/attestation.rs (device token → DeviceIdentity)
//!     → security::rate_limit (per route/device/ip budget)
//!     → handlers.rs (body read, payload.rs validation, completion call)
//!     → error.rs (uniform JSON error bodies)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod payload;
pub mod server;

pub use error::{ApiError, FieldViolation};
pub use server::{AppState, HttpServer};
