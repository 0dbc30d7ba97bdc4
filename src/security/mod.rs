//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after attestation):
//!     → rate_limit.rs (per route/device/ip window check)
//!     → store/ (memory or Upstash counters)
//!     → headers.rs (client address, security response headers)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed by default when the counter store is unreachable
//! - No trust in client-supplied addresses beyond keying limits

pub mod headers;
pub mod rate_limit;
pub mod store;

pub use rate_limit::{Admission, RateLimiter};
