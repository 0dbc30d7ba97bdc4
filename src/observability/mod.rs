//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate stages and handlers produce:
//!     → logging.rs (structured log events, device ids shortened)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (human or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line via the trace span
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
