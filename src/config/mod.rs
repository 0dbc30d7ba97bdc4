//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → ServiceConfig::apply_env (secrets from environment)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    AttestationConfig, AttestationMode, CompletionConfig, ListenerConfig, ObservabilityConfig,
    OutboundConfig, RateLimitConfig, SecurityConfig, ServiceConfig, StoreFailurePolicy,
    TimeoutConfig, TlsConfig,
};
