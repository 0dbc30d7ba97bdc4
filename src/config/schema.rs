//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Device attestation settings.
    pub attestation: AttestationConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Outbound (website scraping) fetch policy.
    pub outbound: OutboundConfig,

    /// Generative completion backend.
    pub completion: CompletionConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// Overlay secrets from the process environment.
    ///
    /// Secrets are never expected in the config file; the variables below win
    /// over anything the file sets.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with a pluggable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.completion.api_key = key;
        }
        if let Some(url) = non_empty("UPSTASH_REDIS_REST_URL") {
            self.rate_limit.upstash_url = Some(url);
        }
        if let Some(token) = non_empty("UPSTASH_REDIS_REST_TOKEN") {
            self.rate_limit.upstash_token = Some(token);
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            shutdown_grace_secs: 10,
        }
    }
}

/// Which attestation verifier guards the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttestationMode {
    /// Unsigned claims, field and freshness checks only.
    #[default]
    Placeholder,
    /// Claims carry an ed25519 signature checked against `public_key`.
    Signed,
}

/// Device attestation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AttestationConfig {
    pub mode: AttestationMode,

    /// Expected `bundleId` claim.
    pub bundle_id: String,

    /// Expected `iss` claim (developer team id).
    pub issuer: String,

    /// Oldest acceptable token age in seconds.
    pub max_age_secs: u64,

    /// How far in the future a token timestamp may be, in seconds.
    pub max_future_skew_secs: u64,

    /// Base64 ed25519 public key, required in `signed` mode.
    pub public_key: Option<String>,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            mode: AttestationMode::Placeholder,
            bundle_id: "s.Wizytowki.Test1234".to_string(),
            issuer: "JK6DX9TLGX".to_string(),
            max_age_secs: 300,
            max_future_skew_secs: 60,
            public_key: None,
        }
    }
}

/// Behaviour when the rate-limit store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Reject the request with a generic server error.
    #[default]
    FailClosed,
    /// Admit the request and log the store error.
    FailOpen,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Admitted requests per identifier per window.
    pub limit: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    pub on_store_error: StoreFailurePolicy,

    /// Upstash Redis REST endpoint. Durable store is used when this and
    /// `upstash_token` are both set.
    pub upstash_url: Option<String>,

    #[serde(skip_serializing)]
    pub upstash_token: Option<String>,

    /// Key prefix in the durable store.
    pub key_prefix: String,

    /// Interval for sweeping expired in-memory records. 0 disables.
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 10,
            window_secs: 60,
            on_store_error: StoreFailurePolicy::FailClosed,
            upstash_url: None,
            upstash_token: None,
            key_prefix: "ratelimit".to_string(),
            sweep_interval_secs: 0,
        }
    }
}

/// Outbound fetch policy for website enrichment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Fetch timeout in milliseconds (covers DNS, connect and body).
    pub timeout_ms: u64,

    /// Hard cap on response body size.
    pub max_response_bytes: usize,

    pub user_agent: String,

    /// Extra hostnames refused in addition to the built-in deny list.
    pub blocked_hosts: Vec<String>,

    /// Accept plain `http://` URLs. Local testing only.
    pub allow_http: bool,

    /// Accept hosts resolving to private addresses. Local testing only.
    pub allow_private_networks: bool,

    /// Characters of page text forwarded to the completion prompt.
    pub max_page_text_chars: usize,
}

impl OutboundConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_response_bytes: 2 * 1024 * 1024, // 2MB
            user_agent: "Mozilla/5.0 (Compatible; CardscanGateway/1.0)".to_string(),
            blocked_hosts: Vec::new(),
            allow_http: false,
            allow_private_networks: false,
            max_page_text_chars: 4_000,
        }
    }
}

/// Generative completion backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// API base URL.
    pub base_url: String,

    pub model: String,

    #[serde(skip_serializing)]
    pub api_key: String,

    /// Completion call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add `Cache-Control` / `X-Content-Type-Options` to every response.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
