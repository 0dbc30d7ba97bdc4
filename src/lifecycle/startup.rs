//! Startup orchestration.
//!
//! Builds every collaborator from configuration in dependency order. Any
//! failure here is fatal: the gateway never serves with a half-built gate.

use std::sync::Arc;

use thiserror::Error;

use crate::attestation::{build_verifier, AttestationError};
use crate::completion::{CompletionService, GeminiClient};
use crate::config::ServiceConfig;
use crate::http::server::AppState;
use crate::outbound::{SafeFetcher, SystemResolver};
use crate::security::store::MemoryStore;
use crate::security::RateLimiter;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("attestation setup failed: {0}")]
    Attestation(#[from] AttestationError),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything the HTTP layer needs, ready to serve.
pub struct Components {
    pub state: AppState,
    /// Set when rate limiting fell back to memory; its sweeper runs with the server.
    pub memory_store: Option<Arc<MemoryStore>>,
}

pub fn assemble(config: &ServiceConfig) -> Result<Components, StartupError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("cardscan-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let verifier = build_verifier(&config.attestation)?;
    let (limiter, memory_store) = RateLimiter::from_config(&config.rate_limit, client.clone());
    let fetcher = SafeFetcher::new(&config.outbound, Arc::new(SystemResolver));
    let completion: Arc<dyn CompletionService> =
        Arc::new(GeminiClient::new(client, &config.completion));

    tracing::info!(
        attestation = verifier.kind(),
        rate_limit_store = limiter.store().kind(),
        limit = limiter.limit(),
        window_secs = limiter.window().as_secs(),
        "Gateway components ready"
    );

    Ok(Components {
        state: AppState {
            verifier,
            limiter: Arc::new(limiter),
            fetcher: Arc::new(fetcher),
            completion,
            max_body_bytes: config.security.max_body_bytes,
            max_page_text_chars: config.outbound.max_page_text_chars,
        },
        memory_store,
    })
}
