//! Per-identifier fixed-window rate limiting.
//!
//! Identifiers are `"<route>:<deviceId>:<ip>"`, so each route has its own
//! budget per device and source address.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::attestation::DeviceIdentity;
use crate::config::{RateLimitConfig, StoreFailurePolicy};
use crate::http::error::ApiError;
use crate::observability::metrics;
use crate::security::headers::{client_ip, X_RATELIMIT_REMAINING};
use crate::security::store::{MemoryStore, RateLimitStore, StoreError, UpstashStore};

/// Result of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub admitted: bool,
    /// Advisory; only reported back in a header.
    pub remaining: u32,
    pub retry_after: Duration,
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit store failed: {0}")]
    Store(#[from] StoreError),
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window: Duration,
    on_store_error: StoreFailurePolicy,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        limit: u32,
        window: Duration,
        on_store_error: StoreFailurePolicy,
    ) -> Self {
        Self {
            store,
            limit,
            window,
            on_store_error,
        }
    }

    /// Pick the durable store when credentials are configured, else memory.
    ///
    /// The in-memory store is returned separately so the caller can run its
    /// sweeper.
    pub fn from_config(
        config: &RateLimitConfig,
        client: reqwest::Client,
    ) -> (Self, Option<Arc<MemoryStore>>) {
        let (store, memory): (Arc<dyn RateLimitStore>, _) =
            match (&config.upstash_url, &config.upstash_token) {
                (Some(url), Some(token)) => {
                    tracing::info!(url = %url, "Rate limiting backed by Upstash Redis");
                    (
                        Arc::new(UpstashStore::new(client, url, token, &config.key_prefix)),
                        None,
                    )
                }
                _ => {
                    tracing::warn!(
                        "UPSTASH_REDIS_REST_URL/TOKEN not configured, using in-memory rate limiting (per instance, lost on restart)"
                    );
                    let memory = Arc::new(MemoryStore::new());
                    (memory.clone(), Some(memory))
                }
            };

        (
            Self::new(store, config.limit, config.window(), config.on_store_error),
            memory,
        )
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Count one request for `identifier`.
    pub async fn check(&self, identifier: &str) -> Result<Admission, RateLimitError> {
        match self.store.increment(identifier, self.limit, self.window).await {
            Ok(hit) => Ok(Admission {
                admitted: hit.admitted,
                remaining: self.limit.saturating_sub(hit.state.count),
                retry_after: hit.state.resets_in,
            }),
            Err(e) => match self.on_store_error {
                StoreFailurePolicy::FailOpen => {
                    tracing::warn!(
                        store = self.store.kind(),
                        error = %e,
                        "Rate limit store failed, admitting request (fail-open)"
                    );
                    metrics::record_store_error(self.store.kind());
                    Ok(Admission {
                        admitted: true,
                        remaining: 0,
                        retry_after: Duration::ZERO,
                    })
                }
                StoreFailurePolicy::FailClosed => {
                    metrics::record_store_error(self.store.kind());
                    Err(e.into())
                }
            },
        }
    }
}

/// Compose the limiter key for one request.
pub fn identifier(route: &str, device_id: &str, ip: &str) -> String {
    format!("{}:{}:{}", route, device_id, ip)
}

/// Route label from the matched path: `/api/parse` → `parse`.
pub fn route_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Middleware enforcing the limiter on gated routes.
///
/// Must run after attestation: it keys on the [`DeviceIdentity`] extension.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    matched: MatchedPath,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = route_name(matched.as_str()).to_string();

    let Some(device) = request.extensions().get::<DeviceIdentity>().cloned() else {
        tracing::error!(route = %route, "Rate limiter reached without device identity");
        return ApiError::Unauthorized.into_response();
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(request.headers(), peer);
    let key = identifier(&route, &device.device_id, &ip);

    let admission = match limiter.check(&key).await {
        Ok(admission) => admission,
        Err(e) => {
            tracing::error!(route = %route, error = %e, "Rate limit check failed (fail-closed)");
            return ApiError::Internal.into_response();
        }
    };

    if !admission.admitted {
        tracing::warn!(
            route = %route,
            device = %device.short(),
            client_ip = %ip,
            "Rate limit exceeded"
        );
        metrics::record_rejection(&route, "rate_limited");
        return ApiError::RateLimited {
            retry_after_secs: limiter.window().as_secs().max(1),
            remaining: admission.remaining,
        }
        .into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(X_RATELIMIT_REMAINING, HeaderValue::from(admission.remaining));
    response
}
