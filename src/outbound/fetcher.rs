//! Bounded, SSRF-protected HTTP GET.

use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;

use crate::config::OutboundConfig;
use crate::observability::metrics;
use crate::outbound::url_guard::{Resolver, SanitizedUrl, UrlGuard, UrlRejection};

/// Why a fetch produced no content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Rejected(#[from] UrlRejection),

    #[error("Redirects are not allowed")]
    Redirect,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Response too large (max {limit} bytes)")]
    TooLarge { limit: usize },

    #[error("Request timeout")]
    Timeout,

    #[error("Fetch failed: {0}")]
    Failed(String),
}

impl FetchError {
    /// Stable label for metrics.
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Rejected(rejection) => rejection.code(),
            FetchError::Redirect => "redirect",
            FetchError::Status(_) => "status",
            FetchError::TooLarge { .. } => "too_large",
            FetchError::Timeout => "timeout",
            FetchError::Failed(_) => "failed",
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Failed(e.to_string())
        }
    }
}

/// Body text on success.
pub type FetchResult = Result<String, FetchError>;

pub struct SafeFetcher {
    guard: UrlGuard,
    timeout: Duration,
    max_bytes: usize,
    user_agent: String,
}

impl SafeFetcher {
    pub fn new(config: &OutboundConfig, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            guard: UrlGuard::new(config, resolver),
            timeout: config.timeout(),
            max_bytes: config.max_response_bytes,
            user_agent: config.user_agent.clone(),
        }
    }

    pub fn guard(&self) -> &UrlGuard {
        &self.guard
    }

    /// Validate `raw` and fetch it.
    pub async fn fetch(&self, raw: &str) -> FetchResult {
        let result = match self.guard.validate_and_sanitize(raw).await {
            Ok(target) => self.fetch_sanitized(&target).await,
            Err(rejection) => Err(rejection.into()),
        };

        match &result {
            Ok(body) => {
                tracing::debug!(bytes = body.len(), "Outbound fetch succeeded");
                metrics::record_fetch("ok");
            }
            Err(e) => {
                tracing::info!(reason = e.code(), error = %e, "Outbound fetch refused or failed");
                metrics::record_fetch(e.code());
            }
        }
        result
    }

    /// Fetch an already validated URL, connecting only to its resolved
    /// addresses.
    pub async fn fetch_sanitized(&self, target: &SanitizedUrl) -> FetchResult {
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(Policy::none())
            .user_agent(self.user_agent.clone())
            .resolve_to_addrs(target.host(), target.addrs())
            .build()
            .map_err(|e| FetchError::Failed(e.to_string()))?;

        let mut response = client
            .get(target.url().clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status.is_redirection() {
            return Err(FetchError::Redirect);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes as u64 {
                return Err(FetchError::TooLarge { limit: self.max_bytes });
            }
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::from_reqwest)? {
            if body.len() + chunk.len() > self.max_bytes {
                // Dropping the response here closes the connection mid-body.
                return Err(FetchError::TooLarge { limit: self.max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
