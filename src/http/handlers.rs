//! Route handlers. Attestation and rate limiting have already admitted the
//! request by the time these run.

use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::completion::prompts::{enrich_prompt, parse_prompt};
use crate::completion::{decode_reply, CompanyProfile, ParsedContact};
use crate::http::error::{ApiError, FieldViolation};
use crate::http::payload::{decode, EnrichRequest, ParseRequest};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::outbound::{PageSummary, SafeFetcher};

/// Website material for the enrichment prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteContext {
    Content { url: String, page: PageSummary },
    /// Fetch refused or failed; the prompt says so explicitly.
    Unavailable { website: String },
}

impl SiteContext {
    pub async fn gather(fetcher: &SafeFetcher, website: &str, max_chars: usize) -> Self {
        match fetcher.fetch(website).await {
            Ok(html) => SiteContext::Content {
                url: website.trim().to_string(),
                page: PageSummary::from_html(&html, max_chars),
            },
            Err(e) => {
                tracing::info!(website = %website, error = %e, "Website enrichment unavailable, continuing without it");
                SiteContext::Unavailable {
                    website: website.to_string(),
                }
            }
        }
    }

    pub fn render(&self) -> String {
        match self {
            SiteContext::Content { url, page } => format!(
                "\n\nWebsite data ({}):\nMeta description: {}\nPage text: {}",
                url,
                page.description.as_deref().unwrap_or(""),
                page.text
            ),
            SiteContext::Unavailable { website } => {
                format!("\n(Website content unavailable: {})", website)
            }
        }
    }
}

async fn read_body(request: Request<Body>, limit: usize) -> Result<axum::body::Bytes, ApiError> {
    to_bytes(request.into_body(), limit).await.map_err(|_| {
        ApiError::Invalid(vec![FieldViolation::new(
            "body",
            format!("must be at most {} bytes", limit),
        )])
    })
}

/// Card text → structured contact fields.
pub async fn parse(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let result = parse_inner(&state, request).await;
    finish("parse", start, result)
}

async fn parse_inner(state: &AppState, request: Request<Body>) -> Result<Response, ApiError> {
    let bytes = read_body(request, state.max_body_bytes).await?;
    let input = decode::<ParseRequest>(&bytes)?.validate()?;

    let reply = state
        .completion
        .complete(&parse_prompt(&input.text))
        .await
        .map_err(|e| {
            tracing::error!(route = "parse", error = %e, "Completion failed");
            ApiError::Internal
        })?;
    let contact: ParsedContact = decode_reply(&reply).map_err(|e| {
        tracing::error!(route = "parse", error = %e, "Completion reply unusable");
        ApiError::Internal
    })?;

    Ok(Json(contact).into_response())
}

/// Company name, card text and optional website → short company profile.
pub async fn enrich(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let result = enrich_inner(&state, request).await;
    finish("enrich", start, result)
}

async fn enrich_inner(state: &AppState, request: Request<Body>) -> Result<Response, ApiError> {
    let bytes = read_body(request, state.max_body_bytes).await?;
    let input = decode::<EnrichRequest>(&bytes)?.validate()?;

    let mut context = format!(
        "Company name: {}\nBusiness card text: {}",
        input.organization, input.raw_text
    );
    if let Some(website) = &input.website {
        let site = SiteContext::gather(&state.fetcher, website, state.max_page_text_chars).await;
        context.push_str(&site.render());
    }

    let reply = state
        .completion
        .complete(&enrich_prompt(&context))
        .await
        .map_err(|e| {
            tracing::error!(route = "enrich", error = %e, "Completion failed");
            ApiError::Internal
        })?;
    let profile: CompanyProfile = decode_reply(&reply).map_err(|e| {
        tracing::error!(route = "enrich", error = %e, "Completion reply unusable");
        ApiError::Internal
    })?;

    Ok(Json(profile).into_response())
}

fn finish(route: &str, start: Instant, result: Result<Response, ApiError>) -> Response {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(ApiError::Invalid(_)) => "invalid",
        Err(_) => "error",
    };
    metrics::record_request(route, outcome, start);
    result.unwrap_or_else(IntoResponse::into_response)
}

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_context_rendering() {
        let unavailable = SiteContext::Unavailable { website: "acme.pl".into() };
        assert_eq!(unavailable.render(), "\n(Website content unavailable: acme.pl)");

        let content = SiteContext::Content {
            url: "acme.pl".into(),
            page: PageSummary {
                description: Some("Okna".into()),
                text: "Producent okien".into(),
            },
        };
        let rendered = content.render();
        assert!(rendered.contains("Meta description: Okna"));
        assert!(rendered.contains("Page text: Producent okien"));
    }
}
