//! Attestation Middleware.
//! Rejects requests without a valid device token.

use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::attestation::{TokenVerifier, ATTEST_HEADER};
use crate::http::error::ApiError;
use crate::observability::metrics;
use crate::security::rate_limit::route_name;

pub async fn attestation_middleware(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    matched: MatchedPath,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let route = route_name(matched.as_str());

    // A header that is not visible ASCII is treated as absent.
    let header = req
        .headers()
        .get(ATTEST_HEADER)
        .and_then(|v| v.to_str().ok());

    match verifier.verify(header, SystemTime::now()) {
        Ok(identity) => {
            tracing::debug!(
                route = %route,
                device = %identity.short(),
                verifier = verifier.kind(),
                "Attestation accepted"
            );
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(route = %route, reason = %e, "Attestation rejected");
            metrics::record_rejection(route, "unauthorized");
            ApiError::Unauthorized.into_response()
        }
    }
}
