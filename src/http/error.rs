//! Client-facing error responses.
//!
//! Every rejection the gateway emits goes through [`ApiError`], which keeps
//! bodies generic: authentication failures carry no reason and internal
//! failures never echo the underlying error.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::security::headers::X_RATELIMIT_REMAINING;

/// One failed payload constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Attestation failed for any reason.
    Unauthorized,
    RateLimited {
        retry_after_secs: u64,
        remaining: u32,
    },
    Invalid(Vec<FieldViolation>),
    /// Upstream or internal failure; detail is logged, not returned.
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Unauthorized Device" })),
            )
                .into_response(),
            ApiError::RateLimited {
                retry_after_secs,
                remaining,
            } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": "Rate limit exceeded. Try again later." })),
                )
                    .into_response();
                let headers = response.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
                response
            }
            ApiError::Invalid(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request", "details": details })),
            )
                .into_response(),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_headers() {
        let response = ApiError::RateLimited {
            retry_after_secs: 60,
            remaining: 0,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "0");
    }

    #[test]
    fn test_statuses() {
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Invalid(vec![]).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
