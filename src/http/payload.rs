//! Request bodies and their constraints.
//!
//! Bodies are read as raw bytes and decoded here, after attestation and rate
//! limiting have admitted the request.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::http::error::{ApiError, FieldViolation};

/// Character ceiling for card text.
pub const MAX_TEXT_CHARS: usize = 20_000;
pub const MAX_ORGANIZATION_CHARS: usize = 500;
pub const MAX_WEBSITE_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    pub organization: Option<String>,
    pub website: Option<String>,
    pub raw_text: Option<String>,
}

/// A validated parse body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInput {
    pub text: String,
}

/// A validated enrich body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichInput {
    pub organization: String,
    /// `None` when absent or blank.
    pub website: Option<String>,
    pub raw_text: String,
}

/// Decode JSON, reporting syntax or type errors as a `body` violation.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| {
        ApiError::Invalid(vec![FieldViolation::new("body", format!("invalid JSON: {}", e))])
    })
}

fn check_len(
    violations: &mut Vec<FieldViolation>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        violations.push(FieldViolation::new(
            field,
            format!("must be at least {} characters", min),
        ));
    } else if len > max {
        violations.push(FieldViolation::new(
            field,
            format!("must be at most {} characters", max),
        ));
    }
}

impl ParseRequest {
    pub fn validate(self) -> Result<ParseInput, ApiError> {
        let mut violations = Vec::new();
        match &self.text {
            Some(text) => check_len(&mut violations, "text", text, 1, MAX_TEXT_CHARS),
            None => violations.push(FieldViolation::new("text", "is required")),
        }

        match self.text {
            Some(text) if violations.is_empty() => Ok(ParseInput { text }),
            _ => Err(ApiError::Invalid(violations)),
        }
    }
}

impl EnrichRequest {
    pub fn validate(self) -> Result<EnrichInput, ApiError> {
        let mut violations = Vec::new();

        match &self.organization {
            Some(org) => check_len(&mut violations, "organization", org, 1, MAX_ORGANIZATION_CHARS),
            None => violations.push(FieldViolation::new("organization", "is required")),
        }
        if let Some(website) = &self.website {
            check_len(&mut violations, "website", website, 0, MAX_WEBSITE_CHARS);
        }
        if let Some(raw) = &self.raw_text {
            check_len(&mut violations, "rawText", raw, 0, MAX_TEXT_CHARS);
        }

        if !violations.is_empty() {
            return Err(ApiError::Invalid(violations));
        }

        Ok(EnrichInput {
            organization: self.organization.unwrap_or_default(),
            website: self.website.filter(|w| !w.trim().is_empty()),
            raw_text: self.raw_text.unwrap_or_default(),
        })
    }
}
