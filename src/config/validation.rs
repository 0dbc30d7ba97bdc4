//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that mode-dependent settings are present
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{AttestationMode, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    let attestation = &config.attestation;
    if attestation.bundle_id.trim().is_empty() {
        errors.push(ValidationError::new("attestation.bundle_id", "must not be empty"));
    }
    if attestation.issuer.trim().is_empty() {
        errors.push(ValidationError::new("attestation.issuer", "must not be empty"));
    }
    if attestation.max_age_secs == 0 {
        errors.push(ValidationError::new("attestation.max_age_secs", "must be > 0"));
    }
    if attestation.mode == AttestationMode::Signed && attestation.public_key.is_none() {
        errors.push(ValidationError::new(
            "attestation.public_key",
            "required when mode = \"signed\"",
        ));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.limit == 0 {
        errors.push(ValidationError::new("rate_limit.limit", "must be > 0"));
    }
    if rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
    }
    if let Some(url) = &rate_limit.upstash_url {
        if url::Url::parse(url).is_err() {
            errors.push(ValidationError::new("rate_limit.upstash_url", "not a valid URL"));
        }
    }

    let outbound = &config.outbound;
    if outbound.timeout_ms == 0 {
        errors.push(ValidationError::new("outbound.timeout_ms", "must be > 0"));
    }
    if outbound.max_response_bytes == 0 {
        errors.push(ValidationError::new("outbound.max_response_bytes", "must be > 0"));
    }

    if config.completion.timeout_secs == 0 {
        errors.push(ValidationError::new("completion.timeout_secs", "must be > 0"));
    }
    if url::Url::parse(&config.completion.base_url).is_err() {
        errors.push(ValidationError::new("completion.base_url", "not a valid URL"));
    }

    if config.security.max_body_bytes == 0 {
        errors.push(ValidationError::new("security.max_body_bytes", "must be > 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_signed_mode_requires_key() {
        let mut config = ServiceConfig::default();
        config.attestation.mode = AttestationMode::Signed;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "attestation.public_key");
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.outbound.timeout_ms = 0;
        config.completion.timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "outbound.timeout_ms", "completion.timeout_secs"]
        );
    }
}
