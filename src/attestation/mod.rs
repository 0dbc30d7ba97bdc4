//! Device attestation subsystem.
//!
//! # Data Flow
//! ```text
//! x-attest-token header
//!     → token.rs (base64 + JSON decode into raw claims)
//!     → [signed.rs: ed25519 signature over the payload bytes]
//!     → ClaimPolicy::check (required fields, bundle, issuer, freshness)
//!     → DeviceIdentity handed to the rate limiter
//! ```
//!
//! # Design Decisions
//! - Verification is synchronous and touches no shared state
//! - Checks short-circuit cheapest first
//! - Every failure collapses into a single generic denial at the HTTP edge;
//!   the precise reason is only logged
//! - The placeholder verifier is NOT cryptographic: anyone who knows the
//!   bundle id and issuer can mint a token. `SignedVerifier` is the drop-in
//!   replacement once device keys are provisioned.

pub mod placeholder;
pub mod signed;
pub mod token;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::config::{AttestationConfig, AttestationMode};

pub use placeholder::PlaceholderVerifier;
pub use signed::SignedVerifier;
pub use token::{AttestationToken, RawClaims};

/// Header carrying the attestation token.
pub const ATTEST_HEADER: &str = "x-attest-token";

/// Why a token was refused.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttestationError {
    #[error("missing attestation token")]
    Missing,

    #[error("token is not valid base64/JSON")]
    Malformed,

    #[error("token is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("bundle id mismatch")]
    BundleMismatch,

    #[error("issuer mismatch")]
    IssuerMismatch,

    #[error("token age {age:.1}s outside accepted window")]
    Stale { age: f64 },

    #[error("token signature invalid")]
    BadSignature,

    #[error("invalid verification key: {0}")]
    InvalidKey(String),
}

/// Identity extracted from an accepted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
}

impl DeviceIdentity {
    /// Log-safe prefix of the device id.
    pub fn short(&self) -> &str {
        match self.device_id.char_indices().nth(8) {
            Some((idx, _)) => &self.device_id[..idx],
            None => &self.device_id,
        }
    }
}

/// Capability interface the gateway composes against.
pub trait TokenVerifier: Send + Sync {
    /// Validate the raw header value at instant `now`.
    fn verify(&self, header: Option<&str>, now: SystemTime) -> Result<DeviceIdentity, AttestationError>;

    /// Short name for logs.
    fn kind(&self) -> &'static str;
}

/// Claim checks shared by every verifier.
#[derive(Debug, Clone)]
pub struct ClaimPolicy {
    pub bundle_id: String,
    pub issuer: String,
    /// Maximum accepted `now - timestamp`, inclusive.
    pub max_age_secs: f64,
    /// Maximum accepted `timestamp - now`, inclusive.
    pub max_future_skew_secs: f64,
}

impl ClaimPolicy {
    pub fn from_config(config: &AttestationConfig) -> Self {
        Self {
            bundle_id: config.bundle_id.clone(),
            issuer: config.issuer.clone(),
            max_age_secs: config.max_age_secs as f64,
            max_future_skew_secs: config.max_future_skew_secs as f64,
        }
    }

    /// Validate decoded claims in the documented order.
    pub fn check(&self, claims: RawClaims, now: SystemTime) -> Result<DeviceIdentity, AttestationError> {
        let token = claims.into_token()?;

        if token.bundle_id != self.bundle_id {
            return Err(AttestationError::BundleMismatch);
        }
        if token.issuer != self.issuer {
            return Err(AttestationError::IssuerMismatch);
        }

        let age = unix_seconds(now) - token.timestamp;
        if age > self.max_age_secs || age < -self.max_future_skew_secs {
            return Err(AttestationError::Stale { age });
        }

        Ok(DeviceIdentity {
            device_id: token.device_id,
        })
    }
}

/// Seconds since the epoch as a float; instants before the epoch map to 0.
pub fn unix_seconds(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Build the verifier selected by configuration.
pub fn build_verifier(config: &AttestationConfig) -> Result<Arc<dyn TokenVerifier>, AttestationError> {
    let policy = ClaimPolicy::from_config(config);
    match config.mode {
        AttestationMode::Placeholder => {
            tracing::warn!(
                "attestation running in placeholder mode: tokens are unsigned and can be forged"
            );
            Ok(Arc::new(PlaceholderVerifier::new(policy)))
        }
        AttestationMode::Signed => {
            let key = config
                .public_key
                .as_deref()
                .ok_or_else(|| AttestationError::InvalidKey("no public key configured".into()))?;
            Ok(Arc::new(SignedVerifier::from_base64_key(policy, key)?))
        }
    }
}
