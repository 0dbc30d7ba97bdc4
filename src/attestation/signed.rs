//! Signed attestation.
//!
//! Token format: `base64(payload) "." base64(signature)` where the signature
//! is ed25519 over the exact payload bytes. The payload carries the same
//! claims as the unsigned token.

use std::time::SystemTime;

use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};

use super::token::{decode_b64, TOKEN_B64};
use super::{AttestationError, ClaimPolicy, DeviceIdentity, RawClaims, TokenVerifier};

pub struct SignedVerifier {
    policy: ClaimPolicy,
    key: VerifyingKey,
}

impl SignedVerifier {
    pub fn new(policy: ClaimPolicy, key: VerifyingKey) -> Self {
        Self { policy, key }
    }

    /// Build from a base64-encoded 32-byte ed25519 public key.
    pub fn from_base64_key(policy: ClaimPolicy, key: &str) -> Result<Self, AttestationError> {
        let bytes = TOKEN_B64
            .decode(key.trim())
            .map_err(|_| AttestationError::InvalidKey("public key is not base64".into()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AttestationError::InvalidKey("public key must be 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|_| AttestationError::InvalidKey("not an ed25519 point".into()))?;
        Ok(Self::new(policy, key))
    }
}

impl TokenVerifier for SignedVerifier {
    fn verify(&self, header: Option<&str>, now: SystemTime) -> Result<DeviceIdentity, AttestationError> {
        let header = header
            .filter(|h| !h.trim().is_empty())
            .ok_or(AttestationError::Missing)?;
        let (payload_b64, signature_b64) = header
            .trim()
            .split_once('.')
            .ok_or(AttestationError::Malformed)?;

        let payload = decode_b64(payload_b64)?;
        let signature = decode_b64(signature_b64)?;
        let signature =
            Signature::try_from(signature.as_slice()).map_err(|_| AttestationError::Malformed)?;
        self.key
            .verify_strict(&payload, &signature)
            .map_err(|_| AttestationError::BadSignature)?;

        let claims = RawClaims::from_json(&payload)?;
        self.policy.check(claims, now)
    }

    fn kind(&self) -> &'static str {
        "signed"
    }
}

/// Produce a signed token. Used by tests and the CLI.
pub fn sign_token(payload_json: &[u8], key: &ed25519_dalek::SigningKey) -> String {
    use ed25519_dalek::Signer;

    let signature = key.sign(payload_json);
    format!(
        "{}.{}",
        TOKEN_B64.encode(payload_json),
        TOKEN_B64.encode(signature.to_bytes())
    )
}
