//! Unsigned attestation: field and freshness checks only.

use std::time::SystemTime;

use super::{AttestationError, ClaimPolicy, DeviceIdentity, RawClaims, TokenVerifier};

/// Verifier for self-asserted tokens.
///
/// Nothing ties the token to a device key, so a caller that knows the bundle
/// id and issuer can forge one. It only filters casual misuse.
#[derive(Debug, Clone)]
pub struct PlaceholderVerifier {
    policy: ClaimPolicy,
}

impl PlaceholderVerifier {
    pub fn new(policy: ClaimPolicy) -> Self {
        Self { policy }
    }
}

impl TokenVerifier for PlaceholderVerifier {
    fn verify(&self, header: Option<&str>, now: SystemTime) -> Result<DeviceIdentity, AttestationError> {
        let header = header
            .filter(|h| !h.trim().is_empty())
            .ok_or(AttestationError::Missing)?;
        let claims = RawClaims::decode(header)?;
        self.policy.check(claims, now)
    }

    fn kind(&self) -> &'static str {
        "placeholder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::AttestationToken;
    use std::time::{Duration, UNIX_EPOCH};

    const NOW: u64 = 1_700_000_000;

    fn verifier() -> PlaceholderVerifier {
        PlaceholderVerifier::new(ClaimPolicy {
            bundle_id: "com.example.cards".into(),
            issuer: "TEAM123".into(),
            max_age_secs: 300.0,
            max_future_skew_secs: 60.0,
        })
    }

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(NOW)
    }

    fn token(bundle: &str, issuer: &str, age: f64) -> String {
        AttestationToken {
            device_id: "A1B2C3D4-E5F6".into(),
            bundle_id: bundle.into(),
            issuer: issuer.into(),
            timestamp: NOW as f64 - age,
        }
        .encode()
    }

    #[test]
    fn test_accepts_fresh_token() {
        let identity = verifier()
            .verify(Some(&token("com.example.cards", "TEAM123", 5.0)), now())
            .unwrap();
        assert_eq!(identity.device_id, "A1B2C3D4-E5F6");
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(verifier().verify(None, now()).unwrap_err(), AttestationError::Missing);
        assert_eq!(verifier().verify(Some("  "), now()).unwrap_err(), AttestationError::Missing);
    }

    #[test]
    fn test_mismatch_rejected_regardless_of_freshness() {
        for age in [0.0, 100.0, 300.0, -60.0, 1000.0] {
            let err = verifier()
                .verify(Some(&token("com.evil.app", "TEAM123", age)), now())
                .unwrap_err();
            assert_eq!(err, AttestationError::BundleMismatch);

            let err = verifier()
                .verify(Some(&token("com.example.cards", "OTHER", age)), now())
                .unwrap_err();
            assert_eq!(err, AttestationError::IssuerMismatch);
        }
    }

    #[test]
    fn test_age_boundaries_are_inclusive() {
        let v = verifier();
        assert!(v.verify(Some(&token("com.example.cards", "TEAM123", 300.0)), now()).is_ok());
        assert!(v.verify(Some(&token("com.example.cards", "TEAM123", -60.0)), now()).is_ok());

        assert!(matches!(
            v.verify(Some(&token("com.example.cards", "TEAM123", 300.5)), now()),
            Err(AttestationError::Stale { .. })
        ));
        assert!(matches!(
            v.verify(Some(&token("com.example.cards", "TEAM123", -60.5)), now()),
            Err(AttestationError::Stale { .. })
        ));
    }
}
