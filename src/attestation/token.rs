//! Attestation token wire format.
//!
//! A token is standard base64 (padding optional) over a JSON object:
//! `{"deviceId": "...", "bundleId": "...", "iss": "...", "timestamp": 1700000000.25}`.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::AttestationError;

/// Base64 engine tolerant of missing or present padding.
pub const TOKEN_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims as they arrive; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClaims {
    pub device_id: Option<String>,
    pub bundle_id: Option<String>,
    pub iss: Option<String>,
    pub timestamp: Option<f64>,
}

/// A token with all required fields present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationToken {
    pub device_id: String,
    pub bundle_id: String,
    #[serde(rename = "iss")]
    pub issuer: String,
    pub timestamp: f64,
}

impl RawClaims {
    /// Decode the JSON payload bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, AttestationError> {
        serde_json::from_slice(bytes).map_err(|_| AttestationError::Malformed)
    }

    /// Decode a complete header value (base64 of JSON).
    pub fn decode(header: &str) -> Result<Self, AttestationError> {
        let bytes = decode_b64(header)?;
        Self::from_json(&bytes)
    }

    pub fn into_token(self) -> Result<AttestationToken, AttestationError> {
        fn required(value: Option<String>, name: &'static str) -> Result<String, AttestationError> {
            value
                .filter(|v| !v.is_empty())
                .ok_or(AttestationError::MissingField(name))
        }

        let device_id = required(self.device_id, "deviceId")?;
        let bundle_id = required(self.bundle_id, "bundleId")?;
        let issuer = required(self.iss, "iss")?;
        let timestamp = self
            .timestamp
            .filter(|t| t.is_finite() && *t > 0.0)
            .ok_or(AttestationError::MissingField("timestamp"))?;

        Ok(AttestationToken {
            device_id,
            bundle_id,
            issuer,
            timestamp,
        })
    }
}

impl AttestationToken {
    /// Encode the way the mobile client does (unsigned).
    pub fn encode(&self) -> String {
        // Serializing a plain struct of strings and a float cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        TOKEN_B64.encode(json)
    }
}

pub(crate) fn decode_b64(value: &str) -> Result<Vec<u8>, AttestationError> {
    TOKEN_B64
        .decode(value.trim())
        .map_err(|_| AttestationError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_roundtrip_with_and_without_padding() {
        let token = AttestationToken {
            device_id: "device-1".into(),
            bundle_id: "b".into(),
            issuer: "i".into(),
            timestamp: 1_700_000_000.5,
        };
        let encoded = token.encode();
        let decoded = RawClaims::decode(&encoded).unwrap().into_token().unwrap();
        assert_eq!(decoded, token);

        let unpadded = encoded.trim_end_matches('=');
        assert!(RawClaims::decode(unpadded).is_ok());
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(RawClaims::decode("%%%not-base64").unwrap_err(), AttestationError::Malformed);

        let not_json = TOKEN_B64.encode(b"hello");
        assert_eq!(RawClaims::decode(&not_json).unwrap_err(), AttestationError::Malformed);

        let wrong_type = TOKEN_B64.encode(br#"{"deviceId": 42}"#);
        assert_eq!(RawClaims::decode(&wrong_type).unwrap_err(), AttestationError::Malformed);
    }

    #[test]
    fn test_missing_and_empty_fields() {
        let claims = RawClaims::from_json(br#"{"deviceId":"d","bundleId":"b","iss":"i"}"#).unwrap();
        assert_eq!(claims.into_token().unwrap_err(), AttestationError::MissingField("timestamp"));

        let claims =
            RawClaims::from_json(br#"{"deviceId":"","bundleId":"b","iss":"i","timestamp":1}"#).unwrap();
        assert_eq!(claims.into_token().unwrap_err(), AttestationError::MissingField("deviceId"));
    }
}
