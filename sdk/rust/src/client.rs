//! Client for the card-scanning gateway.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Header carrying the device attestation token.
pub const ATTEST_HEADER: &str = "x-attest-token";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestClaims {
    pub device_id: String,
    pub bundle_id: String,
    pub iss: String,
    pub timestamp: f64,
}

impl AttestClaims {
    /// Claims stamped with the current time.
    pub fn now(device_id: &str, bundle_id: &str, issuer: &str) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self {
            device_id: device_id.to_string(),
            bundle_id: bundle_id.to_string(),
            iss: issuer.to_string(),
            timestamp,
        }
    }

    /// Unsigned token as accepted by the placeholder verifier.
    pub fn to_token(&self) -> String {
        let payload = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(payload)
    }
}

/// Error body returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayError {
    pub error: String,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach an attestation token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Mint a fresh unsigned token for this device and attach it.
    pub fn attest(self, device_id: &str, bundle_id: &str, issuer: &str) -> Self {
        let token = AttestClaims::now(device_id, bundle_id, issuer).to_token();
        self.with_token(token)
    }

    /// POST a raw JSON body and hand back the untouched response.
    pub async fn post_raw(&self, path: &str, body: &serde_json::Value) -> Result<Response, reqwest::Error> {
        let mut request = self.client.post(format!("{}{}", self.base_url, path)).json(body);
        if let Some(token) = &self.token {
            request = request.header(ATTEST_HEADER, token);
        }
        request.send().await
    }

    pub async fn parse_raw(&self, text: &str) -> Result<Response, reqwest::Error> {
        self.post_raw("/api/parse", &json!({ "text": text })).await
    }

    pub async fn enrich_raw(
        &self,
        organization: &str,
        website: Option<&str>,
        raw_text: &str,
    ) -> Result<Response, reqwest::Error> {
        let body = json!({
            "organization": organization,
            "website": website,
            "rawText": raw_text,
        });
        self.post_raw("/api/enrich", &body).await
    }

    /// Parse card text, returning the contact JSON.
    pub async fn parse(&self, text: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        decode(self.parse_raw(text).await?).await
    }

    /// Enrich a company, returning the profile JSON.
    pub async fn enrich(
        &self,
        organization: &str,
        website: Option<&str>,
        raw_text: &str,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        decode(self.enrich_raw(organization, website, raw_text).await?).await
    }
}

async fn decode(resp: Response) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<GatewayError>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        return Err(format!("Gateway returned error status {}: {}", status, message).into());
    }

    Ok(serde_json::from_str(&text)?)
}
