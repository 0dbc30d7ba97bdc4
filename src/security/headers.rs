//! Header handling: client address extraction and security response headers.
//!
//! # Design Decisions
//! - Forwarded addresses are only used to key rate limits, never to grant
//!   access
//! - Responses may carry personal data, so caching and MIME sniffing are
//!   disabled on every response

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Best-effort caller address.
///
/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the TCP peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get(X_REAL_IP)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// `Cache-Control: no-store, private`.
pub fn no_store_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, private"),
    )
}

/// `X-Content-Type-Options: nosniff`.
pub fn nosniff_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(X_REAL_IP, HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_ip(&headers, None), "203.0.113.7");
    }

    #[test]
    fn test_fallback_chain() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REAL_IP, HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_ip(&headers, None), "198.51.100.1");

        let peer: SocketAddr = "192.0.2.4:5555".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.4");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }
}
