//! Durable counters on Upstash Redis (REST API).
//!
//! Each check is one `MULTI/EXEC` round trip:
//! `INCR key` → `PEXPIRE key <window> NX` → `PTTL key`.
//! Redis serializes the transaction, so the post-increment count is exact
//! across every gateway instance. A request is admitted iff that count is
//! `<= limit`; rejected requests still bump the counter, which only matters
//! for the advisory `remaining` value.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{Hit, RateLimitStore, StoreError, WindowState};

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

pub struct UpstashStore {
    client: Client,
    base_url: String,
    token: String,
    prefix: String,
}

impl UpstashStore {
    pub fn new(client: Client, base_url: &str, token: &str, prefix: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, identifier: &str) -> String {
        if self.prefix.is_empty() {
            identifier.to_string()
        } else {
            format!("{}:{}", self.prefix, identifier)
        }
    }

    async fn send(&self, endpoint: &str, commands: Vec<Vec<String>>) -> Result<Vec<Value>, StoreError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(&self.token)
            .json(&commands)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!("HTTP {}", status.as_u16())));
        }

        let replies: Vec<Reply> = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;
        if replies.len() != commands.len() {
            return Err(StoreError::Protocol(format!(
                "expected {} replies, got {}",
                commands.len(),
                replies.len()
            )));
        }

        replies
            .into_iter()
            .map(|reply| match reply.error {
                Some(err) => Err(StoreError::Protocol(err)),
                None => Ok(reply.result),
            })
            .collect()
    }
}

/// Redis integers may come back as JSON numbers or strings.
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn ttl(value: &Value, fallback: Duration) -> Result<Duration, StoreError> {
    let ms = as_i64(value).ok_or_else(|| StoreError::Protocol(format!("bad PTTL reply: {}", value)))?;
    // -1: key without expiry, -2: key gone. Both mean "a full window".
    Ok(if ms >= 0 {
        Duration::from_millis(ms as u64)
    } else {
        fallback
    })
}

#[async_trait]
impl RateLimitStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<WindowState>, StoreError> {
        let key = self.key(key);
        let replies = self
            .send(
                "pipeline",
                vec![vec!["GET".into(), key.clone()], vec!["PTTL".into(), key]],
            )
            .await?;

        if replies[0].is_null() {
            return Ok(None);
        }
        let count = as_i64(&replies[0])
            .ok_or_else(|| StoreError::Protocol(format!("bad GET reply: {}", replies[0])))?;
        Ok(Some(WindowState {
            count: u32::try_from(count.max(0)).unwrap_or(u32::MAX),
            resets_in: ttl(&replies[1], Duration::ZERO)?,
        }))
    }

    async fn increment(&self, key: &str, limit: u32, window: Duration) -> Result<Hit, StoreError> {
        let key = self.key(key);
        let window_ms = window.as_millis().to_string();
        let replies = self
            .send(
                "multi-exec",
                vec![
                    vec!["INCR".into(), key.clone()],
                    vec!["PEXPIRE".into(), key.clone(), window_ms, "NX".into()],
                    vec!["PTTL".into(), key],
                ],
            )
            .await?;

        let count = as_i64(&replies[0])
            .ok_or_else(|| StoreError::Protocol(format!("bad INCR reply: {}", replies[0])))?;
        let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);

        Ok(Hit {
            admitted: count <= limit,
            state: WindowState {
                count: count.min(limit),
                resets_in: ttl(&replies[2], window)?,
            },
        })
    }

    async fn expire(&self, key: &str) -> Result<(), StoreError> {
        self.send("pipeline", vec![vec!["DEL".into(), self.key(key)]])
            .await
            .map(|_| ())
    }

    fn kind(&self) -> &'static str {
        "upstash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_replies() {
        assert_eq!(as_i64(&json!(7)), Some(7));
        assert_eq!(as_i64(&json!("12")), Some(12));
        assert_eq!(as_i64(&json!(null)), None);
    }

    #[test]
    fn test_ttl_fallback() {
        let window = Duration::from_secs(60);
        assert_eq!(ttl(&json!(1500), window).unwrap(), Duration::from_millis(1500));
        assert_eq!(ttl(&json!(-1), window).unwrap(), window);
        assert!(ttl(&json!("nope"), window).is_err());
    }

    #[test]
    fn test_key_prefix() {
        let store = UpstashStore::new(Client::new(), "https://x.upstash.io/", "t", "ratelimit");
        assert_eq!(store.key("parse:dev:1.2.3.4"), "ratelimit:parse:dev:1.2.3.4");
        assert_eq!(store.base_url, "https://x.upstash.io");
    }
}
