//! Rate-limit counter stores.
//!
//! A store owns the per-identifier window counters. The limiter never keeps
//! counters itself, so stores can be swapped (durable vs. in-process) or reset
//! in tests without touching request handling.

pub mod memory;
pub mod upstash;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use upstash::UpstashStore;

/// Errors surfaced by a counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached or answered with a transport error.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store answered but the reply made no sense.
    #[error("unexpected store reply: {0}")]
    Protocol(String),
}

/// Snapshot of one identifier's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Requests counted in the current window.
    pub count: u32,
    /// Time until the window resets.
    pub resets_in: Duration,
}

/// Outcome of a single atomic check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub admitted: bool,
    pub state: WindowState,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Current window for `key`, if one is live.
    async fn get(&self, key: &str) -> Result<Option<WindowState>, StoreError>;

    /// Atomically count one request against `key`.
    ///
    /// Opens a fresh window of length `window` when none is live. Admits iff
    /// the window had fewer than `limit` admitted requests.
    async fn increment(&self, key: &str, limit: u32, window: Duration) -> Result<Hit, StoreError>;

    /// Drop the window for `key`.
    async fn expire(&self, key: &str) -> Result<(), StoreError>;

    fn kind(&self) -> &'static str;
}
