//! In-process fixed-window counters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::{Hit, RateLimitStore, StoreError, WindowState};

#[derive(Debug, Clone, Copy)]
struct Record {
    count: u32,
    reset_at: Instant,
}

/// Counters held in a concurrent map.
///
/// Each check holds the key's entry lock for the whole read/compare/write,
/// so concurrent requests for one identifier cannot over-admit. Expired
/// records stay until the identifier is seen again or [`sweep`](Self::sweep)
/// runs; memory grows with distinct identifiers otherwise.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked identifiers, expired or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record whose window has ended. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, record| record.reset_at > now);
        before.saturating_sub(self.records.len())
    }

    /// Sweep periodically until shutdown.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = self.len(), "Swept expired rate-limit records");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<WindowState>, StoreError> {
        let now = Instant::now();
        Ok(self.records.get(key).and_then(|record| {
            (now < record.reset_at).then(|| WindowState {
                count: record.count,
                resets_in: record.reset_at - now,
            })
        }))
    }

    async fn increment(&self, key: &str, limit: u32, window: Duration) -> Result<Hit, StoreError> {
        let now = Instant::now();
        let mut record = self
            .records
            .entry(key.to_string())
            .or_insert(Record { count: 0, reset_at: now });

        let admitted = if now >= record.reset_at {
            record.count = 1;
            record.reset_at = now + window;
            true
        } else if record.count < limit {
            record.count += 1;
            true
        } else {
            false
        };

        Ok(Hit {
            admitted,
            state: WindowState {
                count: record.count,
                resets_in: record.reset_at.saturating_duration_since(now),
            },
        })
    }

    async fn expire(&self, key: &str) -> Result<(), StoreError> {
        self.records.remove(key);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
