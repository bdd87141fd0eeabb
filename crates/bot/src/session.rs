//! Per-chat session state with time-to-live eviction.
//!
//! Multi-step interactions (composing a broadcast) keep their progress here,
//! keyed by chat. Entries expire `ttl` after their last write; an expired
//! entry reads as absent even before the sweep task removes it.

use std::fmt;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Chat identity used as the session key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concurrent TTL store of session payloads.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct SessionStore<V> {
    cache: Cache<ChatId, V>,
}

impl<V> SessionStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store whose entries live for `ttl` after their last write.
    ///
    /// The store is unbounded: expiry and [`delete`](Self::delete) are the
    /// only ways an entry leaves it.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).build();
        Self { cache }
    }

    /// Store a payload, replacing any previous one and restarting its clock.
    pub async fn put(&self, chat: ChatId, value: V) {
        self.cache.insert(chat, value).await;
    }

    /// The live payload for a chat, if any.
    pub async fn get(&self, chat: ChatId) -> Option<V> {
        self.cache.get(&chat).await
    }

    /// Remove a chat's payload, returning it if it was still live.
    pub async fn delete(&self, chat: ChatId) -> Option<V> {
        self.cache.remove(&chat).await
    }

    /// Approximate number of stored entries.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict expired entries now.
    pub async fn sweep(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Spawn a task that sweeps expired entries every `period`.
    ///
    /// Abort the returned handle on shutdown.
    #[must_use]
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        info!(period_secs = period.as_secs(), "Spawning session sweep task");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.sweep().await;
                debug!(sessions = store.len(), "Swept expired sessions");
            }
        })
    }
}
