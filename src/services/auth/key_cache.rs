//! Cached view of the issuer's signing keys.
//!
//! # Lifecycle
//!
//! ```text
//! new()  → cold (no key set)
//! get_key(kid)
//!   → fresh set has kid?           → key
//!   → cold / older than ttl?       → refresh, then look up once
//!   → miss on a fresh set?         → refresh (unless refreshed < min_refresh_interval ago),
//!                                    then look up once → KeyNotFound
//! ```
//!
//! # Concurrency
//!
//! The published set lives in an [`ArcSwapOption`], so lookups never take a lock. Refreshes
//! are serialized by an async mutex and tagged with a generation number: a caller that
//! queued behind an in-flight refresh sees the generation move and reuses that outcome
//! instead of fetching again. N concurrent misses therefore cost one fetch.
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::services::auth::{
    error::AuthError,
    key_set::{KeySet, SigningKey},
    key_source::{KeySource, KeySourceError},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastRefresh {
    Never,
    Published,
    Failed,
}

/// Builder for [`KeySetCache`].
pub struct KeySetCacheBuilder {
    source: Arc<dyn KeySource>,
    ttl: Duration,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
}

impl KeySetCacheBuilder {
    /// How long a fetched key set is trusted before it is fetched again.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Upper bound for one key-document fetch.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Minimum age of the current set before an unknown `kid` may trigger a refetch.
    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn build(self) -> KeySetCache {
        KeySetCache {
            source: self.source,
            current: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(LastRefresh::Never),
            generation: AtomicU64::new(0),
            ttl: self.ttl,
            fetch_timeout: self.fetch_timeout,
            min_refresh_interval: self.min_refresh_interval,
        }
    }
}

pub struct KeySetCache {
    source: Arc<dyn KeySource>,
    current: ArcSwapOption<KeySet>,
    // Holds the outcome of the most recent fetch attempt.
    refresh_lock: Mutex<LastRefresh>,
    // Bumped once per completed fetch attempt, success or failure.
    generation: AtomicU64,
    ttl: Duration,
    fetch_timeout: Duration,
    min_refresh_interval: Duration,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

impl KeySetCache {
    pub fn builder(source: Arc<dyn KeySource>) -> KeySetCacheBuilder {
        KeySetCacheBuilder {
            source,
            ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refresh_interval: Duration::ZERO,
        }
    }

    /// Resolve a key id, refreshing at most once.
    pub async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, AuthError> {
        let seen = self.generation.load(Ordering::Acquire);

        if let Some(set) = self.current.load_full()
            && set.fetched_at().elapsed() < self.ttl
        {
            if let Some(key) = set.get(kid) {
                return Ok(key);
            }

            if set.fetched_at().elapsed() < self.min_refresh_interval {
                debug!(kid, "unknown kid, key set refreshed too recently to refetch");
                return Err(AuthError::KeyNotFound);
            }

            debug!(kid, "unknown kid, refreshing key set");
        }

        let set = self.refresh_after(seen).await?;
        set.get(kid).ok_or_else(|| {
            warn!(kid, "kid not present in refreshed key set");
            AuthError::KeyNotFound
        })
    }

    /// Fetch the key document now and publish it. Joins a refresh already in flight.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, AuthError> {
        let seen = self.generation.load(Ordering::Acquire);
        self.refresh_after(seen).await
    }

    /// Currently published set, if any, without triggering a fetch.
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current.load_full()
    }

    async fn refresh_after(&self, seen: u64) -> Result<Arc<KeySet>, AuthError> {
        let mut last = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            // Someone fetched while we were queued; share their outcome.
            return match (*last, self.current.load_full()) {
                (LastRefresh::Published, Some(set)) => Ok(set),
                _ => Err(AuthError::KeySourceUnavailable),
            };
        }

        let outcome = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(KeySourceError::Timeout(self.fetch_timeout)),
        };

        let result = match outcome {
            Ok(set) => {
                let set = Arc::new(set);
                self.current.store(Some(Arc::clone(&set)));
                *last = LastRefresh::Published;
                info!(keys = set.len(), "signing key set refreshed");
                Ok(set)
            }
            Err(error) => {
                *last = LastRefresh::Failed;
                warn!(error = %error, "failed to refresh signing key set");
                Err(AuthError::KeySourceUnavailable)
            }
        };

        self.generation.fetch_add(1, Ordering::Release);
        result
    }
}
