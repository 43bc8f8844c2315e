//! In-memory result cache with per-entry expiry.
//!
//! Expiry is lazy: an expired entry is dropped by the `get` that finds it.
//! `purge_expired` (optionally driven by a background sweeper) reclaims the
//! memory of entries nobody asks for again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::analysis::AnalysisResult;

/// Bumped whenever the shape of `AnalysisResult` or the pipeline semantics change.
pub const CACHE_KEY_VERSION: &str = "v2";

/// Builds the cache key for a normalized job title and requested offer count.
pub fn cache_key(normalized_title: &str, offer_count: usize) -> String {
    format!("{CACHE_KEY_VERSION}:{normalized_title}@{offer_count}")
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: AnalysisResult,
    created_at: Instant,
    ttl: Duration,
    stored_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.created_at + self.ttl
    }
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock is never held across an await; a poisoned map is still structurally sound.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let mut entries = self.entries();
        let now = Instant::now();

        let expired = entries.get(key)?.is_expired(now);
        if expired {
            entries.remove(key);
            debug!(key, "cache entry expired");
            return None;
        }

        entries.get(key).map(|entry| {
            debug!(key, stored_at = %entry.stored_at, "cache entry found");
            entry.value.clone()
        })
    }

    pub fn put(&self, key: impl Into<String>, value: AnalysisResult, ttl: Duration) {
        let entry = CacheEntry {
            value,
            created_at: Instant::now(),
            ttl,
            stored_at: Utc::now(),
        };
        self.entries().insert(key.into(), entry);
    }

    pub fn flush_all(&self) {
        let mut entries = self.entries();
        let flushed = entries.len();
        entries.clear();
        info!(flushed, "result cache flushed");
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Spawns a task that purges expired entries every `every`.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = self.purge_expired();
                if purged > 0 {
                    debug!(purged, "swept expired cache entries");
                }
            }
        })
    }
}
