//! Store adapter boundary and the in-process store
//!
//! [`CacheStore`] is the only interface the memoizing wrapper and the
//! invalidator talk to. Production deployments use
//! [`RedisStore`](crate::connection::RedisStore); [`MemoryStore`] serves tests
//! and single-process setups.

use crate::cache::{
    entry::CacheEntry,
    types::{CacheKey, CacheStats, CacheValue},
};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Key-value store with expiry, pattern scan and multi-delete
///
/// Each single call must be atomic with respect to other calls on the same
/// key. Nothing stronger is assumed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a payload; `Ok(None)` on a miss
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Write a payload, replacing any previous one; `None` keeps it until deleted
    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> Result<()>;

    /// List keys matching a glob pattern (`*` matches any run of characters)
    async fn scan(&self, pattern: &str) -> Result<Vec<CacheKey>>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[CacheKey]) -> Result<u64>;
}

static DEFAULT_STORE: OnceLock<Arc<dyn CacheStore>> = OnceLock::new();

/// Install the process-wide store used by builders without an explicit store
///
/// Can be called once; later calls fail with [`CacheError::ConfigError`].
pub fn set_default_store(store: Arc<dyn CacheStore>) -> Result<()> {
    DEFAULT_STORE
        .set(store)
        .map_err(|_| CacheError::ConfigError("default cache store is already set".to_string()))?;
    info!("Installed process-wide default cache store");
    Ok(())
}

/// The process-wide store, if one was installed
pub fn default_store() -> Option<Arc<dyn CacheStore>> {
    DEFAULT_STORE.get().cloned()
}

/// Match `key` against a Redis-style glob
///
/// Supports `*`, `?` and backslash escapes, which is everything the
/// invalidator emits.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    // Position after the last `*` and the key index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, k));
                p += 1;
                continue;
            }
            Some('?') => {
                p += 1;
                k += 1;
                continue;
            }
            Some('\\') if p + 1 < pattern.len() => {
                if pattern[p + 1] == key[k] {
                    p += 2;
                    k += 1;
                    continue;
                }
            }
            Some(c) if *c == key[k] => {
                p += 1;
                k += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star_p, star_k)) => {
                backtrack = Some((star_p, star_k + 1));
                p = star_p;
                k = star_k + 1;
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// In-process store with lazy TTL expiry
///
/// Cloning yields another handle to the same entries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<CacheKey, CacheEntry>,
    stats: CacheStats,
}

impl MemoryState {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.stats.entries = self.entries.len();
        self.stats.size_bytes = self.stats.size_bytes.saturating_sub(entry.size_bytes());
        Some(entry)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.state.read().await.stats.clone()
    }

    /// Number of stored entries, including expired ones not yet cleaned up
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Check if a live entry exists (without touching statistics)
    pub async fn contains_key(&self, key: &str) -> bool {
        let state = self.state.read().await;
        state.entries.get(key).map_or(false, |e| !e.is_expired())
    }

    /// Remaining TTL of a live entry; `None` if absent or without expiry
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let state = self.state.read().await;
        state.entries.get(key)?.time_until_expiration()
    }

    /// Clear all entries from the store
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        let count = state.entries.len();
        state.entries.clear();
        state.stats.entries = 0;
        state.stats.size_bytes = 0;
        info!("Cleared {} entries from memory store", count);
    }

    /// Remove all expired entries, returning their keys
    pub async fn cleanup_expired(&self) -> Vec<CacheKey> {
        let mut state = self.state.write().await;

        let expired: Vec<CacheKey> = state
            .entries
            .values()
            .filter(|e| e.is_expired())
            .map(|e| e.key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        state.stats.evictions_ttl += expired.len() as u64;

        if !expired.is_empty() {
            debug!("Cleaned up {} expired entries", expired.len());
        }
        expired
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut state = self.state.write().await;

        let expired = match state.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                state.stats.hits += 1;
                return Ok(Some(value));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            state.remove(key);
            state.stats.evictions_ttl += 1;
        }
        state.stats.misses += 1;
        Ok(None)
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry::new(key.to_string(), value, ttl);
        let size = entry.size_bytes();

        let mut state = self.state.write().await;
        state.remove(key);
        state.entries.insert(key.to_string(), entry);
        state.stats.writes += 1;
        state.stats.entries = state.entries.len();
        state.stats.size_bytes += size;
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<CacheKey>> {
        let state = self.state.read().await;

        let mut keys: Vec<CacheKey> = state
            .entries
            .values()
            .filter(|e| !e.is_expired() && glob_match(pattern, &e.key))
            .map(|e| e.key.clone())
            .collect();
        keys.sort();

        debug!("Scan {} matched {} keys", pattern, keys.len());
        Ok(keys)
    }

    async fn delete(&self, keys: &[CacheKey]) -> Result<u64> {
        let mut state = self.state.write().await;

        let mut removed = 0;
        for key in keys {
            if let Some(entry) = state.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        state.stats.deletions += removed;
        Ok(removed)
    }
}

/// Background task that periodically drops expired entries from a memory store
pub async fn start_auto_cleanup(store: MemoryStore, interval: Duration) {
    info!("Starting memory store cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;
        store.cleanup_expired().await;
    }
}
