//! Cache entry with optional expiry, as held by the in-process store

use crate::cache::types::{CacheKey, CacheValue};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A stored payload and its expiry
///
/// Entries are never modified in place: a write replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// The serialized payload
    pub value: CacheValue,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// When the entry expires; `None` for entries without TTL
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` after now, or never
    pub fn new(key: CacheKey, value: CacheValue, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        // An unrepresentable TTL is far enough in the future to mean "never"
        let expires_at = ttl.and_then(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
        });

        Self {
            key,
            value,
            created_at: now,
            expires_at,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Utc::now() >= at)
    }

    /// Get time until expiration; `None` if expired or never expiring
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let expires_at = self.expires_at?;
        (expires_at - Utc::now()).to_std().ok()
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Approximate memory footprint in bytes
    pub fn size_bytes(&self) -> usize {
        self.key.len() + self.value.len()
    }
}
