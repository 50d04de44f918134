//! Configuration for cached operations

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const MINUTE: Duration = Duration::from_secs(60);
pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// TTL applied when none is configured
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Namespace applied when none is configured
pub const DEFAULT_NAMESPACE: &str = "main";

/// Configuration shared by the operations a [`Cached`](crate::cache::Cached) wraps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of written entries
    /// `None` keeps entries until they are invalidated
    pub ttl: Option<Duration>,

    /// Top-level key prefix
    pub namespace: String,

    /// TTL jitter factor (0.0 - 1.0)
    /// Spreads the expiry of entries written together
    pub ttl_jitter: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Some(DEFAULT_TTL),
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl_jitter: 0.0,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from the environment (and `.env` if present)
    ///
    /// Reads `CACHE__TTL_SECS` (0 disables expiry) and `CACHE__NAMESPACE`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(raw) = std::env::var("CACHE__TTL_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                CacheError::ConfigError(format!("CACHE__TTL_SECS is not a number: {}", raw))
            })?;
            config.ttl = normalize_ttl(Duration::from_secs(secs));
        }

        if let Ok(namespace) = std::env::var("CACHE__NAMESPACE") {
            config.namespace = namespace;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(CacheError::ConfigError(
                "namespace must not be empty".to_string(),
            ));
        }

        if self.namespace.contains(':') {
            return Err(CacheError::ConfigError(format!(
                "namespace must not contain ':' (got {:?})",
                self.namespace
            )));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// TTL for the next write, with jitter applied
    pub fn ttl_with_jitter(&self) -> Option<Duration> {
        let ttl = self.ttl?;
        if self.ttl_jitter == 0.0 {
            return Some(ttl);
        }

        let base_secs = ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        // Out of range past Duration::MAX
        Some(Duration::try_from_secs_f64(final_secs).unwrap_or(ttl))
    }
}

/// A zero TTL means "never expire"
fn normalize_ttl(ttl: Duration) -> Option<Duration> {
    if ttl.is_zero() {
        None
    } else {
        Some(ttl)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl: Option<Option<Duration>>,
    namespace: Option<String>,
    ttl_jitter: Option<f64>,
}

impl CacheConfigBuilder {
    /// Set the TTL of written entries; zero disables expiry
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(normalize_ttl(ttl));
        self
    }

    /// Keep entries until they are invalidated
    pub fn no_expiry(mut self) -> Self {
        self.ttl = Some(None);
        self
    }

    /// Set the key namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        let config = CacheConfig {
            ttl: self.ttl.unwrap_or(defaults.ttl),
            namespace: self.namespace.unwrap_or(defaults.namespace),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
        };

        if config.ttl_jitter > 0.0 && config.ttl.is_none() {
            warn!("ttl_jitter has no effect on a cache without expiry");
        }

        config
    }
}

impl From<CacheConfig> for CacheConfigBuilder {
    fn from(config: CacheConfig) -> Self {
        Self {
            ttl: Some(config.ttl),
            namespace: Some(config.namespace),
            ttl_jitter: Some(config.ttl_jitter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.namespace, "main");
        assert_eq!(config.ttl_jitter, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ttl_constants() {
        assert_eq!(MINUTE.as_secs(), 60);
        assert_eq!(HOUR.as_secs(), 3600);
        assert_eq!(DAY.as_secs(), 86_400);
        assert_eq!(DEFAULT_TTL, 5 * MINUTE);
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .ttl(DAY)
            .namespace("users")
            .ttl_jitter(0.1)
            .build();

        assert_eq!(config.ttl, Some(DAY));
        assert_eq!(config.namespace, "users");
        assert_eq!(config.ttl_jitter, 0.1);
    }

    #[test]
    fn test_builder_from_config_keeps_values() {
        let base = CacheConfig::builder().no_expiry().namespace("users").build();

        let config = CacheConfigBuilder::from(base.clone()).build();
        assert_eq!(config, base);

        let config = CacheConfigBuilder::from(base).ttl(MINUTE).build();
        assert_eq!(config.ttl, Some(MINUTE));
        assert_eq!(config.namespace, "users");
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = CacheConfig::builder().ttl(Duration::ZERO).build();
        assert_eq!(config.ttl, None);
        assert_eq!(config.ttl_with_jitter(), None);

        let config = CacheConfig::builder().no_expiry().build();
        assert_eq!(config.ttl, None);
    }

    #[test]
    fn test_config_validation() {
        let mut invalid_config = CacheConfig::default();
        invalid_config.namespace = String::new();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = CacheConfig::default();
        invalid_config.namespace = "a:b".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = CacheConfig::default();
        invalid_config.ttl_jitter = 1.5;
        assert!(matches!(
            invalid_config.validate(),
            Err(CacheError::ConfigError(_))
        ));
    }

    #[test]
    fn test_ttl_without_jitter_is_exact() {
        let config = CacheConfig::builder().ttl(HOUR).build();
        assert_eq!(config.ttl_with_jitter(), Some(HOUR));
    }

    #[test]
    fn test_jitter_on_huge_ttl_does_not_overflow() {
        let config = CacheConfig {
            ttl: Some(Duration::MAX),
            ttl_jitter: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        for _ in 0..20 {
            assert!(config.ttl_with_jitter().is_some());
        }
    }

    #[test]
    fn test_ttl_with_jitter() {
        let config = CacheConfig {
            ttl: Some(Duration::from_secs(3600)),
            ttl_jitter: 0.1,
            ..Default::default()
        };

        for _ in 0..20 {
            let ttl = config.ttl_with_jitter().unwrap();
            assert!(ttl.as_secs_f64() >= 3600.0 - 360.0);
            assert!(ttl.as_secs_f64() <= 3600.0 + 360.0);
        }
    }
}
