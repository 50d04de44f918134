//! Redis connection management and the Redis-backed store
//!
//! [`RedisStore`] implements [`CacheStore`] over a multiplexed async
//! connection. The connection is cheap to clone and safe to share: every
//! cached operation and invalidation in the process can use the same store.

use crate::cache::{
    store::CacheStore,
    types::{CacheKey, CacheValue},
};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::{
    aio::MultiplexedConnection, AsyncCommands, Client, ConnectionAddr, ConnectionInfo,
    IntoConnectionInfo, RedisConnectionInfo,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for the Redis server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisSettings {
    /// Full connection URL; overrides host, port, db and password when set
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Logical database index
    pub db: i64,
    pub password: Option<String>,
    /// Wrap each write in MULTI/EXEC so value and expiry land together
    pub transactional: bool,
    /// COUNT hint passed to SCAN during invalidation
    pub scan_count: usize,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            transactional: false,
            scan_count: 100,
        }
    }
}

impl RedisSettings {
    /// Load settings from the environment (and `.env` if present)
    ///
    /// Reads `REDIS__URL`, `REDIS__HOST`, `REDIS__PORT`, `REDIS__DB`,
    /// `REDIS__PASSWORD`, `REDIS__TRANSACTIONAL` and `REDIS__SCAN_COUNT`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        Ok(Self {
            url: std::env::var("REDIS__URL").ok(),
            host: std::env::var("REDIS__HOST").unwrap_or(defaults.host),
            port: parse_env("REDIS__PORT")?.unwrap_or(defaults.port),
            db: parse_env("REDIS__DB")?.unwrap_or(defaults.db),
            password: std::env::var("REDIS__PASSWORD").ok(),
            transactional: parse_env("REDIS__TRANSACTIONAL")?.unwrap_or(defaults.transactional),
            scan_count: parse_env("REDIS__SCAN_COUNT")?.unwrap_or(defaults.scan_count),
        })
    }

    /// Connection parameters derived from the settings
    ///
    /// The password travels as its own field, so it needs no URL escaping.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        if let Some(url) = &self.url {
            return url
                .as_str()
                .into_connection_info()
                .map_err(|e| CacheError::ConfigError(format!("invalid REDIS__URL: {}", e)));
        }

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..Default::default()
            },
        })
    }

    /// Server address and database for log output, without credentials
    pub fn target(&self) -> Result<String> {
        let info = self.connection_info()?;
        Ok(format!("{} (db: {})", info.addr, info.redis.db))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_none() && self.host.is_empty() {
            return Err(CacheError::ConfigError("redis host must not be empty".to_string()));
        }

        if self.scan_count == 0 {
            return Err(CacheError::ConfigError(
                "scan_count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::ConfigError(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Redis-backed cache store
pub struct RedisStore {
    conn: MultiplexedConnection,
    settings: RedisSettings,
}

impl RedisStore {
    /// Connect using the given settings
    pub async fn connect(settings: RedisSettings) -> Result<Self> {
        settings.validate()?;

        let info = settings.connection_info()?;
        info!("Connecting to Redis at {} (db: {})", info.addr, info.redis.db);

        let client = Client::open(info)
            .map_err(|e| CacheError::ConfigError(format!("Redis client error: {}", e)))?;
        let conn = client.get_multiplexed_async_connection().await?;

        info!("Successfully connected to Redis");
        Ok(Self { conn, settings })
    }

    /// Connect using settings from the environment
    pub async fn from_env() -> Result<Self> {
        Self::connect(RedisSettings::from_env()?).await
    }

    /// Create from an existing connection
    pub fn from_connection(conn: MultiplexedConnection, settings: RedisSettings) -> Self {
        Self { conn, settings }
    }

    pub fn settings(&self) -> &RedisSettings {
        &self.settings
    }

    /// Round trip a PING to the server
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis health check reply: {}", reply);
        Ok(reply == "PONG")
    }
}

/// EXPIRE takes whole seconds; anything shorter rounds up to one
fn expire_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs.max(1)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        if self.settings.transactional {
            pipe.atomic();
        }
        pipe.cmd("SET").arg(key).arg(value).ignore();
        if let Some(ttl) = ttl {
            pipe.cmd("EXPIRE").arg(key).arg(expire_seconds(ttl)).ignore();
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<CacheKey>> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.settings.scan_count)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();

        debug!("Scan {} matched {} keys", pattern, keys.len());
        Ok(keys)
    }

    async fn delete(&self, keys: &[CacheKey]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }

        let deleted: u64 = cmd.query_async(&mut conn).await?;
        Ok(deleted)
    }
}
