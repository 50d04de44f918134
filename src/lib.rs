//! # query-cache
//!
//! Result caching for expensive, side-effect-free async reads (typically
//! database queries), backed by Redis.
//!
//! ## Features
//!
//! - Deterministic keys built from operation identity and call arguments
//! - Keyword-order independent argument fragments
//! - Key builders that fill in declared parameter defaults and skip irrelevant arguments
//! - Cache-aside wrapper with configurable TTL, namespace, store and serializer
//! - Binary (CBOR) and JSON (`serde_json`) payload encodings
//! - Prefix-pattern invalidation of a whole operation or a leading argument subset
//! - Redis store over a shared multiplexed connection, plus an in-process store
//!
//! ## Caching a query
//!
//! ```no_run
//! use query_cache::{operation_id, Cached, CacheError, RedisStore, HOUR};
//! use std::sync::Arc;
//!
//! async fn load_user(id: u64) -> Result<Option<String>, CacheError> {
//!     // query the database here
//!     Ok(Some(format!("user-{}", id)))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(RedisStore::from_env().await?);
//!
//!     let cached = Cached::builder().ttl(HOUR).store(store).build()?;
//!     let get_user = cached.wrap(operation_id!(load_user), load_user);
//!
//!     let user = get_user.call(42u64).await?;
//!     println!("User: {:?}", user);
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidating after a write
//!
//! ```no_run
//! use query_cache::{invalidate, operation_id, CallArgs, RedisStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RedisStore::from_env().await?;
//!
//!     // Every cached `load_user` result for user 42
//!     invalidate(&store, &operation_id!(load_user), &CallArgs::new().arg(42), "main").await?;
//!
//!     // Every cached `load_user` result
//!     invalidate(&store, &operation_id!(load_user), &CallArgs::new(), "main").await?;
//!     Ok(())
//! }
//! ```
//!
//! Both examples build the identity with `operation_id!` from the same module,
//! so they address the same keys.

pub mod cache;
pub mod connection;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    build_key, build_key_with_defaults, default_store, invalidate, invalidation_pattern,
    set_default_store, start_auto_cleanup, ArgValue, BinarySerializer, CacheConfig,
    CacheConfigBuilder, CacheKey, CacheStats, CacheStore, Cached, CachedBuilder, CachedOperation,
    CallArgs, JsonSerializer, KeyBuilder, MemoryStore, OperationId, Serializer, Signature,
    ToCallArgs, DAY, DEFAULT_TTL, HOUR, MINUTE,
};
pub use connection::{RedisSettings, RedisStore};
pub use error::{CacheError, Result};
