//! # Result Caching Layer
//!
//! Cache-aside memoization of side-effect-free async reads, keyed by operation
//! identity and call arguments.
//!
//! ## Key layout
//!
//! ```text
//! {namespace}:{scope}:{name}:{positional…}:{name=value…}
//! ```
//!
//! Keyword pairs are sorted by name. A call without arguments ends in `::`.
//!
//! ## Components
//!
//! - [`key`]: argument fragments, including a builder that fills in declared defaults
//! - [`serializer`]: binary (CBOR) and JSON (`serde_json`) payload encodings
//! - [`store`]: the store adapter trait and an in-process implementation
//! - [`memoize`]: the wrapper that reads through and populates the store
//! - [`invalidation`]: prefix-pattern deletes for a whole operation or a leading argument subset
//!
//! ## Example
//!
//! ```rust
//! use query_cache::cache::{Cached, CallArgs, MemoryStore, OperationId};
//! use query_cache::CacheError;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cached = Cached::builder()
//!     .ttl(Duration::from_secs(60))
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//!
//! let get_user = cached.wrap(OperationId::new("users", "get_user"), |id: u64| async move {
//!     Ok::<_, CacheError>(format!("user-{}", id))
//! });
//!
//! let name: String = get_user.call(42u64).await?;
//! assert_eq!(name, "user-42");
//!
//! // After the user changes
//! get_user.invalidate(&CallArgs::new().arg(42)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod memoize;
pub mod serializer;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, DAY, DEFAULT_NAMESPACE, DEFAULT_TTL, HOUR, MINUTE};
pub use entry::CacheEntry;
pub use invalidation::{invalidate, invalidation_pattern};
pub use key::{
    build_key, build_key_with_defaults, BasicKeyBuilder, DefaultsKeyBuilder, DefaultsKeyFactory,
    KeyBuilder, Signature, EMPTY_FRAGMENT,
};
pub use memoize::{Cached, CachedBuilder, CachedOperation};
pub use serializer::{BinarySerializer, JsonSerializer, Serializer};
pub use store::{default_store, set_default_store, start_auto_cleanup, CacheStore, MemoryStore};
pub use types::{ArgValue, CacheKey, CacheStats, CacheValue, CallArgs, OperationId, ToCallArgs};
