//! Cache-aside wrapper for async read operations
//!
//! [`Cached`] carries the configuration (TTL, namespace, store, key builder,
//! serializer); [`Cached::wrap`] applies it to one operation. Calling the
//! resulting [`CachedOperation`]:
//!
//! 1. builds `{namespace}:{operation}:{fragment}`,
//! 2. returns the decoded payload on a hit without running the operation,
//! 3. otherwise runs the operation; its error is returned unchanged and
//!    nothing is written,
//! 4. on success writes the encoded result with the configured TTL and
//!    returns it.
//!
//! Store failures fail the call, on the read as well as on the write after a
//! miss. In the latter case the freshly computed value is dropped. There is no
//! single-flight protection: concurrent misses each run the operation.

use crate::cache::{
    config::{CacheConfig, CacheConfigBuilder},
    invalidation,
    key::{BasicKeyBuilder, KeyBuilder},
    serializer::{BinarySerializer, Serializer},
    store::{default_store, CacheStore},
    types::{CacheKey, CallArgs, OperationId, ToCallArgs},
};
use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Caching configuration that can be applied to any number of operations
pub struct Cached<S = BinarySerializer> {
    config: Arc<CacheConfig>,
    store: Arc<dyn CacheStore>,
    key_builder: Arc<dyn KeyBuilder>,
    serializer: S,
}

impl<S: Clone> Clone for Cached<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            key_builder: Arc::clone(&self.key_builder),
            serializer: self.serializer.clone(),
        }
    }
}

impl Cached<BinarySerializer> {
    /// Start configuring with the defaults: 5 minute TTL, namespace `main`,
    /// [`build_key`](crate::cache::build_key) and the binary serializer
    pub fn builder() -> CachedBuilder<BinarySerializer> {
        CachedBuilder {
            config: CacheConfig::builder(),
            store: None,
            key_builder: None,
            serializer: BinarySerializer,
        }
    }
}

impl<S: Serializer> Cached<S> {
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Apply this configuration to an operation
    pub fn wrap<F>(&self, id: OperationId, operation: F) -> CachedOperation<F, S> {
        CachedOperation {
            id,
            operation,
            cache: self.clone(),
        }
    }
}

/// Builder for [`Cached`]
pub struct CachedBuilder<S> {
    config: CacheConfigBuilder,
    store: Option<Arc<dyn CacheStore>>,
    key_builder: Option<Arc<dyn KeyBuilder>>,
    serializer: S,
}

impl<S: Serializer> CachedBuilder<S> {
    /// Set the TTL of written entries; zero disables expiry
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.ttl(ttl);
        self
    }

    /// Keep entries until they are invalidated
    pub fn no_expiry(mut self) -> Self {
        self.config = self.config.no_expiry();
        self
    }

    /// Set the key namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config = self.config.namespace(namespace);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.config = self.config.ttl_jitter(jitter);
        self
    }

    /// Start from a complete configuration, e.g. one loaded with [`CacheConfig::from_env`]
    ///
    /// Replaces any TTL, namespace or jitter set before this call; setters
    /// called afterwards override the given values.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = CacheConfigBuilder::from(config);
        self
    }

    /// Set the backing store; without one the process-wide default is used
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default key builder
    pub fn key_builder(mut self, key_builder: impl KeyBuilder + 'static) -> Self {
        self.key_builder = Some(Arc::new(key_builder));
        self
    }

    /// Replace the serializer
    pub fn serializer<S2: Serializer>(self, serializer: S2) -> CachedBuilder<S2> {
        CachedBuilder {
            config: self.config,
            store: self.store,
            key_builder: self.key_builder,
            serializer,
        }
    }

    /// Validate the configuration and resolve the store
    pub fn build(self) -> Result<Cached<S>> {
        let config = self.config.build();
        config.validate()?;

        let store = self.store.or_else(default_store).ok_or_else(|| {
            CacheError::ConfigError(
                "no cache store configured and no default store installed".to_string(),
            )
        })?;

        Ok(Cached {
            config: Arc::new(config),
            store,
            key_builder: self
                .key_builder
                .unwrap_or_else(|| Arc::new(BasicKeyBuilder)),
            serializer: self.serializer,
        })
    }
}

/// An operation wrapped with cache-aside semantics
///
/// The operation receives its input by value and must be free of side effects
/// that matter per call: on a hit it does not run at all.
pub struct CachedOperation<F, S = BinarySerializer> {
    id: OperationId,
    operation: F,
    cache: Cached<S>,
}

impl<F: Clone, S: Clone> Clone for CachedOperation<F, S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            operation: self.operation.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<F, S: Serializer> CachedOperation<F, S> {
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn cache(&self) -> &Cached<S> {
        &self.cache
    }

    /// Full store key for a call with these arguments
    pub fn cache_key(&self, args: &CallArgs) -> Result<CacheKey> {
        let fragment = self.cache.key_builder.build(args)?;
        Ok(format!(
            "{}:{}:{}",
            self.cache.config.namespace, self.id, fragment
        ))
    }

    /// Call through the cache
    pub async fn call<A, T, E, Fut>(&self, input: A) -> std::result::Result<T, E>
    where
        A: ToCallArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
    {
        let key = self.cache_key(&input.to_call_args())?;

        if let Some(payload) = self.cache.store.get(&key).await? {
            debug!("Cache hit: {}", key);
            return Ok(self.cache.serializer.deserialize(&payload)?);
        }

        debug!("Cache miss: {}", key);
        let value = (self.operation)(input).await?;

        let payload = self.cache.serializer.serialize(&value)?;
        let ttl = self.cache.config.ttl_with_jitter();
        self.cache.store.set(&key, payload, ttl).await?;
        debug!(
            "Cached {} ({} serializer, ttl: {:?})",
            key,
            self.cache.serializer.name(),
            ttl
        );

        Ok(value)
    }

    /// Delete cached results of this operation matching a leading subset of arguments
    ///
    /// See [`invalidate`](crate::cache::invalidate).
    pub async fn invalidate(&self, args: &CallArgs) -> Result<u64> {
        invalidation::invalidate(
            self.cache.store.as_ref(),
            &self.id,
            args,
            &self.cache.config.namespace,
        )
        .await
    }
}
