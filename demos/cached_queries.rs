//! Cached Queries Demo Application
//!
//! Caches a paginated "top tracks" query, shows hits and misses, then
//! invalidates after a simulated vote.
//!
//! Usage:
//!   cargo run --example cached_queries
//!   cargo run --example cached_queries -- --redis
//!
//! Environment variables:
//!   CACHE__TTL_SECS  - TTL of cached results (default: 300)
//!   CACHE__NAMESPACE - Key namespace (default: main)
//!   REDIS__URL       - Redis connection URL, used with --redis
//!   RUST_LOG         - Log filter (default: info,query_cache=debug)

use query_cache::{
    build_key_with_defaults, operation_id, start_auto_cleanup, CacheConfig, CacheStore, Cached,
    CallArgs, MemoryStore, RedisStore, Signature, ToCallArgs,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Track {
    id: u64,
    title: String,
    votes: u32,
}

struct TopTracksQuery {
    session: String,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl ToCallArgs for TopTracksQuery {
    fn to_call_args(&self) -> CallArgs {
        let mut args = CallArgs::new().kwarg("session", &self.session);
        if let Some(limit) = self.limit {
            args = args.kwarg("limit", limit);
        }
        if let Some(offset) = self.offset {
            args = args.kwarg("offset", offset);
        }
        args
    }
}

// Stands in for a slow database query
async fn top_tracks(query: TopTracksQuery) -> anyhow::Result<Vec<Track>> {
    tokio::time::sleep(Duration::from_millis(200)).await;

    let limit = query.limit.unwrap_or(10);
    let offset = query.offset.unwrap_or(0);
    Ok((offset..offset + limit)
        .map(|i| Track {
            id: u64::from(i),
            title: format!("Track #{}", i),
            votes: 1000 - i,
        })
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,query_cache=debug")),
        )
        .init();

    info!("=== Cached Queries Demo ===");

    let store: Arc<dyn CacheStore> = if std::env::args().any(|a| a == "--redis") {
        let store = RedisStore::from_env().await?;
        info!("Using Redis store at {}", store.settings().target()?);
        Arc::new(store)
    } else {
        info!("Using in-process store (pass --redis to use Redis)");
        let store = MemoryStore::new();
        tokio::spawn(start_auto_cleanup(store.clone(), Duration::from_secs(60)));
        Arc::new(store)
    };

    let config = CacheConfig::from_env()?;
    info!("Cache config: namespace={}, ttl={:?}", config.namespace, config.ttl);

    let key_builder = build_key_with_defaults(["limit", "offset"]).for_signature(
        Signature::new()
            .required("session")
            .optional("limit", 10)
            .optional("offset", 0),
    )?;

    let cached = Cached::builder()
        .config(config)
        .store(store.clone())
        .key_builder(key_builder)
        .build()?;
    let top = cached.wrap(operation_id!(top_tracks), top_tracks);

    info!("\n--- First call (miss) ---");
    let started = Instant::now();
    let tracks = top
        .call(TopTracksQuery {
            session: "session-1".to_string(),
            limit: None,
            offset: None,
        })
        .await?;
    info!("Got {} tracks in {:?}", tracks.len(), started.elapsed());

    info!("\n--- Same page, defaults spelled out, other session (hit) ---");
    let started = Instant::now();
    let tracks = top
        .call(TopTracksQuery {
            session: "session-2".to_string(),
            limit: Some(10),
            offset: Some(0),
        })
        .await?;
    info!("Got {} tracks in {:?}", tracks.len(), started.elapsed());

    info!("\n--- Second page (miss) ---");
    let tracks = top
        .call(TopTracksQuery {
            session: "session-1".to_string(),
            limit: Some(10),
            offset: Some(10),
        })
        .await?;
    info!("First track on page 2: {}", tracks[0].title);

    info!("\n--- Vote recorded, invalidating every page ---");
    let deleted = top.invalidate(&CallArgs::new()).await?;
    info!("Invalidated {} cached pages", deleted);

    let started = Instant::now();
    top.call(TopTracksQuery {
        session: "session-1".to_string(),
        limit: None,
        offset: None,
    })
    .await?;
    info!("Recomputed first page in {:?}", started.elapsed());

    info!("\n=== Demo Complete ===");
    Ok(())
}
