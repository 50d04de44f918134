//! Pattern-based invalidation of cached results
//!
//! Invalidation rebuilds the key prefix a cached operation writes under and
//! deletes every key that starts with it. Arguments left out act as wildcards
//! only when they are the trailing ones in key order: `invalidate(op, x)`
//! purges `op(x, y)` for every `y`, but there is no way to purge `op(_, y)`.
//!
//! Matching is by string prefix. A fragment ending in a keyword pair has no
//! trailing separator, so `invalidate(op, user_id=7)` also purges
//! `user_id=70` and `user_id=71`. Positional fragments end in `:` and do not
//! over-match this way. Over-matching only deletes extra entries, which are
//! recomputed on their next call.
//!
//! Scan and delete are two separate store round trips. A key written between
//! them survives the invalidation.

use crate::cache::{
    key::{build_key, EMPTY_FRAGMENT},
    store::CacheStore,
    types::{CallArgs, OperationId},
};
use crate::error::Result;
use tracing::{debug, info};

/// Escape glob metacharacters so `value` only matches itself
pub fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Scan pattern matching every entry of `operation` whose arguments start with `args`
///
/// Arguments are rendered with [`build_key`], never with a defaults-aware
/// builder: invalidation matches explicit values only.
pub fn invalidation_pattern(namespace: &str, operation: &OperationId, args: &CallArgs) -> String {
    let fragment = build_key(args);
    let prefix = format!("{}:{}:", namespace, operation);

    if fragment.is_empty() || fragment == EMPTY_FRAGMENT {
        format!("{}*", escape_glob(&prefix))
    } else {
        format!("{}{}*", escape_glob(&prefix), escape_glob(&fragment))
    }
}

/// Delete cached results of `operation` matching the given leading arguments
///
/// Returns the number of deleted entries. No match is not an error.
pub async fn invalidate(
    store: &dyn CacheStore,
    operation: &OperationId,
    args: &CallArgs,
    namespace: &str,
) -> Result<u64> {
    let pattern = invalidation_pattern(namespace, operation, args);

    let keys = store.scan(&pattern).await?;
    if keys.is_empty() {
        debug!("Invalidation {} matched nothing", pattern);
        return Ok(0);
    }

    let deleted = store.delete(&keys).await?;
    info!(
        "Invalidated {} entries for {} (pattern: {})",
        deleted, operation, pattern
    );
    Ok(deleted)
}
