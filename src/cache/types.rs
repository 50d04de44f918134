//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cache key type - `{namespace}:{operation}:{argument fragment}`
pub type CacheKey = String;

/// Cached payload as written to the store
pub type CacheValue = Vec<u8>;

/// Stable identity of a cached operation: defining scope plus short name
///
/// Two distinct operations cached in the same namespace must never share an
/// identity. The [`operation_id!`](crate::operation_id) macro derives the scope
/// from the calling module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId {
    scope: String,
    name: String,
}

impl OperationId {
    /// Create an identity from an explicit scope and name
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// The defining scope (module path)
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The short operation name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.name)
    }
}

/// Build an [`OperationId`] scoped to the module the macro is invoked from
///
/// ```
/// use query_cache::operation_id;
///
/// let id = operation_id!(get_user);
/// assert_eq!(id.name(), "get_user");
/// assert_eq!(id.scope(), module_path!());
/// ```
#[macro_export]
macro_rules! operation_id {
    ($name:ident) => {
        $crate::cache::OperationId::new(module_path!(), stringify!($name))
    };
}

/// A single argument value as it takes part in a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgValue {
    /// Textual rendering of a present value
    Text(String),

    /// An absent optional value
    Null,
}

impl ArgValue {
    /// Render any displayable value
    pub fn text(value: impl fmt::Display) -> Self {
        ArgValue::Text(value.to_string())
    }

    /// `Null` for `None`, the rendered value otherwise
    pub fn optional<T: fmt::Display>(value: Option<T>) -> Self {
        match value {
            Some(v) => ArgValue::text(v),
            None => ArgValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => f.write_str(s),
            ArgValue::Null => f.write_str("null"),
        }
    }
}

/// Positional and keyword arguments of one call
///
/// Keyword arguments are kept sorted by name, so the order in which they are
/// added never influences the key they produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallArgs {
    positional: Vec<ArgValue>,
    named: BTreeMap<String, ArgValue>,
}

impl CallArgs {
    /// Create an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.positional.push(ArgValue::text(value));
        self
    }

    /// Append a positional argument that may be absent
    pub fn arg_opt<T: fmt::Display>(mut self, value: Option<T>) -> Self {
        self.positional.push(ArgValue::optional(value));
        self
    }

    /// Append an already-rendered positional argument
    pub fn arg_value(mut self, value: ArgValue) -> Self {
        self.positional.push(value);
        self
    }

    /// Set a keyword argument, replacing any previous value under the same name
    pub fn kwarg(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.named.insert(name.into(), ArgValue::text(value));
        self
    }

    /// Set a keyword argument that may be absent
    pub fn kwarg_opt<T: fmt::Display>(mut self, name: impl Into<String>, value: Option<T>) -> Self {
        self.named.insert(name.into(), ArgValue::optional(value));
        self
    }

    /// Set an already-rendered keyword argument
    pub fn kwarg_value(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    /// Keyword arguments in name order
    pub fn named(&self) -> &BTreeMap<String, ArgValue> {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Total number of arguments
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }
}

/// Conversion of a wrapped operation's input into key-relevant arguments
pub trait ToCallArgs {
    fn to_call_args(&self) -> CallArgs;
}

impl ToCallArgs for CallArgs {
    fn to_call_args(&self) -> CallArgs {
        self.clone()
    }
}

impl ToCallArgs for () {
    fn to_call_args(&self) -> CallArgs {
        CallArgs::new()
    }
}

impl<T: ToCallArgs + ?Sized> ToCallArgs for &T {
    fn to_call_args(&self) -> CallArgs {
        (**self).to_call_args()
    }
}

macro_rules! scalar_call_args {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToCallArgs for $ty {
                fn to_call_args(&self) -> CallArgs {
                    CallArgs::new().arg(self)
                }
            }
        )*
    };
}

scalar_call_args!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, bool, char, str, String);

macro_rules! tuple_call_args {
    ($($name:ident),+) => {
        impl<$($name: fmt::Display),+> ToCallArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn to_call_args(&self) -> CallArgs {
                let ($($name,)+) = self;
                CallArgs::new()$(.arg($name))+
            }
        }
    };
}

tuple_call_args!(A);
tuple_call_args!(A, B);
tuple_call_args!(A, B, C);
tuple_call_args!(A, B, C, D);

/// Counters kept by the in-process store
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of writes (including overwrites)
    pub writes: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Total size of cached payloads in bytes
    pub size_bytes: usize,

    /// Number of entries dropped because their TTL elapsed
    pub evictions_ttl: u64,

    /// Number of entries removed by explicit deletes
    pub deletions: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, writes: {}, entries: {}, size: {} bytes, expired: {}, deleted: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.writes,
            self.entries,
            self.size_bytes,
            self.evictions_ttl,
            self.deletions
        )
    }
}
