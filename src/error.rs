//! Error types for cache operations
//!
//! Every failure of the caching layer surfaces through [`CacheError`]. Errors
//! raised by the wrapped operations themselves never pass through this type:
//! they are returned to the caller untouched.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// A value could not be encoded or decoded by the configured serializer
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing store could not be reached or rejected a command
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Call arguments could not be bound against a declared signature
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Whether this error came from the backing store rather than from the caller's data
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::Unavailable(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

impl From<serde_cbor::Error> for CacheError {
    fn from(e: serde_cbor::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::Unavailable("connection refused".to_string());
        assert_eq!(error.to_string(), "Cache unavailable: connection refused");

        let error = CacheError::Serialization("invalid type".to_string());
        assert!(error.to_string().starts_with("Serialization error"));

        let error = CacheError::InvalidArguments("missing required argument `limit`".to_string());
        assert!(error.to_string().contains("`limit`"));
    }

    #[test]
    fn test_error_conversion() {
        let error: CacheError = "test error".into();
        assert!(matches!(error, CacheError::Other(_)));

        let error: CacheError = "test error".to_string().into();
        assert!(matches!(error, CacheError::Other(_)));

        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: CacheError = json_err.into();
        assert!(matches!(error, CacheError::Serialization(_)));

        let cbor_err = serde_cbor::from_slice::<u32>(&[0xff]).unwrap_err();
        let error: CacheError = cbor_err.into();
        assert!(matches!(error, CacheError::Serialization(_)));
    }

    #[test]
    fn test_redis_error_is_unavailable() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"));
        let error: CacheError = redis_err.into();
        assert!(error.is_unavailable());
    }
}
