//! Payload serializers
//!
//! A cache commits to one serializer for its whole key space; bytes written by
//! one variant are not readable by the other.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Converts values to and from stored payloads
pub trait Serializer: Clone + Send + Sync + 'static {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// General-purpose binary serializer backed by CBOR
///
/// The format is self-describing, so anything whose serde impls round-trip
/// decodes back: nested records, enums, maps with composite keys,
/// `serde_json::Value`, untagged enums and fields skipped when empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        value.serialize(&mut serde_cbor::Serializer::new(&mut bytes))?;
        Ok(bytes)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_cbor::from_slice(bytes)?)
    }
}

/// Human-inspectable JSON serializer
///
/// Limited to the JSON data model: values such as maps keyed by tuples or
/// structs fail with [`CacheError::Serialization`](crate::CacheError::Serialization).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
