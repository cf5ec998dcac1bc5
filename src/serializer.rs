//! Request/response body codec.

use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("failed to encode body: {0}")]
    Encode(String),

    #[error("failed to decode body: {0}")]
    Decode(String),
}

/// Encodes request bodies and decodes response bodies.
pub trait Serializer: Send + Sync + Debug {
    /// Value sent as `content-type` for encoded bodies.
    fn content_type(&self) -> &'static str;

    fn dump(&self, value: &Value) -> Result<Bytes, SerializerError>;

    fn load(&self, body: &[u8]) -> Result<Value, SerializerError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn dump(&self, value: &Value) -> Result<Bytes, SerializerError> {
        // Pre-encoded strings are passed through untouched.
        if let Value::String(raw) = value {
            return Ok(Bytes::from(raw.clone()));
        }
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| SerializerError::Encode(e.to_string()))
    }

    fn load(&self, body: &[u8]) -> Result<Value, SerializerError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(body).map_err(|e| SerializerError::Decode(e.to_string()))
    }
}

/// Built-in codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializerKind {
    #[default]
    Json,
}

impl SerializerKind {
    pub fn build(self) -> Arc<dyn Serializer> {
        match self {
            SerializerKind::Json => Arc::new(JsonSerializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dump_and_load() {
        let codec = JsonSerializer;
        let body = codec.dump(&json!({"query": {"match_all": {}}})).unwrap();
        assert_eq!(&body[..], br#"{"query":{"match_all":{}}}"#);
        assert_eq!(codec.load(&body).unwrap()["query"], json!({"match_all": {}}));
    }

    #[test]
    fn test_string_passthrough_and_empty_body() {
        let codec = JsonSerializer;
        let raw = "{\"index\":{}}\n{\"a\":1}\n";
        assert_eq!(&codec.dump(&Value::String(raw.into())).unwrap()[..], raw.as_bytes());
        assert_eq!(codec.load(b"  ").unwrap(), Value::Null);
        assert!(matches!(codec.load(b"{nope"), Err(SerializerError::Decode(_))));
    }
}
