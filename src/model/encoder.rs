//! Field value encoders.
//!
//! An encoder is a pure pair of transforms between the value an entity holds
//! in memory and the value an adapter stores. Every encoder must satisfy
//! `decode(encode(v)) == v` for the values it accepts. `Null` passes through
//! all built-in encoders unchanged.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::core::Value;

/// Result of a single encode or decode step. The error is a human-readable
/// reason; the binding attaches the field name.
pub type EncodeResult = std::result::Result<Value, String>;

pub trait ValueEncoder: Send + Sync {
    /// In-memory value to at-rest value.
    fn encode(&self, value: &Value) -> EncodeResult;
    /// At-rest value back to in-memory value.
    fn decode(&self, raw: &Value) -> EncodeResult;
}

/// `Json` held in memory, stored as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTextEncoder;

impl ValueEncoder for JsonTextEncoder {
    fn encode(&self, value: &Value) -> EncodeResult {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Json(json) => serde_json::to_string(json)
                .map(Value::Text)
                .map_err(|e| format!("Failed to serialize JSON: {}", e)),
            other => Err(format!("expected JSON, got {}", other.type_name())),
        }
    }

    fn decode(&self, raw: &Value) -> EncodeResult {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Text(text) => serde_json::from_str(text)
                .map(Value::Json)
                .map_err(|e| format!("Failed to parse JSON: {}", e)),
            other => Err(format!("expected TEXT, got {}", other.type_name())),
        }
    }
}

/// `Timestamp` held in memory, stored as RFC 3339 text in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampEncoder;

impl ValueEncoder for TimestampEncoder {
    fn encode(&self, value: &Value) -> EncodeResult {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Timestamp(ts) => Ok(Value::Text(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
            other => Err(format!("expected TIMESTAMP, got {}", other.type_name())),
        }
    }

    fn decode(&self, raw: &Value) -> EncodeResult {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|e| format!("Invalid RFC 3339 timestamp '{}': {}", text, e)),
            other => Err(format!("expected TEXT, got {}", other.type_name())),
        }
    }
}

/// `Boolean` held in memory, stored as `0`/`1` for backends without a
/// boolean column type.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolIntEncoder;

impl ValueEncoder for BoolIntEncoder {
    fn encode(&self, value: &Value) -> EncodeResult {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Boolean(b) => Ok(Value::Integer(i64::from(*b))),
            other => Err(format!("expected BOOLEAN, got {}", other.type_name())),
        }
    }

    fn decode(&self, raw: &Value) -> EncodeResult {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Integer(0) => Ok(Value::Boolean(false)),
            Value::Integer(1) => Ok(Value::Boolean(true)),
            Value::Boolean(b) => Ok(Value::Boolean(*b)),
            other => Err(format!("expected 0 or 1, got {}", other)),
        }
    }
}

type Transform = Box<dyn Fn(&Value) -> EncodeResult + Send + Sync>;

/// Encoder assembled from a pair of closures.
pub struct FnEncoder {
    encode: Transform,
    decode: Transform,
}

impl FnEncoder {
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&Value) -> EncodeResult + Send + Sync + 'static,
        D: Fn(&Value) -> EncodeResult + Send + Sync + 'static,
    {
        Self {
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl ValueEncoder for FnEncoder {
    fn encode(&self, value: &Value) -> EncodeResult {
        (self.encode)(value)
    }

    fn decode(&self, raw: &Value) -> EncodeResult {
        (self.decode)(raw)
    }
}

impl std::fmt::Debug for FnEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnEncoder")
    }
}
