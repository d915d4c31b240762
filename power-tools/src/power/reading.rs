use common_redis::CustomRedisError;
use serde_json::Value;

pub const MISSING_SENTINEL: &str = "N/A";
pub const FAILED_SENTINEL: &str = "query error";

const VALUE_FIELD: &str = "val";

/// The outcome of reading one metric key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricReading {
    Value(String),
    /// The key does not exist, or its payload carries no value.
    Missing,
    /// The store could not answer; holds the cause.
    Failed(String),
}

impl MetricReading {
    /// Builds a reading from a raw payload. Payloads are usually JSON objects such
    /// as `{"val": 231.4, "ts": ...}`; anything that is not a JSON object is taken
    /// verbatim.
    pub fn from_payload(payload: String) -> MetricReading {
        let mut object = match serde_json::from_str::<Value>(&payload) {
            Ok(Value::Object(object)) => object,
            _ => return MetricReading::Value(payload),
        };

        match object.remove(VALUE_FIELD) {
            None | Some(Value::Null) => MetricReading::Missing,
            Some(Value::String(value)) => MetricReading::Value(value),
            Some(other) => MetricReading::Value(other.to_string()),
        }
    }

    pub fn from_fetch(result: Result<String, CustomRedisError>) -> MetricReading {
        match result {
            Ok(payload) => MetricReading::from_payload(payload),
            Err(CustomRedisError::NotFound) => MetricReading::Missing,
            Err(e) => MetricReading::Failed(e.to_string()),
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            MetricReading::Value(_) => "value",
            MetricReading::Missing => "missing",
            MetricReading::Failed(_) => "failed",
        }
    }

    /// Text shown in a report cell.
    pub fn display(&self) -> &str {
        match self {
            MetricReading::Value(value) => value.as_str(),
            MetricReading::Missing => MISSING_SENTINEL,
            MetricReading::Failed(_) => FAILED_SENTINEL,
        }
    }
}
