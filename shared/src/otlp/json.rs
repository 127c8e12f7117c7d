//! Serde helpers for the OTLP/JSON encoding.
//!
//! OTLP/JSON follows the proto3 JSON mapping with two deviations: trace and
//! span ids are hex strings, and enums are sent as integers. Producers still
//! vary, so these helpers accept both numbers and strings wherever the
//! mapping allows either.

use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn u64_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, found {n}"))),
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s.parse().map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected integer, found {other}"))),
    }
}

pub(crate) fn i64_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("expected integer, found {n}"))),
        Value::String(s) => s.parse().map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected integer, found {other}"))),
    }
}

pub(crate) fn f64_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("expected number, found {n}"))),
        Value::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => s.parse().map_err(D::Error::custom),
        },
        other => Err(D::Error::custom(format!("expected number, found {other}"))),
    }
}

/// Enum values arrive as integers or as their proto names.
pub(crate) fn enum_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("enum value out of range: {n}"))),
        Value::String(s) => Ok(s.parse().unwrap_or_else(|_| enum_name_to_number(&s))),
        other => Err(D::Error::custom(format!("expected enum, found {other}"))),
    }
}

fn enum_name_to_number(name: &str) -> i32 {
    match name {
        "STATUS_CODE_OK" | "SPAN_KIND_INTERNAL" | "SEVERITY_NUMBER_TRACE"
        | "AGGREGATION_TEMPORALITY_DELTA" => 1,
        "STATUS_CODE_ERROR" | "SPAN_KIND_SERVER" | "AGGREGATION_TEMPORALITY_CUMULATIVE" => 2,
        "SPAN_KIND_CLIENT" => 3,
        "SPAN_KIND_PRODUCER" => 4,
        "SPAN_KIND_CONSUMER" => 5,
        "SEVERITY_NUMBER_DEBUG" => 5,
        "SEVERITY_NUMBER_INFO" => 9,
        "SEVERITY_NUMBER_WARN" => 13,
        "SEVERITY_NUMBER_ERROR" => 17,
        "SEVERITY_NUMBER_FATAL" => 21,
        _ => 0,
    }
}

pub(crate) fn hex_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(s) => hex::decode(&s).map_err(D::Error::custom),
    }
}

pub(crate) fn base64_bytes<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(s.as_bytes())
        .map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "u64_from_any", default)]
        nanos: u64,
        #[serde(deserialize_with = "enum_from_any", default)]
        code: i32,
        #[serde(deserialize_with = "hex_bytes", default)]
        id: Vec<u8>,
    }

    #[test]
    fn test_u64_accepts_string_and_number() {
        let p: Probe = serde_json::from_str(r#"{"nanos": "1700000000000000000"}"#).unwrap();
        assert_eq!(p.nanos, 1_700_000_000_000_000_000);
        let p: Probe = serde_json::from_str(r#"{"nanos": 12}"#).unwrap();
        assert_eq!(p.nanos, 12);
    }

    #[test]
    fn test_enum_accepts_names() {
        let p: Probe = serde_json::from_str(r#"{"code": "STATUS_CODE_ERROR"}"#).unwrap();
        assert_eq!(p.code, 2);
        let p: Probe = serde_json::from_str(r#"{"code": 1}"#).unwrap();
        assert_eq!(p.code, 1);
    }

    #[test]
    fn test_hex_ids() {
        let p: Probe = serde_json::from_str(r#"{"id": "0a0b"}"#).unwrap();
        assert_eq!(p.id, vec![0x0a, 0x0b]);
        assert!(serde_json::from_str::<Probe>(r#"{"id": "zz"}"#).is_err());
    }
}
