//! Number-preserving JSON decoding helpers (spec §9 "Dynamic JSON numbers").
//!
//! Start/end/bucket/timestamp/value fields may arrive as a JSON number or a
//! JSON string. `original_source/src/server/handlers/api.go`'s
//! `decodeRequestBody` handles this by calling `decoder.UseNumber()` and then
//! type-switching on `string`/`nil`/default (`fmt.Sprintf("%+v", v)`); these
//! helpers do the equivalent in serde by deserializing into a
//! `serde_json::Value` first and coercing.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize an optional timespan-ish field (`start`, `end`,
/// `bucketDuration`) that may arrive as a JSON number or string, coercing to
/// its string form so it can be handed to `crate::time::parse_timespan`.
pub fn opt_string_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }))
}

/// Deserialize a required `i64` field (ingest `timestamp`) that may arrive as
/// a JSON number or a numeric string.
pub fn i64_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("not an integer: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|err| serde::de::Error::custom(format!("invalid integer '{s}': {err}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected number or numeric string, got {other}"
        ))),
    }
}

/// Deserialize a required `f64` field (ingest `value`) that may arrive as a
/// JSON number or a numeric string.
pub fn f64_from_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom(format!("not a finite number: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|err| serde::de::Error::custom(format!("invalid number '{s}': {err}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected number or numeric string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Wrapper {
        #[serde(default, deserialize_with = "opt_string_from_number_or_string")]
        v: Option<String>,
    }

    #[derive(serde::Deserialize)]
    struct IntWrapper {
        #[serde(deserialize_with = "i64_from_number_or_string")]
        v: i64,
    }

    #[derive(serde::Deserialize)]
    struct FloatWrapper {
        #[serde(deserialize_with = "f64_from_number_or_string")]
        v: f64,
    }

    #[test]
    fn accepts_number_form() {
        let w: Wrapper = serde_json::from_str(r#"{"v": 1700000000000}"#).unwrap();
        assert_eq!(w.v.unwrap(), "1700000000000");
    }

    #[test]
    fn accepts_string_form() {
        let w: Wrapper = serde_json::from_str(r#"{"v": "-8h"}"#).unwrap();
        assert_eq!(w.v.unwrap(), "-8h");
    }

    #[test]
    fn missing_field_is_none() {
        let w: Wrapper = serde_json::from_str(r#"{}"#).unwrap();
        assert!(w.v.is_none());
    }

    #[test]
    fn timestamp_accepts_both_forms() {
        let a: IntWrapper = serde_json::from_str(r#"{"v": 1000}"#).unwrap();
        assert_eq!(a.v, 1000);
        let b: IntWrapper = serde_json::from_str(r#"{"v": "1000"}"#).unwrap();
        assert_eq!(b.v, 1000);
    }

    #[test]
    fn value_accepts_both_forms() {
        let a: FloatWrapper = serde_json::from_str(r#"{"v": 1.5}"#).unwrap();
        assert_eq!(a.v, 1.5);
        let b: FloatWrapper = serde_json::from_str(r#"{"v": "1.5"}"#).unwrap();
        assert_eq!(b.v, 1.5);
    }
}
