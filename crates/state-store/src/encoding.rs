//! Tagged-string encoding for state-store hash fields (§6.4).
//!
//! The store itself is schema-less (a plain string->string hash), so
//! every field value carries a type tag the decoder can dispatch on.
//! This is a straight port of the historical prototype's dynamic
//! per-type encoding into an explicit tagged-union serializer.

use chrono::{DateTime, Utc};

const TAG_NULL: &str = "__null__";
const TAG_BOOL_TRUE: &str = "__bool__true";
const TAG_BOOL_FALSE: &str = "__bool__false";
const TAG_NUMBER: &str = "__number__";
const TAG_DATETIME: &str = "__datetime__";
const TAG_DICT: &str = "__dict__";
const TAG_LIST: &str = "__list__";

/// A decoded field value. `Dict`/`List` carry raw JSON text rather than
/// a parsed value — callers that need structure parse it themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    Dict(String),
    List(String),
    Str(String),
}

impl Value {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Null => TAG_NULL.to_string(),
            Self::Bool(true) => TAG_BOOL_TRUE.to_string(),
            Self::Bool(false) => TAG_BOOL_FALSE.to_string(),
            Self::Integer(n) => format!("{TAG_NUMBER}{n}"),
            Self::Float(f) => format!("{TAG_NUMBER}{f}"),
            Self::DateTime(dt) => format!("{TAG_DATETIME}{}", dt.to_rfc3339()),
            Self::Dict(json) => format!("{TAG_DICT}{json}"),
            Self::List(json) => format!("{TAG_LIST}{json}"),
            Self::Str(s) => s.clone(),
        }
    }

    /// Decodes a tagged string. Unknown tags (or a tag-shaped prefix
    /// that doesn't parse) fall back to a plain string, matching the
    /// "unknown tags returned as plain strings" rule.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        if raw == TAG_NULL {
            return Self::Null;
        }
        if raw == TAG_BOOL_TRUE {
            return Self::Bool(true);
        }
        if raw == TAG_BOOL_FALSE {
            return Self::Bool(false);
        }
        if let Some(rest) = raw.strip_prefix(TAG_NUMBER) {
            return if rest.contains('.') {
                rest.parse::<f64>()
                    .map_or_else(|_| Self::Str(raw.to_string()), Self::Float)
            } else {
                rest.parse::<i64>()
                    .map_or_else(|_| Self::Str(raw.to_string()), Self::Integer)
            };
        }
        if let Some(rest) = raw.strip_prefix(TAG_DATETIME) {
            return DateTime::parse_from_rfc3339(rest).map_or_else(
                |_| Self::Str(raw.to_string()),
                |dt| Self::DateTime(dt.with_timezone(&Utc)),
            );
        }
        if let Some(rest) = raw.strip_prefix(TAG_DICT) {
            return Self::Dict(rest.to_string());
        }
        if let Some(rest) = raw.strip_prefix(TAG_LIST) {
            return Self::List(rest.to_string());
        }
        Self::Str(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(v: Value) {
        let encoded = v.encode();
        let decoded = Value::decode(&encoded);
        assert_eq!(v, decoded, "round-trip failed for {encoded:?}");
    }

    #[test]
    fn round_trips_every_scalar_kind() {
        round_trip(Value::Null);
        round_trip(Value::Bool(true));
        round_trip(Value::Bool(false));
        round_trip(Value::Integer(-42));
        round_trip(Value::Float(3.14));
        round_trip(Value::DateTime(Utc::now()));
        round_trip(Value::Dict(r#"{"a":1}"#.to_string()));
        round_trip(Value::List(r#"[1,2,3]"#.to_string()));
        round_trip(Value::Str("plain".to_string()));
    }

    #[test]
    fn unknown_tag_falls_back_to_plain_string() {
        let decoded = Value::decode("__totally_unknown__abc");
        assert_eq!(decoded, Value::Str("__totally_unknown__abc".to_string()));
    }

    #[test]
    fn bare_string_without_tag_is_a_plain_string() {
        assert_eq!(Value::decode("hello world"), Value::Str("hello world".to_string()));
    }
}
