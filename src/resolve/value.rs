//! Cell value resolution
//!
//! Authors write JSON, legacy literals, or ad-hoc query strings in the same
//! column. A string cell is decoded by trying each [`Strategy`] in order and
//! keeping the first success; anything undecodable stays a plain string.

use serde_json::{Map, Value};

use super::literal;

/// One way of interpreting a string cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Strict JSON
    Json,
    /// Permissive literal syntax (single quotes, True/False/None)
    Literal,
    /// `key=value&key2=value2`, blank values kept
    Query,
    /// Trimmed string, unchanged
    Fallback,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Json => "json",
            Strategy::Literal => "literal",
            Strategy::Query => "query",
            Strategy::Fallback => "fallback",
        }
    }
}

/// Decoding strategies in precedence order
const STRATEGIES: &[(Strategy, fn(&str) -> Option<Value>)] = &[
    (Strategy::Json, decode_json),
    (Strategy::Literal, decode_literal),
    (Strategy::Query, decode_query),
];

/// Whether a raw cell counts as empty
pub fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Resolve a raw cell value, also reporting which strategy decoded it
///
/// Blank and already-structured inputs report `None`.
pub fn resolve_traced(raw: &Value) -> (Value, Option<Strategy>) {
    if is_blank(raw) {
        return (Value::Null, None);
    }
    match raw {
        Value::String(s) => {
            let (value, strategy) = decode_str(s.trim());
            (value, Some(strategy))
        }
        other => (other.clone(), None),
    }
}

fn decode_str(s: &str) -> (Value, Strategy) {
    STRATEGIES
        .iter()
        .find_map(|(strategy, decode)| decode(s).map(|v| (v, *strategy)))
        .unwrap_or_else(|| (Value::String(s.to_string()), Strategy::Fallback))
}

/// Strict JSON decoding
pub fn decode_json(s: &str) -> Option<Value> {
    serde_json::from_str(s).ok()
}

/// Permissive literal decoding
pub fn decode_literal(s: &str) -> Option<Value> {
    literal::parse(s)
}

/// Query-string decoding; later duplicate keys win
pub fn decode_query(s: &str) -> Option<Value> {
    if !s.contains('=') {
        return None;
    }
    let map: Map<String, Value> = form_urlencoded::parse(s.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Keep a resolved value only if it is a mapping
///
/// Returns the discarded value's description so callers can record a
/// warning; `params` and `headers` must never reach the HTTP layer as
/// anything but a mapping.
pub fn into_mapping(value: Value) -> (Option<Map<String, Value>>, Option<String>) {
    match value {
        Value::Null => (None, None),
        Value::Object(map) => (Some(map), None),
        other => (None, Some(other.to_string())),
    }
}

/// Render a scalar as comparable text
///
/// Strings are trimmed, integral floats lose their fraction (`10021.0` →
/// `10021`), null is `None`. Containers render as compact JSON.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
