//! Defensive lookups over decoded JSON.
//!
//! Upstream wraps most numbers as `{ "raw": 1.5, "fmt": "1.50" }`, sometimes sends
//! them bare, and drops leaves without notice. Every helper here returns `None`
//! instead of failing.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Walks `path` from `node`, returning `None` at the first missing key or null.
pub fn lookup<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = node;
    for key in path {
        cur = match cur {
            Value::Object(map) => map.get(*key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!cur.is_null()).then_some(cur)
}

/// Numeric value of a leaf: bare numbers, `{raw: n}` objects and numeric strings.
pub fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => map.get("raw").and_then(number),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Integer value of a leaf, accepting integer-like floats such as `4.0`.
#[allow(clippy::cast_possible_truncation)]
pub fn integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::Object(map) => map.get("raw").and_then(integer),
        _ => None,
    }
}

/// Text value of a leaf; `{fmt}` objects yield their formatted text.
pub fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("fmt").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

pub fn boolean(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Object(map) => map.get("raw").and_then(boolean),
        _ => None,
    }
}

/// Date text of a leaf: `{fmt}` text when present, otherwise an epoch rendered as `YYYY-MM-DD`.
pub fn date_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("fmt")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| map.get("raw").and_then(date_text)),
        Value::Number(_) => integer(v).and_then(format_date),
        _ => None,
    }
}

/// Epoch seconds rendered as `YYYY-MM-DD`.
pub fn format_date(epoch: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(epoch, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Epoch seconds rendered as `YYYY-MM-DD HH:MM:SS UTC+0000`.
pub fn format_time(epoch: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC%z").to_string())
}

/// Locates the node for `ticker` under a container that is either a list of
/// per-symbol entries or an object keyed by symbol.
///
/// Lists match on a `symbol` member (string or single-element array); a list
/// with exactly one entry is taken as-is. Objects are searched for a key equal to
/// the ticker (case-insensitively). Without such a key the object is the node
/// itself, unless it names another symbol or its values are per-symbol entries.
pub fn select_ticker<'a>(container: &'a Value, ticker: &str) -> Option<&'a Value> {
    match container {
        Value::Array(items) => items
            .iter()
            .find(|item| symbol_matches(item, ticker))
            .or_else(|| match items.as_slice() {
                [only] if symbol_of(only).is_none() => Some(only),
                _ => None,
            })
            .filter(|v| !v.is_null()),
        Value::Object(map) => map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(ticker))
            .map(|(_, v)| v)
            .or_else(|| {
                let keyed_by_symbol = map
                    .iter()
                    .any(|(k, v)| symbol_of(v).is_some_and(|s| s.eq_ignore_ascii_case(k)));
                let own = symbol_of(container).is_none_or(|s| s.eq_ignore_ascii_case(ticker));
                (own && !keyed_by_symbol).then_some(container)
            })
            .filter(|v| !v.is_null()),
        _ => None,
    }
}

/// All list entries that belong to `ticker` (entries without symbol info are kept).
pub fn entries_for_ticker<'a>(container: &'a Value, ticker: &str) -> Vec<&'a Value> {
    match container {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .filter(|item| symbol_of(item).is_none() || symbol_matches(item, ticker))
            .collect(),
        Value::Object(_) => select_ticker(container, ticker).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn symbol_of(item: &Value) -> Option<&str> {
    let sym = item
        .get("symbol")
        .or_else(|| item.get("meta").and_then(|m| m.get("symbol")))?;
    match sym {
        Value::String(s) => Some(s),
        Value::Array(a) => a.first().and_then(Value::as_str),
        _ => None,
    }
}

fn symbol_matches(item: &Value, ticker: &str) -> bool {
    symbol_of(item).is_some_and(|s| s.eq_ignore_ascii_case(ticker))
}
