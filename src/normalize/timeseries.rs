//! Financial statements from the fundamentals time series.
//!
//! Upstream returns one entry per series (`annualTotalRevenue`, ...), each a
//! list of dated values. These are regrouped into one row per `asOfDate`.

use std::collections::BTreeMap;

use serde_json::Value;

use super::schema::{self, Derived};
use crate::core::models::{Field, Record};
use crate::core::wire;
use crate::endpoint::StatementKind;

const INCOME_DERIVED: &[Derived] = &[Derived::Ratio {
    name: "grossMargin",
    numerator: "grossProfit",
    denominator: "totalRevenue",
}];

const BALANCE_DERIVED: &[Derived] = &[Derived::Ratio {
    name: "debtToEquity",
    numerator: "totalDebt",
    denominator: "stockholdersEquity",
}];

/// `annualTotalRevenue` -> `totalRevenue`, `quarterlyEBIT` -> `ebit`.
pub(crate) fn clean_key(raw: &str) -> String {
    let stripped = ["quarterly", "annual", "trailing"]
        .iter()
        .fold(raw, |k, prefix| k.strip_prefix(prefix).unwrap_or(k));
    if stripped == "EBIT" {
        return stripped.to_ascii_lowercase();
    }
    let mut chars = stripped.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_ascii_lowercase().to_string() + chars.as_str()
    })
}

pub(crate) fn statements(kind: StatementKind, ticker: &str, body: &Value) -> Option<Record> {
    let result = wire::lookup(body, &["timeseries", "result"])?;
    let entries = wire::entries_for_ticker(result, ticker);
    if entries.is_empty() {
        return None;
    }

    let mut by_date: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut currency: Option<String> = None;
    for entry in entries {
        let Value::Object(map) = entry else { continue };
        for (key, series) in map {
            if key == "meta" || key == "timestamp" {
                continue;
            }
            let Value::Array(points) = series else {
                continue;
            };
            let field = clean_key(key);
            for point in points {
                let Some(date) = wire::lookup(point, &["asOfDate"]).and_then(wire::text) else {
                    continue;
                };
                if currency.is_none() {
                    currency = wire::lookup(point, &["currencyCode"]).and_then(wire::text);
                }
                if let Some(v) = wire::lookup(point, &["reportedValue"]).and_then(wire::number) {
                    by_date.entry(date).or_default().insert(field.clone(), v);
                }
            }
        }
    }

    let derived: &[Derived] = match kind {
        StatementKind::Income => INCOME_DERIVED,
        StatementKind::Balance => BALANCE_DERIVED,
        StatementKind::CashFlow => &[],
    };
    let columns: Vec<String> = kind.series().iter().map(|s| clean_key(s)).collect();

    let rows: Vec<Record> = by_date
        .into_iter()
        .map(|(date, values)| {
            let mut row = Record::new();
            row.insert("asOfDate", Field::Text(date));
            for col in &columns {
                row.insert(col.as_str(), values.get(col).copied());
            }
            schema::derive(&mut row, derived);
            row
        })
        .collect();

    let mut rec = Record::new();
    rec.insert("statements", rows);
    rec.insert("currency", currency);
    Some(rec)
}
