//! Chart responses: price history with events, and dividend series.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::core::models::{Field, Record};
use crate::core::wire;

/* ---------------- Serde mapping (only what we need) ---------------- */

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChartResult {
    meta: MetaNode,
    timestamp: Vec<Option<i64>>,
    indicators: Indicators,
    events: Events,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct MetaNode {
    currency: Option<String>,
    instrument_type: Option<String>,
    first_trade_date: Option<i64>,
    #[serde(rename = "gmtoffset")]
    gmt_offset: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Indicators {
    quote: Vec<QuoteBlock>,
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct QuoteBlock {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AdjCloseBlock {
    adjclose: Vec<Option<f64>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Events {
    dividends: BTreeMap<String, DividendEvent>,
    splits: BTreeMap<String, SplitEvent>,
}

#[derive(Deserialize)]
struct DividendEvent {
    amount: Option<f64>,
    date: Option<i64>,
}

#[derive(Deserialize)]
struct SplitEvent {
    numerator: Option<f64>,
    denominator: Option<f64>,
    #[serde(rename = "splitRatio")]
    split_ratio: Option<String>,
    date: Option<i64>,
}

/// The per-ticker chart result, or `None` when upstream returned no result.
///
/// A result that is present but shaped unexpectedly still yields a record, with
/// its series empty and its scalars null.
fn chart_result(ticker: &str, body: &Value) -> Option<ChartResult> {
    let results = wire::lookup(body, &["chart", "result"])?;
    let node = wire::select_ticker(results, ticker)?;
    match ChartResult::deserialize(node) {
        Ok(r) => Some(r),
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(ticker, error = %_e, "chart result has an unexpected shape");
            Some(ChartResult::default())
        }
    }
}

fn dated(epoch: Option<i64>) -> Record {
    let mut rec = Record::new();
    rec.insert("date", epoch.map(|d| d as f64));
    rec.insert("formatted_date", epoch.and_then(wire::format_date));
    rec
}

fn at<T: Copy>(series: Option<&Vec<Option<T>>>, i: usize) -> Option<T> {
    series.and_then(|s| s.get(i).copied().flatten())
}

fn price_rows(r: &ChartResult) -> Vec<Record> {
    let q = r.indicators.quote.first();
    let adj = r.indicators.adjclose.first().map(|a| &a.adjclose);

    r.timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| ts.map(|t| (i, t)))
        .map(|(i, ts)| {
            let mut row = dated(Some(ts));
            row.insert("open", at(q.map(|q| &q.open), i));
            row.insert("high", at(q.map(|q| &q.high), i));
            row.insert("low", at(q.map(|q| &q.low), i));
            row.insert("close", at(q.map(|q| &q.close), i));
            row.insert("volume", at(q.map(|q| &q.volume), i));
            row.insert("adjclose", at(adj, i));
            row
        })
        .collect()
}

fn dividend_rows(events: &Events) -> Vec<Record> {
    let mut rows: Vec<(i64, Record)> = events
        .dividends
        .iter()
        .map(|(key, d)| {
            let date = d.date.or_else(|| key.parse().ok());
            let mut row = dated(date);
            row.insert("amount", d.amount);
            (date.unwrap_or(i64::MAX), row)
        })
        .collect();
    rows.sort_by_key(|(d, _)| *d);
    rows.into_iter().map(|(_, r)| r).collect()
}

fn split_rows(events: &Events) -> Vec<Record> {
    let mut rows: Vec<(i64, Record)> = events
        .splits
        .iter()
        .map(|(key, s)| {
            let date = s.date.or_else(|| key.parse().ok());
            let mut row = dated(date);
            row.insert("numerator", s.numerator);
            row.insert("denominator", s.denominator);
            row.insert("splitRatio", s.split_ratio.clone());
            (date.unwrap_or(i64::MAX), row)
        })
        .collect();
    rows.sort_by_key(|(d, _)| *d);
    rows.into_iter().map(|(_, r)| r).collect()
}

/// Price rows plus events data, first trade date, currency, instrument type and time zone.
pub(crate) fn history(ticker: &str, body: &Value) -> Option<Record> {
    let r = chart_result(ticker, body)?;

    let mut events = Record::new();
    events.insert("dividends", dividend_rows(&r.events));
    events.insert("splits", split_rows(&r.events));

    let mut tz = Record::new();
    tz.insert("gmtOffset", r.meta.gmt_offset.map(|o| o as f64));

    let mut rec = Record::new();
    rec.insert("prices", price_rows(&r));
    rec.insert("eventsData", events);
    rec.insert(
        "firstTradeDate",
        r.meta
            .first_trade_date
            .map_or(Field::Null, |d| Field::Nested(dated(Some(d)))),
    );
    rec.insert("currency", r.meta.currency.clone());
    rec.insert("instrumentType", r.meta.instrument_type.clone());
    rec.insert("timeZone", tz);
    Some(rec)
}

/// Dividend events sorted by date, plus the currency.
pub(crate) fn dividends(ticker: &str, body: &Value) -> Option<Record> {
    let r = chart_result(ticker, body)?;
    let mut rec = Record::new();
    rec.insert("dividends", dividend_rows(&r.events));
    rec.insert("currency", r.meta.currency);
    Some(rec)
}
