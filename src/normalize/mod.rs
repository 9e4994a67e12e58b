//! Decoded JSON to a fixed per-ticker record.
//!
//! Each category has an explicit schema. Missing leaves become [`Field::Null`]
//! and never fail; only a missing top-level node makes the ticker
//! [`TickerOutcome::Unavailable`].
//!
//! [`Field::Null`]: crate::Field::Null

mod chart;
mod quote;
mod schema;
mod timeseries;

use serde_json::Value;

use crate::core::models::TickerOutcome;
use crate::endpoint::DataCategory;

/// Normalizes the decoded body of `category` for `ticker`.
///
/// Both the "ticker inside a result list" and "ticker as an object key" outer
/// shapes are accepted.
pub fn normalize(category: &DataCategory, ticker: &str, body: &Value) -> TickerOutcome {
    let record = match category {
        DataCategory::Module(m) => quote::module(*m, ticker, body),
        DataCategory::Modules(ms) => quote::modules(ms, ticker, body),
        DataCategory::History { .. } => chart::history(ticker, body),
        DataCategory::Dividends { .. } => chart::dividends(ticker, body),
        DataCategory::CurrentPrice => quote::current_price(ticker, body),
        DataCategory::Statements { statement, .. } => {
            timeseries::statements(*statement, ticker, body)
        }
    };
    record.map_or(TickerOutcome::Unavailable, TickerOutcome::Record)
}
