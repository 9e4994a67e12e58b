use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::core::error::FetchFailure;
use crate::core::YfError;

/* ----- LOCALE ----- */

/// Upstream locale, sent as `lang`, `region` and `corsDomain` query parameters.
///
/// The locale changes currency formatting and field localization upstream, so it
/// is part of every request fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Country {
    #[default]
    Us,
    Au,
    Ca,
    Fr,
    De,
    Hk,
    It,
    Es,
    Gb,
    In,
    Br,
    Nz,
    Sg,
    Tw,
}

impl Country {
    /// The `lang` query parameter.
    pub const fn lang(self) -> &'static str {
        match self {
            Self::Us => "en-US",
            Self::Au => "en-AU",
            Self::Ca => "en-CA",
            Self::Fr => "fr-FR",
            Self::De => "de-DE",
            Self::Hk => "zh-Hant-HK",
            Self::It => "it-IT",
            Self::Es => "es-ES",
            Self::Gb => "en-GB",
            Self::In => "en-IN",
            Self::Br => "pt-BR",
            Self::Nz => "en-NZ",
            Self::Sg => "en-SG",
            Self::Tw => "zh-tw",
        }
    }

    /// The `region` query parameter.
    pub const fn region(self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Au => "AU",
            Self::Ca => "CA",
            Self::Fr => "FR",
            Self::De => "DE",
            Self::Hk => "HK",
            Self::It => "IT",
            Self::Es => "ES",
            Self::Gb => "GB",
            Self::In => "IN",
            Self::Br => "BR",
            Self::Nz => "NZ",
            Self::Sg => "SG",
            Self::Tw => "TW",
        }
    }

    /// The `corsDomain` query parameter.
    pub const fn cors_domain(self) -> &'static str {
        match self {
            Self::Us => "finance.yahoo.com",
            Self::Au => "au.finance.yahoo.com",
            Self::Ca => "ca.finance.yahoo.com",
            Self::Fr => "fr.finance.yahoo.com",
            Self::De => "de.finance.yahoo.com",
            Self::Hk => "hk.finance.yahoo.com",
            Self::It => "it.finance.yahoo.com",
            Self::Es => "es.finance.yahoo.com",
            Self::Gb => "uk.finance.yahoo.com",
            Self::In => "in.finance.yahoo.com",
            Self::Br => "br.financas.yahoo.com",
            Self::Nz => "nz.finance.yahoo.com",
            Self::Sg => "sg.finance.yahoo.com",
            Self::Tw => "tw.finance.yahoo.com",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.region())
    }
}

impl FromStr for Country {
    type Err = YfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c = match s.trim().to_ascii_uppercase().as_str() {
            "US" => Self::Us,
            "AU" => Self::Au,
            "CA" => Self::Ca,
            "FR" => Self::Fr,
            "DE" => Self::De,
            "HK" => Self::Hk,
            "IT" => Self::It,
            "ES" => Self::Es,
            "GB" | "UK" => Self::Gb,
            "IN" => Self::In,
            "BR" => Self::Br,
            "NZ" => Self::Nz,
            "SG" => Self::Sg,
            "TW" => Self::Tw,
            other => return Err(YfError::InvalidInput(format!("invalid country: {other}"))),
        };
        Ok(c)
    }
}

/* ----- DATES ----- */

/// An inclusive-start, exclusive-end calendar range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range; `start` must be strictly before `end`.
    ///
    /// # Errors
    ///
    /// Returns [`YfError::InvalidInput`] when `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, YfError> {
        if start >= end {
            return Err(YfError::InvalidInput(
                "invalid date range: start must be before end".into(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parses two `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns [`YfError::InvalidInput`] for unparsable dates or an empty range.
    pub fn parse(start: &str, end: &str) -> Result<Self, YfError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| YfError::InvalidInput(format!("invalid date '{s}': {e}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// `(period1, period2)` epoch-second boundaries at UTC midnight.
    pub fn epoch_bounds(&self) -> (i64, i64) {
        let at_midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc().timestamp();
        (at_midnight(self.start), at_midnight(self.end))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Bar size for history and dividend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Interval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }
}

impl FromStr for Interval {
    type Err = YfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "1d" => Ok(Self::Daily),
            "weekly" | "1wk" => Ok(Self::Weekly),
            "monthly" | "1mo" => Ok(Self::Monthly),
            other => Err(YfError::InvalidInput(format!("invalid interval: {other}"))),
        }
    }
}

/* ----- NORMALIZED RECORDS ----- */

/// A single normalized value.
///
/// `Null` always means "absent upstream"; fetch failures are reported one level
/// up through [`TickerOutcome::Failed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Rows(Vec<Record>),
    Nested(Record),
}

impl Field {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Record]> {
        match self {
            Self::Rows(r) => Some(r),
            _ => None,
        }
    }

    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Nested(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Field {
    fn from(v: Option<f64>) -> Self {
        v.filter(|n| n.is_finite()).map_or(Self::Null, Self::Number)
    }
}

impl From<Option<String>> for Field {
    fn from(v: Option<String>) -> Self {
        v.map_or(Self::Null, Self::Text)
    }
}

/// One ticker's data for one category: a fixed set of named fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Field>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns the field, or `None` when the name is not part of this record's schema.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Numeric value of a field; `None` for null, missing or non-numeric fields.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Field::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Field::as_str)
    }

    /// True when the field exists in the schema but was absent upstream.
    pub fn is_null(&self, name: &str) -> bool {
        self.get(name).is_some_and(Field::is_null)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Record> for Field {
    fn from(r: Record) -> Self {
        Self::Nested(r)
    }
}

impl From<Vec<Record>> for Field {
    fn from(rows: Vec<Record>) -> Self {
        Self::Rows(rows)
    }
}

/// What a batch produced for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum TickerOutcome {
    /// Normalized data; individual fields may still be null.
    Record(Record),
    /// Upstream answered, but the category's top-level path was absent (unknown ticker, no data).
    Unavailable,
    /// The fetch failed after retries; the marker says why.
    Failed(FetchFailure),
}

impl TickerOutcome {
    pub const fn record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub const fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Self::Failed(f) => Some(f),
            _ => None,
        }
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-ticker results of a batch, ordered by ticker.
///
/// The key set always equals the requested ticker set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: BTreeMap<String, TickerOutcome>,
}

impl ResultSet {
    pub(crate) fn insert(&mut self, ticker: String, outcome: TickerOutcome) {
        self.entries.insert(ticker, outcome);
    }

    pub fn get(&self, ticker: &str) -> Option<&TickerOutcome> {
        self.entries.get(ticker)
    }

    /// Shortcut for the record of a ticker that fetched successfully.
    pub fn record(&self, ticker: &str) -> Option<&Record> {
        self.get(ticker).and_then(TickerOutcome::record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TickerOutcome)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Tickers whose fetch failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FetchFailure)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.failure().map(|f| (k.as_str(), f)))
    }
}

impl IntoIterator for ResultSet {
    type Item = (String, TickerOutcome);
    type IntoIter = std::collections::btree_map::IntoIter<String, TickerOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/* ----- STATS ----- */

/// A snapshot of the client's request counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FetchStats {
    /// Logical requests that ended with a usable body.
    pub succeeded: u64,
    /// Logical requests that failed after retries.
    pub failed: u64,
    /// Requests answered from the response cache.
    pub cached: u64,
    /// Extra attempts made by the retry loop.
    pub retries: u64,
    /// Cookie/crumb handshakes performed.
    pub handshakes: u64,
}
