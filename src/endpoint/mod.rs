//! Builds the exact request for a (ticker, category, locale, range) tuple.
//!
//! Everything that decides *which* URL is hit lives here: subdomain choice,
//! path templates, query parameters, whether a crumb must be attached, and the
//! cache fingerprint the response will be stored under.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::YfError;
use crate::core::models::{Country, DateRange, Interval};

/// Earliest `period1` used for time-series requests without an explicit range (1985-08-23).
pub(crate) const TIMESERIES_EPOCH_START: i64 = 493_590_046;

/* ----- CATEGORIES ----- */

/// A quote-summary module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SummaryModule {
    AssetProfile,
    SummaryProfile,
    FinancialData,
    DefaultKeyStatistics,
    SummaryDetail,
    Price,
    QuoteType,
    Earnings,
    EsgScores,
    CalendarEvents,
}

impl SummaryModule {
    /// Upstream module name as sent in `modules=`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssetProfile => "assetProfile",
            Self::SummaryProfile => "summaryProfile",
            Self::FinancialData => "financialData",
            Self::DefaultKeyStatistics => "defaultKeyStatistics",
            Self::SummaryDetail => "summaryDetail",
            Self::Price => "price",
            Self::QuoteType => "quoteType",
            Self::Earnings => "earnings",
            Self::EsgScores => "esgScores",
            Self::CalendarEvents => "calendarEvents",
        }
    }

    pub const ALL: [Self; 10] = [
        Self::AssetProfile,
        Self::SummaryProfile,
        Self::FinancialData,
        Self::DefaultKeyStatistics,
        Self::SummaryDetail,
        Self::Price,
        Self::QuoteType,
        Self::Earnings,
        Self::EsgScores,
        Self::CalendarEvents,
    ];
}

impl fmt::Display for SummaryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryModule {
    type Err = YfError;

    /// Accepts the upstream camelCase name or a kebab/snake alias (`financial-data`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let alias = match folded.as_str() {
            "profile" => Some(Self::AssetProfile),
            "keystatistics" | "keystats" => Some(Self::DefaultKeyStatistics),
            "esg" => Some(Self::EsgScores),
            _ => None,
        };
        alias
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|m| m.as_str().eq_ignore_ascii_case(&folded))
            })
            .ok_or_else(|| YfError::InvalidInput(format!("unknown quote-summary module: {s}")))
    }
}

/// Which financial statement a time-series request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StatementKind {
    Income,
    Balance,
    CashFlow,
}

impl StatementKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Balance => "balance",
            Self::CashFlow => "cash",
        }
    }

    /// Upstream series names without the frequency prefix.
    pub(crate) const fn series(self) -> &'static [&'static str] {
        match self {
            Self::Income => &[
                "TotalRevenue",
                "CostOfRevenue",
                "GrossProfit",
                "OperatingExpense",
                "OperatingIncome",
                "EBIT",
                "InterestExpense",
                "PretaxIncome",
                "TaxProvision",
                "NetIncome",
                "BasicEPS",
                "DilutedEPS",
            ],
            Self::Balance => &[
                "TotalAssets",
                "CurrentAssets",
                "CashAndCashEquivalents",
                "Inventory",
                "AccountsReceivable",
                "TotalLiabilitiesNetMinorityInterest",
                "CurrentLiabilities",
                "TotalDebt",
                "StockholdersEquity",
                "RetainedEarnings",
            ],
            Self::CashFlow => &[
                "OperatingCashFlow",
                "InvestingCashFlow",
                "FinancingCashFlow",
                "CapitalExpenditure",
                "FreeCashFlow",
                "RepurchaseOfCapitalStock",
                "CashDividendsPaid",
                "EndCashPosition",
            ],
        }
    }
}

impl FromStr for StatementKind {
    type Err = YfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" | "income_statement" => Ok(Self::Income),
            "balance" | "balance_sheet" => Ok(Self::Balance),
            "cash" | "cash_flow" | "cashflow" => Ok(Self::CashFlow),
            other => Err(YfError::InvalidInput(format!("unknown statement: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Frequency {
    #[default]
    Annual,
    Quarterly,
}

impl Frequency {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

/// What to fetch for each ticker. Decides the endpoint and the normalization path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DataCategory {
    /// One quote-summary module, normalized to a flat record.
    Module(SummaryModule),
    /// Several modules in a single request; one nested record per module.
    Modules(Vec<SummaryModule>),
    /// Daily/weekly/monthly price history with events.
    History { interval: Interval },
    /// Dividend series only.
    Dividends { interval: Interval },
    /// Current quote snapshot.
    CurrentPrice,
    /// Financial statements from the fundamentals time series.
    Statements {
        statement: StatementKind,
        frequency: Frequency,
    },
}

impl DataCategory {
    /// Rejects categories that can never produce a valid request.
    ///
    /// # Errors
    ///
    /// Returns [`YfError::InvalidInput`] for an empty module list.
    pub fn validate(&self) -> Result<(), YfError> {
        match self {
            Self::Modules(m) if m.is_empty() => Err(YfError::InvalidInput(
                "module list must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Stable text form used in fingerprints and logs.
    pub fn key(&self) -> String {
        match self {
            Self::Module(m) => format!("module:{m}"),
            Self::Modules(ms) => format!("modules:{}", join_modules(ms)),
            Self::History { interval } => format!("history:{}", interval.as_str()),
            Self::Dividends { interval } => format!("dividends:{}", interval.as_str()),
            Self::CurrentPrice => "current-price".to_string(),
            Self::Statements {
                statement,
                frequency,
            } => format!("statements:{}:{}", statement.as_str(), frequency.prefix()),
        }
    }

    /// Subdomain used when the caller does not override it.
    pub const fn default_subdomain(&self) -> Subdomain {
        match self {
            Self::Module(_) | Self::Modules(_) | Self::Statements { .. } => Subdomain::Query2,
            Self::History { .. } | Self::Dividends { .. } | Self::CurrentPrice => {
                Subdomain::Query1
            }
        }
    }

    /// Whether the request must carry a cookie/crumb pair from the start.
    pub const fn requires_crumb(&self) -> bool {
        !matches!(self, Self::History { .. } | Self::Dividends { .. })
    }

    /// Whether a date range changes the request for this category.
    pub const fn uses_range(&self) -> bool {
        matches!(
            self,
            Self::History { .. } | Self::Dividends { .. } | Self::Statements { .. }
        )
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

fn join_modules(ms: &[SummaryModule]) -> String {
    ms.iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// The two API hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subdomain {
    Query1,
    Query2,
}

/* ----- FINGERPRINT ----- */

/// Cache identity of a request: equal fingerprints expect equal responses.
///
/// Subdomain and crumb are deliberately absent; locale and range are not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint {
    pub ticker: String,
    pub category: String,
    pub locale: String,
    pub range: String,
}

impl Fingerprint {
    pub fn new(
        ticker: &str,
        category: &DataCategory,
        country: Country,
        range: Option<&DateRange>,
    ) -> Self {
        let range = match range {
            Some(r) if category.uses_range() => r.to_string(),
            _ => "max".to_string(),
        };
        Self {
            ticker: ticker.to_string(),
            category: category.key(),
            locale: country.region().to_string(),
            range,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.ticker, self.category, self.locale, self.range
        )
    }
}

/* ----- BUILDER ----- */

/// A ready-to-send request description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Full URL including query parameters (without crumb).
    pub url: Url,
    /// Static request headers.
    pub headers: Vec<(String, String)>,
    /// Whether a crumb must be attached before sending.
    pub requires_crumb: bool,
    /// Cache key of the response.
    pub fingerprint: Fingerprint,
}

impl Endpoint {
    /// Query parameters as decoded pairs.
    pub fn query(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

/// Base URLs of both API hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    query1: Url,
    query2: Url,
}

impl Endpoints {
    pub fn new(query1: Url, query2: Url) -> Self {
        Self {
            query1: with_trailing_slash(query1),
            query2: with_trailing_slash(query2),
        }
    }

    const fn base(&self, sub: Subdomain) -> &Url {
        match sub {
            Subdomain::Query1 => &self.query1,
            Subdomain::Query2 => &self.query2,
        }
    }

    /// Builds the request for one ticker.
    ///
    /// # Errors
    ///
    /// Returns [`YfError::InvalidInput`] for an empty ticker or module list.
    pub fn build(
        &self,
        ticker: &str,
        category: &DataCategory,
        country: Country,
        range: Option<&DateRange>,
        subdomain: Option<Subdomain>,
    ) -> Result<Endpoint, YfError> {
        if ticker.trim().is_empty() {
            return Err(YfError::InvalidInput("ticker must not be empty".into()));
        }
        category.validate()?;

        let base = self.base(subdomain.unwrap_or_else(|| category.default_subdomain()));
        let mut url = match category {
            DataCategory::Module(_) | DataCategory::Modules(_) => {
                with_segment(base.join("v10/finance/quoteSummary/")?, ticker)?
            }
            DataCategory::History { .. } | DataCategory::Dividends { .. } => {
                with_segment(base.join("v8/finance/chart/")?, ticker)?
            }
            DataCategory::CurrentPrice => base.join("v7/finance/quote")?,
            DataCategory::Statements { .. } => with_segment(
                base.join("ws/fundamentals-timeseries/v1/finance/timeseries/")?,
                ticker,
            )?,
        };

        {
            let mut qp = url.query_pairs_mut();
            match category {
                DataCategory::Module(m) => {
                    qp.append_pair("modules", m.as_str());
                }
                DataCategory::Modules(ms) => {
                    qp.append_pair("modules", &join_modules(ms));
                }
                DataCategory::History { interval } | DataCategory::Dividends { interval } => {
                    match range {
                        Some(r) => {
                            let (p1, p2) = r.epoch_bounds();
                            qp.append_pair("period1", &p1.to_string());
                            qp.append_pair("period2", &p2.to_string());
                        }
                        None => {
                            qp.append_pair("range", "max");
                        }
                    }
                    qp.append_pair("interval", interval.as_str());
                    let events = if matches!(category, DataCategory::Dividends { .. }) {
                        "div"
                    } else {
                        "div|split|earn"
                    };
                    qp.append_pair("events", events);
                    qp.append_pair("includeAdjustedClose", "true");
                }
                DataCategory::CurrentPrice => {
                    qp.append_pair("symbols", ticker);
                }
                DataCategory::Statements {
                    statement,
                    frequency,
                } => {
                    let types = statement
                        .series()
                        .iter()
                        .map(|s| format!("{}{s}", frequency.prefix()))
                        .collect::<Vec<_>>()
                        .join(",");
                    let (p1, p2) = range.map_or_else(
                        || (TIMESERIES_EPOCH_START, Utc::now().timestamp()),
                        DateRange::epoch_bounds,
                    );
                    qp.append_pair("symbol", ticker);
                    qp.append_pair("type", &types);
                    qp.append_pair("period1", &p1.to_string());
                    qp.append_pair("period2", &p2.to_string());
                    qp.append_pair("merge", "false");
                    qp.append_pair("padTimeSeries", "false");
                }
            }
            qp.append_pair("lang", country.lang());
            qp.append_pair("region", country.region());
            qp.append_pair("corsDomain", country.cors_domain());
        }

        let origin = format!("https://{}", country.cors_domain());
        let headers = vec![
            ("accept".to_string(), "application/json, text/plain, */*".to_string()),
            ("origin".to_string(), origin.clone()),
            ("referer".to_string(), format!("{origin}/quote/{ticker}")),
        ];

        Ok(Endpoint {
            url,
            headers,
            requires_crumb: category.requires_crumb(),
            fingerprint: Fingerprint::new(ticker, category, country, range),
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn with_segment(mut url: Url, segment: &str) -> Result<Url, YfError> {
    if url.cannot_be_a_base() {
        return Err(YfError::InvalidInput(format!(
            "base URL cannot carry a path: {url}"
        )));
    }
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    Ok(url)
}
