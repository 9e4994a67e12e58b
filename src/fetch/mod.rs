//! Tickers x category -> per-ticker results.
//!
//! The orchestrator builds one request per ticker, serves it from the response
//! cache when possible, executes it through the client's retry loop otherwise,
//! and normalizes the decoded body. A failure for one ticker becomes that
//! ticker's [`TickerOutcome::Failed`] marker and never aborts the batch.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::core::client::{CacheMode, RetryConfig};
use crate::core::models::{Country, DateRange, ResultSet, TickerOutcome};
use crate::core::net::Proxies;
use crate::core::{FetchFailure, YfClient, YfError};
use crate::endpoint::{DataCategory, Subdomain};
use crate::normalize::normalize;

/// Default number of in-flight requests in concurrent mode.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Per-call options. Unset fields fall back to the client's defaults.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Run one task per ticker instead of a sequential loop. (Default: `false`)
    pub concurrent: bool,
    /// Upper bound on in-flight requests in concurrent mode.
    pub max_concurrency: usize,
    /// Locale; the client's country when `None`.
    pub country: Option<Country>,
    /// Proxies; the client's proxies when `None`.
    pub proxies: Option<Proxies>,
    /// Date range for history, dividends and statements. `None` means all available data.
    pub range: Option<DateRange>,
    /// Force a subdomain instead of the category default.
    pub subdomain: Option<Subdomain>,
    pub cache_mode: CacheMode,
    /// Retry policy; the client's policy when `None`.
    pub retry: Option<RetryConfig>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrent: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            country: None,
            proxies: None,
            range: None,
            subdomain: None,
            cache_mode: CacheMode::Use,
            retry: None,
        }
    }
}

/// Options resolved against the client, shared by every ticker of a batch.
struct Resolved<'a> {
    client: &'a YfClient,
    category: &'a DataCategory,
    country: Country,
    range: Option<&'a DateRange>,
    subdomain: Option<Subdomain>,
    proxies: &'a Proxies,
    retry: &'a RetryConfig,
    cache_mode: CacheMode,
}

impl<'a> Resolved<'a> {
    fn new(client: &'a YfClient, category: &'a DataCategory, options: &'a FetchOptions) -> Self {
        Self {
            client,
            category,
            country: options.country.unwrap_or_else(|| client.country()),
            range: options.range.as_ref().filter(|_| category.uses_range()),
            subdomain: options.subdomain,
            proxies: options.proxies.as_ref().unwrap_or_else(|| client.proxies()),
            retry: options.retry.as_ref().unwrap_or_else(|| client.retry_config()),
            cache_mode: options.cache_mode,
        }
    }

    async fn body(&self, ticker: &str) -> Result<Arc<Value>, YfError> {
        let endpoint = self.client.endpoints().build(
            ticker,
            self.category,
            self.country,
            self.range,
            self.subdomain,
        )?;
        let cache = self.client.cache();

        if self.cache_mode == CacheMode::Use
            && let Some(hit) = cache.and_then(|c| c.get(&endpoint.fingerprint))
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(fingerprint = %endpoint.fingerprint, "cache hit");
            self.client.record_cache_hit();
            return Ok(hit);
        }

        let body = Arc::new(
            self.client
                .execute(&endpoint, self.retry, self.proxies)
                .await?,
        );

        if self.cache_mode != CacheMode::Bypass
            && let Some(c) = cache
        {
            c.put(&endpoint.fingerprint, Arc::clone(&body));
        }
        Ok(body)
    }

    async fn outcome(&self, ticker: &str) -> TickerOutcome {
        match self.body(ticker).await {
            Ok(body) => normalize(self.category, ticker, &body),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(ticker, category = %self.category, error = %e, "fetch failed");
                TickerOutcome::Failed(FetchFailure::from(&e))
            }
        }
    }
}

fn collect_tickers<I, S>(tickers: I) -> Result<BTreeSet<String>, YfError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tickers
        .into_iter()
        .map(|t| {
            let t = t.as_ref();
            if t.trim().is_empty() {
                Err(YfError::InvalidInput("ticker must not be empty".into()))
            } else {
                Ok(t.to_string())
            }
        })
        .collect()
}

/// Fetches `category` for every ticker and returns one outcome per distinct ticker.
///
/// Tickers are used verbatim as request and result keys; exact duplicates
/// collapse into one entry. An empty ticker list yields an empty
/// result set.
///
/// # Errors
///
/// Only invalid input is an error: an empty ticker or an empty module list.
/// Network, HTTP and decode failures are reported per ticker inside the result set.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip(client, tickers, category, options), err, fields(category = %category, concurrent = options.concurrent))
)]
pub async fn fetch_all<I, S>(
    client: &YfClient,
    tickers: I,
    category: &DataCategory,
    options: &FetchOptions,
) -> Result<ResultSet, YfError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    category.validate()?;
    let tickers = collect_tickers(tickers)?;
    let ctx = Resolved::new(client, category, options);
    let mut out = ResultSet::default();

    if options.concurrent {
        let limit = options.max_concurrency.max(1);
        let results: Vec<(String, TickerOutcome)> = stream::iter(tickers)
            .map(|t| {
                let ctx = &ctx;
                async move {
                    let outcome = ctx.outcome(&t).await;
                    (t, outcome)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;
        for (t, outcome) in results {
            out.insert(t, outcome);
        }
    } else {
        for t in tickers {
            let outcome = ctx.outcome(&t).await;
            out.insert(t, outcome);
        }
    }

    Ok(out)
}

/// Fetches one ticker, propagating transport failures instead of wrapping them.
///
/// # Errors
///
/// Returns the underlying [`YfError`] for invalid input or a failed request.
pub async fn fetch_one(
    client: &YfClient,
    ticker: &str,
    category: &DataCategory,
    options: &FetchOptions,
) -> Result<TickerOutcome, YfError> {
    category.validate()?;
    if ticker.trim().is_empty() {
        return Err(YfError::InvalidInput("ticker must not be empty".into()));
    }
    let ctx = Resolved::new(client, category, options);
    let body = ctx.body(ticker).await?;
    Ok(normalize(category, ticker, &body))
}

/// A builder for fetching one category for a list of tickers.
///
/// Mirrors the fields of [`FetchOptions`].
pub struct FetchBuilder {
    client: YfClient,
    category: DataCategory,
    tickers: Vec<String>,
    options: FetchOptions,
}

impl FetchBuilder {
    /// Creates a new `FetchBuilder` for `category`.
    #[must_use]
    pub fn new(client: &YfClient, category: DataCategory) -> Self {
        Self {
            client: client.clone(),
            category,
            tickers: Vec::new(),
            options: FetchOptions::default(),
        }
    }

    /// Replaces the current list of tickers with a new list.
    #[must_use]
    pub fn tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = tickers.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a single ticker.
    #[must_use]
    pub fn add_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.tickers.push(ticker.into());
        self
    }

    /// Fetch with bounded concurrency instead of one ticker at a time.
    #[must_use]
    pub const fn concurrent(mut self, yes: bool) -> Self {
        self.options.concurrent = yes;
        self
    }

    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.options.max_concurrency = n;
        self
    }

    #[must_use]
    pub const fn country(mut self, country: Country) -> Self {
        self.options.country = Some(country);
        self
    }

    #[must_use]
    pub fn proxies(mut self, proxies: impl Into<Proxies>) -> Self {
        self.options.proxies = Some(proxies.into());
        self
    }

    /// Restricts history, dividends and statements to a date range.
    #[must_use]
    pub const fn range(mut self, range: DateRange) -> Self {
        self.options.range = Some(range);
        self
    }

    #[must_use]
    pub const fn subdomain(mut self, subdomain: Subdomain) -> Self {
        self.options.subdomain = Some(subdomain);
        self
    }

    /// Sets the cache mode for all API calls made by this builder.
    #[must_use]
    pub const fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.options.cache_mode = mode;
        self
    }

    /// Overrides the default retry policy for all API calls made by this builder.
    #[must_use]
    pub fn retry_policy(mut self, cfg: Option<RetryConfig>) -> Self {
        self.options.retry = cfg;
        self
    }

    /// Runs the batch.
    ///
    /// # Errors
    ///
    /// See [`fetch_all`].
    pub async fn run(self) -> Result<ResultSet, YfError> {
        fetch_all(&self.client, &self.tickers, &self.category, &self.options).await
    }
}
