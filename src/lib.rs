//! yfinance-ingest: batch fetching and normalization of Yahoo Finance data.
//!
//! One call takes a set of tickers and a data category and returns a
//! [`ResultSet`] with one [`TickerOutcome`] per distinct ticker. Underneath:
//!
//! - [`endpoint`] maps (ticker, category, locale, range) to a request and a cache fingerprint.
//! - [`YfClient`] owns the transport, the cookie/crumb credentials and the retry loop.
//! - [`decrypt`] turns obfuscated payloads back into JSON.
//! - [`ResponseCache`] keeps decoded bodies, in memory or on disk.
//! - [`normalize()`] reshapes each body into a fixed per-category [`Record`].
//!
//! ```no_run
//! use yfinance_ingest::{DataCategory, FetchBuilder, SummaryModule, YfClient};
//!
//! # async fn run() -> Result<(), yfinance_ingest::YfError> {
//! let client = YfClient::builder().build()?;
//! let results = FetchBuilder::new(&client, DataCategory::Module(SummaryModule::FinancialData))
//!     .tickers(["AAPL", "MSFT"])
//!     .concurrent(true)
//!     .run()
//!     .await?;
//! for (ticker, outcome) in results.iter() {
//!     println!("{ticker}: {:?}", outcome.record().and_then(|r| r.number("currentPrice")));
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod decrypt;
pub mod endpoint;
pub mod fetch;
pub mod normalize;

pub use crate::core::{
    Backoff, CacheMode, Country, DateRange, DiskCache, FailureKind, FetchFailure, FetchStats,
    Field, HttpRequest, HttpResponse, Interval, MemoryCache, Proxies, Record, ReqwestTransport,
    ResponseCache, ResultSet, RetryConfig, TickerOutcome, Transport, YfClient, YfClientBuilder,
    YfError,
};
pub use decrypt::{CryptoJsScheme, DecodeError, Decryptor, PayloadScheme};
pub use endpoint::{
    DataCategory, Endpoint, Endpoints, Fingerprint, Frequency, StatementKind, Subdomain,
    SummaryModule,
};
pub use fetch::{FetchBuilder, FetchOptions, fetch_all, fetch_one};
pub use normalize::normalize;
