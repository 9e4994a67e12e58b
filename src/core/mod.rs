//! Core components of the client.
//!
//! This module contains the foundational building blocks of the library, including:
//! - The main [`YfClient`] and its builder.
//! - The primary [`YfError`] type.
//! - The normalized value model ([`Record`], [`ResultSet`]).
//! - The transport seam and the response cache.

/// The main client (`YfClient`), builder, and configuration.
pub mod client;
/// Response cache implementations.
pub mod cache;
/// The primary error type (`YfError`) for the crate.
pub mod error;
/// Shared data models: locale, date range, normalized records and result sets.
pub mod models;
/// The HTTP transport trait and its `reqwest` implementation.
pub mod net;
pub(crate) mod wire;

// convenient re-exports so most code can just `use crate::core::YfClient`
pub use cache::{DiskCache, MemoryCache, ResponseCache};
pub use client::{Backoff, CacheMode, RetryConfig, YfClient, YfClientBuilder};
pub use error::{FailureKind, FetchFailure, YfError};
pub use models::{
    Country, DateRange, FetchStats, Field, Interval, Record, ResultSet, TickerOutcome,
};
pub use net::{HttpRequest, HttpResponse, Proxies, ReqwestTransport, Transport};
