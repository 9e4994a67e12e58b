//! Public client surface + builder.
//! Internals are split into `auth` (cookie/crumb), `send` (retry loop),
//! `retry` (policy types) and `constants` (UAs + defaults).

mod auth;
mod constants;
mod retry;
mod send;

pub use retry::{Backoff, CacheMode, RetryConfig};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::core::YfError;
use crate::core::cache::{DiskCache, MemoryCache, ResponseCache};
use crate::core::models::{Country, FetchStats};
use crate::core::net::{Proxies, ReqwestTransport, Transport};
use crate::decrypt::Decryptor;
use crate::endpoint::Endpoints;
use constants::{
    DEFAULT_BASE_QUERY1, DEFAULT_BASE_QUERY2, DEFAULT_COOKIE_URL, DEFAULT_CRUMB_URL, USER_AGENTS,
};

/// Process-scoped cookie/crumb pair.
#[derive(Debug, Clone, Default)]
pub(crate) struct Credentials {
    pub(crate) cookie: Option<String>,
    pub(crate) crumb: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    cached: AtomicU64,
    retries: AtomicU64,
    handshakes: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> FetchStats {
        FetchStats {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            handshakes: self.handshakes.load(Ordering::Relaxed),
        }
    }
}

/// Spaces outbound requests at least `interval` apart.
#[derive(Debug)]
struct Pacer {
    interval: Option<Duration>,
    last: Mutex<Option<tokio::time::Instant>>,
}

/// The shared handle for all requests: transport, credentials, cache and policy.
///
/// Cloning is cheap; clones share credentials, cache and counters.
#[derive(Clone)]
pub struct YfClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    cookie_url: Url,
    crumb_url: Url,

    state: Arc<RwLock<Credentials>>,
    credential_fetch_lock: Arc<Mutex<()>>,

    cache: Option<Arc<dyn ResponseCache>>,
    decryptor: Arc<Decryptor>,
    retry: RetryConfig,
    user_agents: Arc<[String]>,
    country: Country,
    proxies: Proxies,

    counters: Arc<Counters>,
    pacer: Arc<Pacer>,
}

impl std::fmt::Debug for YfClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YfClient")
            .field("endpoints", &self.endpoints)
            .field("cookie_url", &self.cookie_url.as_str())
            .field("crumb_url", &self.crumb_url.as_str())
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .field("country", &self.country)
            .field("proxies", &self.proxies)
            .finish_non_exhaustive()
    }
}

impl YfClient {
    /// Create a new builder.
    pub fn builder() -> YfClientBuilder {
        YfClientBuilder::default()
    }

    /// The endpoint builder configured with this client's base URLs.
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Locale used when a fetch does not specify one.
    pub const fn country(&self) -> Country {
        self.country
    }

    /// Proxies used when a fetch does not specify any.
    pub const fn proxies(&self) -> &Proxies {
        &self.proxies
    }

    /// The client's default retry policy.
    pub const fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn cache(&self) -> Option<&Arc<dyn ResponseCache>> {
        self.cache.as_ref()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        if let Some(c) = &self.cache {
            c.clear();
        }
    }

    /// Counters for requests made through this client (and its clones).
    pub fn fetch_stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    pub(crate) fn record_cache_hit(&self) {
        self.counters.cached.fetch_add(1, Ordering::Relaxed);
    }
}

/* ----------------------- Builder ----------------------- */

#[derive(Debug, Clone)]
enum CacheChoice {
    Memory,
    Disk(PathBuf),
    Custom(Arc<dyn ResponseCache>),
    Off,
}

pub struct YfClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    user_agents: Option<Vec<String>>,
    base_query1: Option<Url>,
    base_query2: Option<Url>,
    cookie_url: Option<Url>,
    crumb_url: Option<Url>,
    preauth_cookie: Option<String>,
    preauth_crumb: Option<String>,

    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    cache: CacheChoice,
    decryptor: Option<Decryptor>,
    country: Country,
    proxies: Proxies,
    min_request_interval: Option<Duration>,
}

impl Default for YfClientBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            user_agents: None,
            base_query1: None,
            base_query2: None,
            cookie_url: None,
            crumb_url: None,
            preauth_cookie: None,
            preauth_crumb: None,
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: None,
            retry: None,
            cache: CacheChoice::Memory,
            decryptor: None,
            country: Country::default(),
            proxies: Proxies::None,
            min_request_interval: None,
        }
    }
}

impl YfClientBuilder {
    /// Replace the HTTP layer (e.g. with a recording or stub transport).
    /// Timeouts set on the builder only apply to the default transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override the User-Agent pool. One entry is drawn at random per request.
    pub fn user_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_agents = Some(agents.into_iter().map(Into::into).collect());
        self
    }

    /// Override the first API host (e.g., `https://query1.finance.yahoo.com/`).
    pub fn base_query1(mut self, url: Url) -> Self {
        self.base_query1 = Some(url);
        self
    }

    /// Override the second API host (e.g., `https://query2.finance.yahoo.com/`).
    pub fn base_query2(mut self, url: Url) -> Self {
        self.base_query2 = Some(url);
        self
    }

    /// Point both API hosts at the same base; handy for mock servers.
    pub fn base_url(self, url: Url) -> Self {
        self.base_query1(url.clone()).base_query2(url)
    }

    /// Override the cookie bootstrap URL.
    pub fn cookie_url(mut self, url: Url) -> Self {
        self.cookie_url = Some(url);
        self
    }

    /// Override the crumb URL.
    pub fn crumb_url(mut self, url: Url) -> Self {
        self.crumb_url = Some(url);
        self
    }

    #[doc(hidden)]
    /// Seed credentials so the first request skips the cookie/crumb handshake.
    pub fn _preauth(mut self, cookie: impl Into<String>, crumb: impl Into<String>) -> Self {
        self.preauth_cookie = Some(cookie.into());
        self.preauth_crumb = Some(crumb.into());
        self
    }

    /// Set a global request timeout (overall). Default: 30 s.
    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Set a connect timeout. Default: none.
    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Set the default retry policy.
    pub fn retry_config(mut self, cfg: RetryConfig) -> Self {
        self.retry = Some(cfg);
        self
    }

    /// Keep decoded responses in memory for the life of the client. (Default)
    pub fn memory_cache(mut self) -> Self {
        self.cache = CacheChoice::Memory;
        self
    }

    /// Persist decoded responses under `dir`, one file per fingerprint.
    pub fn disk_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = CacheChoice::Disk(dir.into());
        self
    }

    /// Use a caller-provided cache implementation.
    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = CacheChoice::Custom(cache);
        self
    }

    /// Disable response caching entirely.
    pub fn no_cache(mut self) -> Self {
        self.cache = CacheChoice::Off;
        self
    }

    /// Replace the payload decryptor (e.g. to register additional schemes).
    pub fn decryptor(mut self, decryptor: Decryptor) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    /// Default locale for fetches that do not set one.
    pub fn country(mut self, country: Country) -> Self {
        self.country = country;
        self
    }

    /// Default proxies for fetches that do not set any.
    pub fn proxies(mut self, proxies: impl Into<Proxies>) -> Self {
        self.proxies = proxies.into();
        self
    }

    /// Keep at least `dur` between consecutive outbound requests. Default: off.
    pub fn min_request_interval(mut self, dur: Duration) -> Self {
        self.min_request_interval = Some(dur);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if a default URL fails to parse, the disk cache
    /// directory cannot be created, or the UA pool is empty.
    pub fn build(self) -> Result<YfClient, YfError> {
        let base_query1 = match self.base_query1 {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_QUERY1)?,
        };
        let base_query2 = match self.base_query2 {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_QUERY2)?,
        };
        let cookie_url = match self.cookie_url {
            Some(u) => u,
            None => Url::parse(DEFAULT_COOKIE_URL)?,
        };
        let crumb_url = match self.crumb_url {
            Some(u) => u,
            None => Url::parse(DEFAULT_CRUMB_URL)?,
        };

        let user_agents: Vec<String> = self
            .user_agents
            .unwrap_or_else(|| USER_AGENTS.iter().map(|s| (*s).to_string()).collect());
        if user_agents.is_empty() {
            return Err(YfError::InvalidInput("user-agent pool is empty".into()));
        }

        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.timeout, self.connect_timeout)),
        };

        let cache: Option<Arc<dyn ResponseCache>> = match self.cache {
            CacheChoice::Memory => Some(Arc::new(MemoryCache::new())),
            CacheChoice::Disk(dir) => Some(Arc::new(DiskCache::open(dir)?)),
            CacheChoice::Custom(c) => Some(c),
            CacheChoice::Off => None,
        };

        Ok(YfClient {
            transport,
            endpoints: Endpoints::new(base_query1, base_query2),
            cookie_url,
            crumb_url,
            state: Arc::new(RwLock::new(Credentials {
                cookie: self.preauth_cookie,
                crumb: self.preauth_crumb,
            })),
            credential_fetch_lock: Arc::new(Mutex::new(())),
            cache,
            decryptor: Arc::new(self.decryptor.unwrap_or_default()),
            retry: self.retry.unwrap_or_default(),
            user_agents: user_agents.into(),
            country: self.country,
            proxies: self.proxies,
            counters: Arc::new(Counters::default()),
            pacer: Arc::new(Pacer {
                interval: self.min_request_interval,
                last: Mutex::new(None),
            }),
        })
    }
}
