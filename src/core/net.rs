//! The HTTP seam: one GET in, status + headers + body out.
//!
//! Everything above this layer (retries, credentials, caching) talks to a
//! [`Transport`], so tests can swap the network for a stub.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::seq::IndexedRandom;
use url::Url;

use crate::core::YfError;

/// A fully built GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Target URL including the query string.
    pub url: Url,
    /// Extra request headers, applied in order.
    pub headers: Vec<(String, String)>,
    /// Proxy URL for this attempt, if any.
    pub proxy: Option<String>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
            proxy: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What came back for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers with lower-cased names; repeated headers appear repeatedly.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Executes single HTTP attempts. Retry policy lives above this trait.
pub trait Transport: Send + Sync {
    /// Sends one request. Connection failures and timeouts are reported as
    /// [`YfError::Network`]; any HTTP status is a successful send.
    fn send<'a>(
        &'a self,
        req: &'a HttpRequest,
    ) -> core::pin::Pin<
        Box<dyn core::future::Future<Output = Result<HttpResponse, YfError>> + Send + 'a>,
    >;
}

/// Proxy configuration for outbound requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Proxies {
    /// Connect directly.
    #[default]
    None,
    /// Route every request through one proxy.
    Single(String),
    /// Pick a proxy at random for every attempt.
    List(Vec<String>),
}

impl Proxies {
    /// The proxy for the next attempt. Lists are re-drawn on every call.
    pub fn pick(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Single(p) => Some(p.clone()),
            Self::List(list) => list.choose(&mut rand::rng()).cloned(),
        }
    }
}

impl From<&str> for Proxies {
    fn from(p: &str) -> Self {
        Self::Single(p.to_string())
    }
}

impl From<Vec<String>> for Proxies {
    fn from(list: Vec<String>) -> Self {
        match list.len() {
            0 => Self::None,
            _ => Self::List(list),
        }
    }
}

/// [`Transport`] backed by `reqwest`.
///
/// One `reqwest::Client` is built lazily per distinct proxy and then reused, so
/// connection pools survive across requests.
#[derive(Debug)]
pub struct ReqwestTransport {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    clients: Mutex<HashMap<Option<String>, reqwest::Client>>,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>, connect_timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            connect_timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, proxy: Option<&String>) -> Result<reqwest::Client, YfError> {
        let key = proxy.cloned();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(c) = clients.get(&key) {
            return Ok(c.clone());
        }

        let mut builder = reqwest::Client::builder();
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        if let Some(ct) = self.connect_timeout {
            builder = builder.connect_timeout(ct);
        }
        if let Some(p) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(p.as_str())?);
        }
        let client = builder.build()?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(30)), None)
    }
}

fn network_error(url: &Url, e: &reqwest::Error) -> YfError {
    YfError::Network {
        url: url.to_string(),
        message: e.to_string(),
        timeout: e.is_timeout(),
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        req: &'a HttpRequest,
    ) -> core::pin::Pin<
        Box<dyn core::future::Future<Output = Result<HttpResponse, YfError>> + Send + 'a>,
    > {
        Box::pin(async move {
            let client = self.client_for(req.proxy.as_ref())?;
            let mut rb = client.get(req.url.clone());
            for (name, value) in &req.headers {
                rb = rb.header(name.as_str(), value.as_str());
            }

            let resp = rb.send().await.map_err(|e| network_error(&req.url, &e))?;
            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .filter_map(|(k, v)| {
                    v.to_str()
                        .ok()
                        .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let body = resp.text().await.map_err(|e| network_error(&req.url, &e))?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}
