#![allow(dead_code)]

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use httpmock::{Method::GET, Mock, MockServer};
use url::Url;
use yfinance_ingest::{
    Backoff, HttpRequest, HttpResponse, RetryConfig, Transport, YfClient, YfClientBuilder, YfError,
};

pub const CRUMB: &str = "crumb-value";

pub fn setup_server() -> MockServer {
    MockServer::start()
}

/// Retry policy with the default allowance but near-zero sleeps.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        backoff: Backoff::Fixed(Duration::from_millis(1)),
        ..RetryConfig::default()
    }
}

/// A builder with every URL pointed at `server`.
pub fn builder_for(server: &MockServer) -> YfClientBuilder {
    YfClient::builder()
        .base_url(Url::parse(&server.base_url()).unwrap())
        .cookie_url(Url::parse(&format!("{}/consent", server.base_url())).unwrap())
        .crumb_url(Url::parse(&format!("{}/v1/test/getcrumb", server.base_url())).unwrap())
        .retry_config(fast_retry())
}

/// A client that already holds credentials, so no handshake happens.
pub fn client_for(server: &MockServer) -> YfClient {
    builder_for(server)._preauth("A=B", CRUMB).build().unwrap()
}

pub fn mock_cookie_crumb<'a>(server: &'a MockServer, crumb: &'a str) -> (Mock<'a>, Mock<'a>) {
    let cookie_mock = server.mock(|when, then| {
        when.method(GET).path("/consent");
        then.status(200).header(
            "set-cookie",
            "A=B; Max-Age=315360000; Domain=.yahoo.com; Path=/; Secure; SameSite=None",
        );
    });
    let crumb_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/test/getcrumb");
        then.status(200).body(crumb);
    });
    (cookie_mock, crumb_mock)
}

pub fn financial_data_body(price: f64, revenue: f64) -> String {
    format!(
        r#"{{"quoteSummary":{{"result":[{{"financialData":{{
            "currentPrice":{{"raw":{price},"fmt":"{price}"}},
            "totalRevenue":{{"raw":{revenue},"fmt":"big"}},
            "financialCurrency":"USD"
        }}}}],"error":null}}}}"#
    )
}

pub fn mock_financial_data<'a>(server: &'a MockServer, symbol: &'a str, price: f64) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v10/finance/quoteSummary/{symbol}"))
            .query_param("modules", "financialData")
            .query_param("crumb", CRUMB);
        then.status(200)
            .header("content-type", "application/json")
            .body(financial_data_body(price, 1_000_000.0));
    })
}

/// Transport that answers every request from a closure and counts the calls.
pub struct StubTransport<F> {
    respond: F,
    calls: AtomicUsize,
}

impl<F> StubTransport<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, YfError> + Send + Sync,
{
    pub fn new(respond: F) -> Arc<Self> {
        Arc::new(Self {
            respond,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> Transport for StubTransport<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, YfError> + Send + Sync,
{
    fn send<'a>(
        &'a self,
        req: &'a HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, YfError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = (self.respond)(req);
        Box::pin(async move { out })
    }
}

pub fn connection_refused(req: &HttpRequest) -> YfError {
    YfError::Network {
        url: req.url.to_string(),
        message: "connection refused".into(),
        timeout: false,
    }
}
