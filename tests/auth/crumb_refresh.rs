use crate::common;
use httpmock::Method::GET;
use yfinance_ingest::{
    CacheMode, DataCategory, FailureKind, FetchBuilder, FetchOptions, SummaryModule, fetch_all,
};

fn financial_data() -> DataCategory {
    DataCategory::Module(SummaryModule::FinancialData)
}

#[tokio::test]
async fn stale_crumb_is_refreshed_once_then_succeeds() {
    let server = common::setup_server();
    let stale = server.mock(|when, then| {
        when.method(GET)
            .path("/v10/finance/quoteSummary/AAPL")
            .query_param("crumb", "stale-crumb");
        then.status(401)
            .body(r#"{"finance":{"result":null,"error":{"code":"Unauthorized","description":"Invalid Crumb"}}}"#);
    });
    let fresh = server.mock(|when, then| {
        when.method(GET)
            .path("/v10/finance/quoteSummary/AAPL")
            .query_param("crumb", "fresh-crumb");
        then.status(200)
            .header("content-type", "application/json")
            .body(common::financial_data_body(190.5, 1.0));
    });
    let (cookie_mock, crumb_mock) = common::mock_cookie_crumb(&server, "fresh-crumb");

    let client = common::builder_for(&server)
        ._preauth("cookie", "stale-crumb")
        .build()
        .unwrap();

    let out = fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();

    stale.assert_calls(1);
    fresh.assert_calls(1);
    cookie_mock.assert_calls(1);
    crumb_mock.assert_calls(1);
    assert_eq!(
        out.record("AAPL").and_then(|r| r.number("currentPrice")),
        Some(190.5)
    );
    let stats = client.fetch_stats();
    assert_eq!(stats.handshakes, 1);
    assert_eq!(stats.retries, 1);
}

#[tokio::test]
async fn invalid_crumb_body_on_200_also_triggers_refresh() {
    let server = common::setup_server();
    let stale = server.mock(|when, then| {
        when.method(GET)
            .path("/v10/finance/quoteSummary/AAPL")
            .query_param("crumb", "stale-crumb");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"quoteSummary":{"result":null,"error":{"description":"Invalid Crumb"}}}"#);
    });
    let fresh = server.mock(|when, then| {
        when.method(GET)
            .path("/v10/finance/quoteSummary/AAPL")
            .query_param("crumb", "fresh-crumb");
        then.status(200)
            .header("content-type", "application/json")
            .body(common::financial_data_body(190.5, 1.0));
    });
    let (_cookie_mock, crumb_mock) = common::mock_cookie_crumb(&server, "fresh-crumb");

    let client = common::builder_for(&server)
        ._preauth("cookie", "stale-crumb")
        .build()
        .unwrap();

    let out = fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();

    stale.assert_calls(1);
    fresh.assert_calls(1);
    crumb_mock.assert_calls(1);
    assert!(out.record("AAPL").is_some());
}

#[tokio::test]
async fn concurrent_rejections_share_one_handshake() {
    let server = common::setup_server();
    let tickers = ["AAPL", "GOOG", "IBM", "MSFT", "NVDA"];
    let _stale: Vec<_> = tickers
        .iter()
        .map(|t| {
            server.mock(|when, then| {
                when.method(GET)
                    .path(format!("/v10/finance/quoteSummary/{t}"))
                    .query_param("crumb", "stale-crumb");
                then.status(401);
            })
        })
        .collect();
    let fresh: Vec<_> = tickers
        .iter()
        .map(|t| {
            server.mock(|when, then| {
                when.method(GET)
                    .path(format!("/v10/finance/quoteSummary/{t}"))
                    .query_param("crumb", "fresh-crumb");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(common::financial_data_body(100.0, 1.0));
            })
        })
        .collect();
    let (_cookie_mock, crumb_mock) = common::mock_cookie_crumb(&server, "fresh-crumb");

    let client = common::builder_for(&server)
        ._preauth("cookie", "stale-crumb")
        .build()
        .unwrap();

    let out = FetchBuilder::new(&client, financial_data())
        .tickers(tickers)
        .concurrent(true)
        .cache_mode(CacheMode::Bypass)
        .run()
        .await
        .unwrap();

    crumb_mock.assert_calls(1);
    assert_eq!(client.fetch_stats().handshakes, 1);
    for m in &fresh {
        m.assert_calls(1);
    }
    assert_eq!(out.len(), tickers.len());
    assert!(out.failures().next().is_none());
}

#[tokio::test]
async fn second_rejection_after_refresh_is_an_auth_failure() {
    let server = common::setup_server();
    let api = server.mock(|when, then| {
        when.method(GET).path("/v10/finance/quoteSummary/AAPL");
        then.status(401);
    });
    let (_cookie_mock, crumb_mock) = common::mock_cookie_crumb(&server, "fresh-crumb");

    let client = common::builder_for(&server)
        ._preauth("cookie", "stale-crumb")
        .build()
        .unwrap();

    let out = fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();

    api.assert_calls(2);
    crumb_mock.assert_calls(1);
    let failure = out.get("AAPL").and_then(|o| o.failure()).unwrap();
    assert_eq!(failure.kind, FailureKind::Auth);
}
