use crate::common;
use yfinance_ingest::{
    CacheMode, DataCategory, FetchBuilder, FetchOptions, ResponseCache, SummaryModule, fetch_all,
};

fn financial_data() -> DataCategory {
    DataCategory::Module(SummaryModule::FinancialData)
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "yfinance-ingest-{name}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn second_fetch_is_served_from_cache() {
    let server = common::setup_server();
    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let client = common::client_for(&server);

    let first = fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();
    let second = fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();

    api.assert_calls(1);
    assert_eq!(first, second);
    let stats = client.fetch_stats();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.cached, 1);
}

#[tokio::test]
async fn refresh_skips_the_lookup_but_updates_the_cache() {
    let server = common::setup_server();
    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let client = common::client_for(&server);

    let refresh = FetchOptions {
        cache_mode: CacheMode::Refresh,
        ..FetchOptions::default()
    };
    fetch_all(&client, ["AAPL"], &financial_data(), &refresh)
        .await
        .unwrap();
    fetch_all(&client, ["AAPL"], &financial_data(), &refresh)
        .await
        .unwrap();
    api.assert_calls(2);

    // The refreshed entry is now served to normal callers.
    fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();
    api.assert_calls(2);
}

#[tokio::test]
async fn bypass_neither_reads_nor_writes() {
    let server = common::setup_server();
    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let client = common::client_for(&server);

    let run = |mode| {
        FetchBuilder::new(&client, financial_data())
            .tickers(["AAPL"])
            .cache_mode(mode)
            .run()
    };
    run(CacheMode::Bypass).await.unwrap();
    run(CacheMode::Bypass).await.unwrap();
    api.assert_calls(2);
    assert!(client.cache().unwrap().is_empty());

    run(CacheMode::Use).await.unwrap();
    api.assert_calls(3);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let server = common::setup_server();
    let mut missing = server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/v10/finance/quoteSummary/AAPL");
        then.status(404);
    });
    let client = common::client_for(&server);

    let out = fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();
    assert!(out.get("AAPL").unwrap().is_failed());
    missing.delete();

    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let out = fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();
    api.assert_calls(1);
    assert!(out.record("AAPL").is_some());
}

#[tokio::test]
async fn disabled_cache_always_hits_the_network() {
    let server = common::setup_server();
    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let client = common::builder_for(&server)
        ._preauth("A=B", common::CRUMB)
        .no_cache()
        .build()
        .unwrap();

    for _ in 0..2 {
        fetch_all(&client, ["AAPL"], &financial_data(), &FetchOptions::default())
            .await
            .unwrap();
    }
    api.assert_calls(2);
    assert!(!client.cache_enabled());
}

#[tokio::test]
async fn disk_cache_survives_a_new_client() {
    let dir = temp_dir("disk");

    let server = common::setup_server();
    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let writer = common::builder_for(&server)
        ._preauth("A=B", common::CRUMB)
        .disk_cache(&dir)
        .build()
        .unwrap();
    fetch_all(&writer, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();
    api.assert_calls(1);

    // A fresh server with no mocks: the answer can only come from disk.
    let empty = common::setup_server();
    let reader = common::builder_for(&empty)
        ._preauth("A=B", common::CRUMB)
        .disk_cache(&dir)
        .build()
        .unwrap();
    let out = fetch_all(&reader, ["AAPL"], &financial_data(), &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(
        out.record("AAPL").and_then(|r| r.number("currentPrice")),
        Some(190.5)
    );
    assert_eq!(reader.fetch_stats().cached, 1);

    reader.clear_cache();
    assert!(reader.cache().unwrap().is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}
