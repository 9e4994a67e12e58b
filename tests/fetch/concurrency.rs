use crate::common;
use yfinance_ingest::{CacheMode, DataCategory, FetchBuilder, SummaryModule};

const TICKERS: [&str; 4] = ["AAPL", "GOOG", "IBM", "MSFT"];

#[tokio::test]
async fn concurrent_and_sequential_runs_agree() {
    let server = common::setup_server();
    let mocks: Vec<_> = TICKERS
        .iter()
        .zip([190.5, 140.25, 180.0, 410.75])
        .map(|(t, p)| common::mock_financial_data(&server, t, p))
        .collect();
    let client = common::client_for(&server);

    let batch = |concurrent| {
        FetchBuilder::new(&client, DataCategory::Module(SummaryModule::FinancialData))
            .tickers(TICKERS)
            .concurrent(concurrent)
            .max_concurrency(2)
            .cache_mode(CacheMode::Bypass)
            .run()
    };
    let sequential = batch(false).await.unwrap();
    let concurrent = batch(true).await.unwrap();

    for m in &mocks {
        m.assert_calls(2);
    }
    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent.tickers().collect::<Vec<_>>(), TICKERS);
    assert_eq!(
        concurrent.record("IBM").and_then(|r| r.number("currentPrice")),
        Some(180.0)
    );
}

#[tokio::test]
async fn duplicate_tickers_are_fetched_once() {
    let server = common::setup_server();
    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let client = common::client_for(&server);

    let out = FetchBuilder::new(&client, DataCategory::Module(SummaryModule::FinancialData))
        .tickers(["AAPL", "AAPL"])
        .add_ticker("AAPL")
        .concurrent(true)
        .cache_mode(CacheMode::Bypass)
        .run()
        .await
        .unwrap();

    api.assert_calls(1);
    assert_eq!(out.len(), 1);
}
