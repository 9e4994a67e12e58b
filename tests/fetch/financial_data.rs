use crate::common;
use httpmock::Method::GET;
use yfinance_ingest::{
    DataCategory, FetchOptions, Field, SummaryModule, TickerOutcome, fetch_all,
};

#[tokio::test]
async fn financial_data_is_normalized_with_nulls_for_missing_fields() {
    let server = common::setup_server();
    let api = common::mock_financial_data(&server, "AAPL", 190.5);
    let client = common::client_for(&server);

    let out = fetch_all(
        &client,
        ["AAPL"],
        &DataCategory::Module(SummaryModule::FinancialData),
        &FetchOptions::default(),
    )
    .await
    .unwrap();
    api.assert();

    let rec = out.record("AAPL").expect("record for AAPL");
    assert_eq!(rec.number("currentPrice"), Some(190.5));
    assert_eq!(rec.number("totalRevenue"), Some(1_000_000.0));
    assert_eq!(rec.text("financialCurrency"), Some("USD"));
    // Every schema field is present even when upstream omitted it.
    assert!(rec.contains("ebitda"));
    assert!(rec.is_null("ebitda"));
    assert!(rec.is_null("freeCashflowMargin"));
}

#[tokio::test]
async fn omitted_price_and_revenue_are_null() {
    let server = common::setup_server();
    let api = server.mock(|when, then| {
        when.method(GET)
            .path("/v10/finance/quoteSummary/AAPL")
            .query_param("modules", "financialData")
            .query_param("crumb", common::CRUMB);
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"{"quoteSummary":{"result":[{"financialData":{
                    "ebitda":{"raw":130000000000,"fmt":"130B"},
                    "financialCurrency":"USD"
                }}],"error":null}}"#,
            );
    });
    let client = common::client_for(&server);

    let out = fetch_all(
        &client,
        ["AAPL"],
        &DataCategory::Module(SummaryModule::FinancialData),
        &FetchOptions::default(),
    )
    .await
    .unwrap();
    api.assert();

    let rec = out.record("AAPL").expect("record for AAPL");
    assert_eq!(rec.get("currentPrice"), Some(&Field::Null));
    assert_eq!(rec.get("totalRevenue"), Some(&Field::Null));
    assert_eq!(rec.number("ebitda"), Some(130_000_000_000.0));
}

#[tokio::test]
async fn missing_module_marks_ticker_unavailable() {
    let server = common::setup_server();
    let api = server.mock(|when, then| {
        when.method(GET)
            .path("/v10/finance/quoteSummary/NOPE")
            .query_param("crumb", common::CRUMB);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"quoteSummary":{"result":[{}],"error":null}}"#);
    });
    let client = common::client_for(&server);

    let out = fetch_all(
        &client,
        ["NOPE"],
        &DataCategory::Module(SummaryModule::FinancialData),
        &FetchOptions::default(),
    )
    .await
    .unwrap();
    api.assert();
    assert_eq!(out.get("NOPE"), Some(&TickerOutcome::Unavailable));
}

#[tokio::test]
async fn several_modules_in_one_request() {
    let server = common::setup_server();
    let api = server.mock(|when, then| {
        when.method(GET)
            .path("/v10/finance/quoteSummary/MSFT")
            .query_param("modules", "financialData,price")
            .query_param("crumb", common::CRUMB);
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"{"quoteSummary":{"result":[{
                    "financialData":{"currentPrice":{"raw":410.0}},
                    "price":{"currency":"USD","regularMarketPrice":{"raw":410.0}}
                }],"error":null}}"#,
            );
    });
    let client = common::client_for(&server);

    let category = DataCategory::Modules(vec![SummaryModule::FinancialData, SummaryModule::Price]);
    let out = fetch_all(&client, ["MSFT"], &category, &FetchOptions::default())
        .await
        .unwrap();
    api.assert();

    let rec = out.record("MSFT").unwrap();
    let fin = rec.get("financialData").and_then(Field::as_record).unwrap();
    assert_eq!(fin.number("currentPrice"), Some(410.0));
    let price = rec.get("price").and_then(Field::as_record).unwrap();
    assert_eq!(price.text("currency"), Some("USD"));
}
