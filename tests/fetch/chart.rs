use crate::common;
use httpmock::Method::GET;
use yfinance_ingest::{
    DataCategory, DateRange, FetchBuilder, Field, FetchOptions, Interval, fetch_all,
};

const CHART: &str = r#"{"chart":{"result":[{
    "meta":{"symbol":"KO","currency":"USD","instrumentType":"EQUITY",
            "firstTradeDate":-252322200,"gmtoffset":-18000},
    "timestamp":[1704205800,1704292200],
    "indicators":{
        "quote":[{"open":[59.5,60.1],"high":[60.2,60.9],"low":[59.1,null],
                  "close":[60.0,60.5],"volume":[12000000,11000000]}],
        "adjclose":[{"adjclose":[58.7,59.2]}]
    },
    "events":{
        "dividends":{"1701302400":{"amount":0.46,"date":1701302400}},
        "splits":{"1336521600":{"date":1336521600,"numerator":2,"denominator":1,"splitRatio":"2:1"}}
    }
}],"error":null}}"#;

#[tokio::test]
async fn history_is_normalized_without_a_crumb() {
    let server = common::setup_server();
    let chart = server.mock(|when, then| {
        when.method(GET)
            .path("/v8/finance/chart/KO")
            .query_param("interval", "1d")
            .query_param("range", "max")
            .query_param("events", "div|split|earn");
        then.status(200)
            .header("content-type", "application/json")
            .body(CHART);
    });
    // No preauth and no cookie/crumb mocks: a handshake would fail the fetch.
    let client = common::builder_for(&server).build().unwrap();

    let out = fetch_all(
        &client,
        ["KO"],
        &DataCategory::History {
            interval: Interval::Daily,
        },
        &FetchOptions::default(),
    )
    .await
    .unwrap();
    chart.assert();
    assert_eq!(client.fetch_stats().handshakes, 0);

    let rec = out.record("KO").unwrap();
    let prices = rec.get("prices").and_then(Field::as_rows).unwrap();
    assert_eq!(prices.len(), 2);
    assert_eq!(prices[0].text("formatted_date"), Some("2024-01-02"));
    assert_eq!(prices[0].number("adjclose"), Some(58.7));
    assert!(prices[1].is_null("low"));
    assert_eq!(rec.text("currency"), Some("USD"));
    assert_eq!(rec.text("instrumentType"), Some("EQUITY"));

    let events = rec.get("eventsData").and_then(Field::as_record).unwrap();
    let splits = events.get("splits").and_then(Field::as_rows).unwrap();
    assert_eq!(splits[0].text("splitRatio"), Some("2:1"));
    assert_eq!(splits[0].text("formatted_date"), Some("2012-05-09"));
}

#[tokio::test]
async fn dividends_use_the_requested_range() {
    let server = common::setup_server();
    let range = DateRange::parse("2023-01-01", "2024-01-01").unwrap();
    let (p1, p2) = range.epoch_bounds();
    let chart = server.mock(|when, then| {
        when.method(GET)
            .path("/v8/finance/chart/KO")
            .query_param("period1", p1.to_string())
            .query_param("period2", p2.to_string())
            .query_param("events", "div");
        then.status(200)
            .header("content-type", "application/json")
            .body(CHART);
    });
    let client = common::builder_for(&server).build().unwrap();

    let out = FetchBuilder::new(
        &client,
        DataCategory::Dividends {
            interval: Interval::Daily,
        },
    )
    .add_ticker("KO")
    .range(range)
    .run()
    .await
    .unwrap();
    chart.assert();

    let rec = out.record("KO").unwrap();
    let divs = rec.get("dividends").and_then(Field::as_rows).unwrap();
    assert_eq!(divs.len(), 1);
    assert_eq!(divs[0].number("amount"), Some(0.46));
    assert_eq!(divs[0].text("formatted_date"), Some("2023-11-30"));
}

#[tokio::test]
async fn unknown_symbol_chart_is_unavailable() {
    let server = common::setup_server();
    server.mock(|when, then| {
        when.method(GET).path("/v8/finance/chart/NOPE");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#);
    });
    let client = common::builder_for(&server).build().unwrap();

    let out = fetch_all(
        &client,
        ["NOPE"],
        &DataCategory::History {
            interval: Interval::Weekly,
        },
        &FetchOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(out.get("NOPE"), Some(&yfinance_ingest::TickerOutcome::Unavailable));
}
