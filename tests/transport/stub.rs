use crate::common::{self, StubTransport};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use yfinance_ingest::{
    DataCategory, FailureKind, FetchOptions, HttpResponse, Interval, Proxies, RetryConfig,
    SummaryModule, YfClient, fetch_all, fetch_one,
};

fn ok(body: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: vec![("content-type".into(), "application/json".into())],
        body: body.to_string(),
    }
}

fn status(code: u16) -> HttpResponse {
    HttpResponse {
        status: code,
        headers: Vec::new(),
        body: String::new(),
    }
}

fn client_with(transport: Arc<dyn yfinance_ingest::Transport>) -> YfClient {
    YfClient::builder()
        .transport(transport)
        .retry_config(common::fast_retry())
        ._preauth("A=B", common::CRUMB)
        .build()
        .unwrap()
}

const CHART: &str = r#"{"chart":{"result":[{"meta":{"currency":"USD"},"timestamp":[1704205800],
    "indicators":{"quote":[{"close":[60.0]}]}}],"error":null}}"#;

#[tokio::test]
async fn connection_errors_are_retried_up_to_the_allowance() {
    let stub = StubTransport::new(|req| Err(common::connection_refused(req)));
    let client = client_with(stub.clone());

    let out = fetch_all(
        &client,
        ["AAPL"],
        &DataCategory::CurrentPrice,
        &FetchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(stub.calls(), 5);
    let failure = out.get("AAPL").and_then(|o| o.failure()).unwrap();
    assert_eq!(failure.kind, FailureKind::Network);
    assert_eq!(failure.status, None);
}

#[tokio::test]
async fn connection_errors_can_be_excluded_from_retries() {
    let stub = StubTransport::new(|req| Err(common::connection_refused(req)));
    let client = client_with(stub.clone());

    let options = FetchOptions {
        retry: Some(RetryConfig {
            retry_on_connect: false,
            ..common::fast_retry()
        }),
        ..FetchOptions::default()
    };
    fetch_all(&client, ["AAPL"], &DataCategory::CurrentPrice, &options)
        .await
        .unwrap();
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn undecodable_body_is_not_retried() {
    let stub = StubTransport::new(|_| Ok(ok("<html>consent wall</html>")));
    let client = client_with(stub.clone());

    let out = fetch_all(
        &client,
        ["AAPL"],
        &DataCategory::Module(SummaryModule::Price),
        &FetchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(stub.calls(), 1);
    assert_eq!(
        out.get("AAPL").and_then(|o| o.failure()).map(|f| f.kind),
        Some(FailureKind::Decode)
    );
    assert!(client.cache().unwrap().is_empty());
}

#[tokio::test]
async fn chart_request_gains_a_crumb_after_401() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let stub = StubTransport::new(move |req| {
        let has_crumb = req.url.query_pairs().any(|(k, _)| k == "crumb");
        log.lock().unwrap().push(has_crumb);
        Ok(if has_crumb { ok(CHART) } else { status(401) })
    });
    let client = client_with(stub.clone());

    let outcome = fetch_one(
        &client,
        "KO",
        &DataCategory::History {
            interval: Interval::Daily,
        },
        &FetchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(*seen.lock().unwrap(), [false, true]);
    assert!(outcome.record().is_some());
    // Preauthorized credentials were reused rather than refetched.
    assert_eq!(client.fetch_stats().handshakes, 0);
}

#[tokio::test]
async fn requests_carry_user_agent_and_a_proxy_from_the_pool() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let stub = StubTransport::new(move |req| {
        let ua = req
            .headers
            .iter()
            .find(|(k, _)| k == "user-agent")
            .map(|(_, v)| v.clone());
        log.lock().unwrap().push((ua, req.proxy.clone()));
        Ok(ok(CHART))
    });
    let client = YfClient::builder()
        .transport(stub)
        .user_agents(["agent-one"])
        .proxies(vec!["http://p1:8080".to_string(), "http://p2:8080".to_string()])
        .no_cache()
        .build()
        .unwrap();

    let category = DataCategory::Dividends {
        interval: Interval::Daily,
    };
    fetch_all(&client, ["KO", "PEP"], &category, &FetchOptions::default())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for (ua, proxy) in seen.iter() {
        assert_eq!(ua.as_deref(), Some("agent-one"));
        assert!(matches!(
            proxy.as_deref(),
            Some("http://p1:8080" | "http://p2:8080")
        ));
    }
}

#[tokio::test]
async fn per_call_proxies_override_the_client() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let stub = StubTransport::new(move |req| {
        log.lock().unwrap().push(req.proxy.clone());
        Ok(ok(CHART))
    });
    let client = client_with(stub);

    let options = FetchOptions {
        proxies: Some(Proxies::from("http://only:3128")),
        ..FetchOptions::default()
    };
    let category = DataCategory::History {
        interval: Interval::Weekly,
    };
    fetch_all(&client, ["KO"], &category, &options).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), [Some("http://only:3128".to_string())]);
}

#[tokio::test]
async fn minimum_request_interval_spaces_requests() {
    let stub = StubTransport::new(|_| Ok(ok(CHART)));
    let client = YfClient::builder()
        .transport(stub.clone())
        .min_request_interval(Duration::from_millis(40))
        .no_cache()
        .build()
        .unwrap();

    let started = Instant::now();
    let category = DataCategory::History {
        interval: Interval::Daily,
    };
    fetch_all(&client, ["A", "B", "C"], &category, &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(stub.calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn tickers_keep_surrounding_whitespace_as_result_keys() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let stub = StubTransport::new(move |req| {
        log.lock().unwrap().push(req.url.path().to_string());
        Ok(ok(CHART))
    });
    let client = client_with(stub.clone());

    let out = fetch_all(
        &client,
        [" MSFT ", "MSFT"],
        &DataCategory::History {
            interval: Interval::Daily,
        },
        &FetchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(out.tickers().collect::<Vec<_>>(), vec![" MSFT ", "MSFT"]);
    assert!(out.record(" MSFT ").is_some());
    assert_eq!(stub.calls(), 2);
    assert!(
        seen.lock()
            .unwrap()
            .iter()
            .any(|p| p == "/v8/finance/chart/%20MSFT%20")
    );
}
