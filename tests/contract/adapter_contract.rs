use std::time::Duration;

use coinmarkets_core::{
    AdapterOutcome, AggregationScheduler, BinanceAdapter, BinanceConfig, CancellationToken,
    CircuitBreakerConfig, CircuitState, EmptyCyclePolicy, ExchangeAdapter, FetchErrorKind,
    RetryPolicy, SchedulerConfig, SnapshotCell, UnknownAssetPolicy,
};
use coinmarkets_tests::{
    registry_with, Arc, CurrencyRegistry, HangingHttpClient, HttpError, HttpResponse,
    ScriptedHttpClient,
};

const PRODUCT_LISTING: &str = r#"{
    "data": [
        {"symbol": "ETHBTC", "baseAsset": "ETH", "quoteAsset": "BTC", "prevClose": "0.06000000", "volume": "100.00000000", "status": "TRADING"},
        {"symbol": "FUNETH", "baseAsset": "FUN", "quoteAsset": "ETH", "prevClose": 0.0001, "volume": 50000, "status": "TRADING"},
        {"symbol": "BTCUSDT", "baseAsset": "BTC", "quoteAsset": "USDT", "prevClose": "43000.5", "volume": "12.5", "status": "TRADING"},
        {"symbol": "NOPRICE", "baseAsset": "XYZ", "quoteAsset": "BTC", "volume": "1"}
    ]
}"#;

fn binance(
    registry: &Arc<CurrencyRegistry>,
    client: Arc<ScriptedHttpClient>,
    policy: UnknownAssetPolicy,
) -> BinanceAdapter {
    BinanceAdapter::new(
        Arc::clone(registry),
        client,
        BinanceConfig {
            retry: RetryPolicy::fixed(Duration::from_millis(1), 2),
            unknown_assets: policy,
            ..BinanceConfig::default()
        },
    )
}

fn seeded_registry() -> Arc<CurrencyRegistry> {
    registry_with(&[("BTC", "Bitcoin"), ("ETH", "Ethereum"), ("FUN", "FunFair")])
}

#[tokio::test]
async fn records_reference_registry_entities() {
    let registry = seeded_registry();
    let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(PRODUCT_LISTING))]);
    let adapter = binance(&registry, client, UnknownAssetPolicy::Register);

    let records = adapter.fetch().await.expect("listing parses");

    assert_eq!(records.len(), 3, "product without a price is dropped");
    for record in &records {
        assert_eq!(record.exchange, adapter.name());
        let base = registry.get_by_id(record.base.id).expect("base registered");
        let quote = registry.get_by_id(record.quote.id).expect("quote registered");
        assert_eq!(base.symbol, record.base.symbol);
        assert_eq!(quote.symbol, record.quote.symbol);
    }
    assert_eq!(records[0].last, 0.06);
    assert_eq!(records[2].last, 43_000.5);
    assert!(registry.get("XYZ").is_none());
}

#[tokio::test]
async fn unknown_asset_policy_is_applied_consistently() {
    let registry = seeded_registry();
    let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(PRODUCT_LISTING))]);
    let skipping = binance(&registry, client, UnknownAssetPolicy::Skip);

    let records = skipping.fetch().await.expect("listing parses");
    assert_eq!(records.len(), 2);
    assert!(registry.get("USDT").is_none());
    assert_eq!(registry.len(), 3);

    let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(PRODUCT_LISTING))]);
    let registering = binance(&registry, client, UnknownAssetPolicy::Register);

    let records = registering.fetch().await.expect("listing parses");
    assert_eq!(records.len(), 3);
    assert_eq!(registry.get("USDT").map(|c| c.name.clone()), Some(String::from("USDT")));
    assert_eq!(registry.len(), 4);
}

#[tokio::test]
async fn failures_map_to_fetch_error_kinds() {
    let cases = [
        (Ok(HttpResponse::with_status(404, "missing")), FetchErrorKind::UpstreamStatus),
        (Ok(HttpResponse::ok_json("not json")), FetchErrorKind::MalformedPayload),
        (Ok(HttpResponse::ok_json(r#"{"rows": []}"#)), FetchErrorKind::MalformedPayload),
        (Err(HttpError::non_retryable("bad url")), FetchErrorKind::Unavailable),
    ];

    for (response, expected) in cases {
        let registry = seeded_registry();
        let client = ScriptedHttpClient::new(vec![response]);
        let adapter = binance(&registry, Arc::clone(&client), UnknownAssetPolicy::Register);

        let error = adapter.fetch().await.expect_err("must fail");
        assert_eq!(error.kind(), expected, "error {error}");
        assert_eq!(client.calls(), 1, "non-retryable failures are not retried");
        assert_eq!(registry.len(), 3, "failed fetch leaves the registry untouched");
    }
}

#[tokio::test]
async fn retryable_statuses_are_retried_within_one_fetch() {
    let registry = seeded_registry();
    let client = ScriptedHttpClient::new(vec![
        Ok(HttpResponse::with_status(503, "busy")),
        Err(HttpError::timeout("slow")),
        Ok(HttpResponse::ok_json(PRODUCT_LISTING)),
    ]);
    let adapter = binance(&registry, Arc::clone(&client), UnknownAssetPolicy::Register);

    let records = adapter.fetch().await.expect("third attempt succeeds");
    assert_eq!(records.len(), 3);
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn empty_listing_is_a_successful_fetch() {
    let registry = seeded_registry();
    let client = ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(r#"{"data": []}"#))]);
    let adapter = binance(&registry, client, UnknownAssetPolicy::Register);

    let records = adapter.fetch().await.expect("empty data is valid");
    assert!(records.is_empty());
}

#[tokio::test]
async fn scheduler_timeouts_open_the_circuit() {
    let registry = seeded_registry();
    let adapter = Arc::new(BinanceAdapter::new(
        Arc::clone(&registry),
        Arc::new(HangingHttpClient),
        BinanceConfig {
            retry: RetryPolicy::no_retry(),
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 3,
                open_timeout: Duration::from_secs(60),
            },
            ..BinanceConfig::default()
        },
    ));
    let scheduler = AggregationScheduler::new(
        vec![Arc::clone(&adapter) as Arc<dyn ExchangeAdapter>],
        Arc::new(SnapshotCell::new()),
        SchedulerConfig {
            interval: Duration::from_secs(60),
            adapter_timeout: Duration::from_millis(50),
            empty_cycle_policy: EmptyCyclePolicy::RetainPrevious,
        },
    );

    for cycle in 1..=3 {
        let report = scheduler
            .run_cycle(&CancellationToken::new())
            .await
            .expect("cycle completes");
        assert!(
            matches!(report.adapters[0].outcome, AdapterOutcome::TimedOut { .. }),
            "cycle {cycle}: {:?}",
            report.adapters[0].outcome
        );
    }
    assert_eq!(adapter.circuit_breaker().state(), CircuitState::Open);
    assert_eq!(adapter.circuit_breaker().consecutive_failures(), 3);

    let report = scheduler
        .run_cycle(&CancellationToken::new())
        .await
        .expect("cycle completes");
    match &report.adapters[0].outcome {
        AdapterOutcome::Failed { error } => assert_eq!(error.kind(), FetchErrorKind::Unavailable),
        other => panic!("expected the open circuit to refuse the call, got {other:?}"),
    }
}
