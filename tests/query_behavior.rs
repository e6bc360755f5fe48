use coinmarkets_core::{
    Currency, CurrencyRegistry, EngineConfig, ExchangeAdapter, ExchangeName, FetchFuture,
    MarketEngine, MarketQuery, MarketSelection, MarketSummary, QueryError, Snapshot, SnapshotCell,
    UnknownAssetPolicy, UtcDateTime,
};
use coinmarkets_tests::{registry_with, Arc};

struct Listing {
    registry: Arc<CurrencyRegistry>,
    cell: Arc<SnapshotCell>,
    query: MarketQuery,
}

impl Listing {
    fn new() -> Self {
        let registry = registry_with(&[
            ("BTC", "Bitcoin"),
            ("ETH", "Ethereum"),
            ("FUN", "FunFair"),
            ("USDT", "Tether"),
        ]);
        let cell = Arc::new(SnapshotCell::new());
        let query = MarketQuery::new(Arc::clone(&registry), Arc::clone(&cell));
        Self {
            registry,
            cell,
            query,
        }
    }

    fn currency(&self, symbol: &str) -> Arc<Currency> {
        self.registry.get(symbol).expect("seeded currency")
    }

    fn market(&self, base: &str, quote: &str, exchange: &str, last: f64, at: &str) -> MarketSummary {
        MarketSummary::new(
            self.currency(base),
            self.currency(quote),
            ExchangeName::parse(exchange).expect("valid exchange"),
            last,
            1.0,
            UtcDateTime::parse(at).expect("valid timestamp"),
        )
        .expect("valid market")
    }

    fn publish(&self, generation: u64, records: Vec<MarketSummary>) {
        let published = self.cell.publish(Snapshot::build(
            generation,
            UtcDateTime::now(),
            records,
            Vec::new(),
        ));
        assert!(published, "generation {generation} publishes");
    }
}

#[test]
fn same_pair_from_two_exchanges_is_listed_twice() {
    let listing = Listing::new();
    listing.publish(
        1,
        vec![
            listing.market("BTC", "USDT", "Alpha", 43_000.0, "2024-03-01T10:00:00Z"),
            listing.market("BTC", "USDT", "Beta", 43_010.0, "2024-03-01T10:00:05Z"),
        ],
    );

    let btc = listing.currency("BTC");
    let usdt = listing.currency("USDT");
    let markets = listing.query.markets_for_pair(&btc, &usdt);

    let mut exchanges = markets
        .iter()
        .map(|m| m.exchange.as_str().to_owned())
        .collect::<Vec<_>>();
    exchanges.sort();
    assert_eq!(exchanges, ["Alpha", "Beta"]);
    assert_eq!(listing.query.markets_for(&btc).len(), 2);
}

#[test]
fn pair_lookup_is_symmetric() {
    let listing = Listing::new();
    listing.publish(
        1,
        vec![
            listing.market("FUN", "ETH", "Alpha", 0.0001, "2024-03-01T10:00:00Z"),
            listing.market("ETH", "BTC", "Alpha", 0.06, "2024-03-01T10:00:00Z"),
        ],
    );

    let fun = listing.currency("FUN");
    let eth = listing.currency("ETH");
    assert_eq!(
        listing.query.markets_for_pair(&fun, &eth),
        listing.query.markets_for_pair(&eth, &fun)
    );
    assert_eq!(listing.query.markets_for_pair(&eth, &fun).len(), 1);

    let forward = listing.query.markets("ETH/FUN").expect("resolves");
    let backward = listing.query.markets("fun-eth").expect("resolves");
    assert_eq!(forward.markets, backward.markets);
}

#[test]
fn currency_listing_includes_both_sides() {
    let listing = Listing::new();
    listing.publish(
        1,
        vec![
            listing.market("FUN", "ETH", "Alpha", 0.0001, "2024-03-01T10:00:00Z"),
            listing.market("ETH", "BTC", "Beta", 0.06, "2024-03-01T09:58:00Z"),
            listing.market("BTC", "USDT", "Beta", 43_000.0, "2024-03-01T10:01:00Z"),
        ],
    );

    let eth = listing.query.markets("Ethereum").expect("name resolves");
    assert_eq!(eth.selection.title(), "Ethereum (ETH)");
    assert_eq!(eth.len(), 2);
    assert_eq!(
        eth.oldest_update().map(UtcDateTime::format_rfc3339),
        Some(String::from("2024-03-01T09:58:00Z"))
    );
}

#[test]
fn unknown_and_malformed_queries_are_distinguished() {
    let listing = Listing::new();

    assert!(listing.query.currency("DOGE").is_none());
    assert_eq!(
        listing.query.markets("DOGE").map(|l| l.len()),
        Err(QueryError::UnknownCurrency(String::from("DOGE")))
    );
    assert!(matches!(
        listing.query.markets("BTC/ETH/FUN"),
        Err(QueryError::Unparseable { .. })
    ));

    let empty = listing.query.markets("BTC/FUN").expect("both known");
    assert!(empty.is_empty());
    assert!(matches!(empty.selection, MarketSelection::Pair { .. }));
    assert_eq!(empty.generation, 0);
}

#[test]
fn held_snapshot_is_isolated_from_later_publications() {
    let listing = Listing::new();
    listing.publish(
        1,
        vec![listing.market("BTC", "USDT", "Alpha", 43_000.0, "2024-03-01T10:00:00Z")],
    );

    let pinned = listing.query.snapshot();
    listing.publish(
        2,
        vec![
            listing.market("ETH", "USDT", "Alpha", 2_300.0, "2024-03-01T10:01:00Z"),
            listing.market("FUN", "ETH", "Alpha", 0.0001, "2024-03-01T10:01:00Z"),
        ],
    );

    let btc = listing.currency("BTC");
    assert_eq!(pinned.generation, 1);
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned.index.markets_for(btc.id).len(), 1);

    assert_eq!(listing.query.generation(), 2);
    assert!(listing.query.markets_for(&btc).is_empty());
    assert_eq!(listing.query.snapshot().len(), 2);
}

#[test]
fn stale_generation_is_refused() {
    let listing = Listing::new();
    listing.publish(
        2,
        vec![listing.market("BTC", "USDT", "Alpha", 43_000.0, "2024-03-01T10:00:00Z")],
    );

    let refused = listing.cell.publish(Snapshot::build(1, UtcDateTime::now(), Vec::new(), Vec::new()));

    assert!(!refused);
    assert_eq!(listing.query.generation(), 2);
    assert_eq!(listing.query.snapshot().len(), 1);
}

struct FixedExchange {
    registry: Arc<CurrencyRegistry>,
}

impl ExchangeAdapter for FixedExchange {
    fn name(&self) -> ExchangeName {
        ExchangeName::from_static("Fixed")
    }

    fn fetch<'a>(&'a self) -> FetchFuture<'a> {
        Box::pin(async move {
            let now = UtcDateTime::now();
            let mut records = Vec::<MarketSummary>::new();
            for (base, quote, last) in [("FUN", "ETH", 0.0001), ("ETH", "BTC", 0.06)] {
                let (Some(base), Some(quote)) = (
                    self.registry.resolve(base, UnknownAssetPolicy::Register),
                    self.registry.resolve(quote, UnknownAssetPolicy::Register),
                ) else {
                    continue;
                };
                if let Ok(record) = MarketSummary::new(base, quote, self.name(), last, 10.0, now) {
                    records.push(record);
                }
            }
            Ok(records)
        })
    }
}

#[tokio::test]
async fn engine_query_sees_refreshed_markets() {
    let registry = registry_with(&[("FUN", "FunFair")]);

    let engine = MarketEngine::builder()
        .with_config(EngineConfig::default())
        .with_registry(Arc::clone(&registry))
        .with_adapter(Arc::new(FixedExchange {
            registry: Arc::clone(&registry),
        }))
        .build()
        .expect("engine builds");
    let query = engine.query();

    assert!(query.currency("ETH").is_none(), "not known before the first fetch");
    assert!(query.last_updated().is_none());

    let report = engine.refresh_once().await.expect("cycle completes");
    assert_eq!(report.generation, 1);

    let fun = query.markets("FunFair").expect("resolves");
    assert_eq!(fun.len(), 1);
    assert_eq!(fun.markets[0].pair_label(), "FUN/ETH");
    assert_eq!(query.markets("eth").expect("learned from market data").len(), 2);
    assert!(query.last_updated().is_some());
}
