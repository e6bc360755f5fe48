//! Read-only facade for collaborators.
//!
//! Every read loads the current snapshot once and answers from it, so a
//! publish happening mid-call never mixes two generations. Nothing here waits
//! on the scheduler.

use std::sync::Arc;

use serde::Serialize;

use crate::registry::CurrencyRegistry;
use crate::snapshot::{Snapshot, SnapshotCell};
use crate::{Currency, MarketSummary, QueryError, UtcDateTime};

/// Characters accepted between the two sides of a pair, e.g. `ETH/FUN`.
pub const PAIR_SEPARATORS: [char; 4] = ['-', '/', '\\', ','];

/// A resolved market query: one currency or an unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketSelection {
    Currency {
        currency: Arc<Currency>,
    },
    Pair {
        first: Arc<Currency>,
        second: Arc<Currency>,
    },
}

impl MarketSelection {
    pub fn title(&self) -> String {
        match self {
            Self::Currency { currency } => currency.title(),
            Self::Pair { first, second } => format!("{}/{}", first.symbol, second.symbol),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketListing {
    pub selection: MarketSelection,
    pub generation: u64,
    pub markets: Vec<MarketSummary>,
}

impl MarketListing {
    /// Oldest `last_updated` among the listed markets.
    pub fn oldest_update(&self) -> Option<UtcDateTime> {
        self.markets.iter().map(|market| market.last_updated).min()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MarketQuery {
    registry: Arc<CurrencyRegistry>,
    cell: Arc<SnapshotCell>,
}

impl MarketQuery {
    pub fn new(registry: Arc<CurrencyRegistry>, cell: Arc<SnapshotCell>) -> Self {
        Self { registry, cell }
    }

    pub fn currency(&self, symbol_or_name: &str) -> Option<Arc<Currency>> {
        self.registry.get(symbol_or_name)
    }

    pub fn markets_for(&self, currency: &Currency) -> Vec<MarketSummary> {
        self.cell.load().index.markets_for(currency.id)
    }

    pub fn markets_for_pair(&self, a: &Currency, b: &Currency) -> Vec<MarketSummary> {
        self.cell.load().index.markets_for_pair(a.id, b.id)
    }

    /// Pins the current generation for several related reads.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.cell.load()
    }

    pub fn generation(&self) -> u64 {
        self.cell.generation()
    }

    /// Completion time of the current snapshot; `None` before the first publish.
    pub fn last_updated(&self) -> Option<UtcDateTime> {
        self.cell.load().completed_at
    }

    /// Parses `FUN`, `ETH/FUN`, `ETH-FUN`, `ETH\FUN` or `ETH,FUN`.
    pub fn resolve(&self, input: &str) -> Result<MarketSelection, QueryError> {
        let unparseable = || QueryError::Unparseable {
            input: input.to_owned(),
        };

        let parts = input.split(PAIR_SEPARATORS).map(str::trim).collect::<Vec<_>>();
        match parts.as_slice() {
            [single] if !single.is_empty() => Ok(MarketSelection::Currency {
                currency: self.lookup(single)?,
            }),
            [first, second] if !first.is_empty() && !second.is_empty() => {
                Ok(MarketSelection::Pair {
                    first: self.lookup(first)?,
                    second: self.lookup(second)?,
                })
            }
            _ => Err(unparseable()),
        }
    }

    /// Resolves `input` and lists matching markets from one snapshot.
    ///
    /// No matching markets is an empty listing, not an error.
    pub fn markets(&self, input: &str) -> Result<MarketListing, QueryError> {
        let selection = self.resolve(input)?;
        let snapshot = self.cell.load();
        let markets = match &selection {
            MarketSelection::Currency { currency } => snapshot.index.markets_for(currency.id),
            MarketSelection::Pair { first, second } => {
                snapshot.index.markets_for_pair(first.id, second.id)
            }
        };

        Ok(MarketListing {
            selection,
            generation: snapshot.generation,
            markets,
        })
    }

    fn lookup(&self, symbol_or_name: &str) -> Result<Arc<Currency>, QueryError> {
        self.registry
            .get(symbol_or_name)
            .ok_or_else(|| QueryError::UnknownCurrency(symbol_or_name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExchangeName, MarketSummary};

    fn query_with_markets() -> (MarketQuery, Arc<SnapshotCell>) {
        let registry = Arc::new(CurrencyRegistry::new());
        let btc = registry.register("BTC", "Bitcoin", None).expect("valid");
        let eth = registry.register("ETH", "Ethereum", None).expect("valid");
        let fun = registry.register("FUN", "FunFair", None).expect("valid");
        let alpha = ExchangeName::parse("Alpha").expect("valid");
        let older = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid");
        let newer = UtcDateTime::parse("2024-01-01T00:05:00Z").expect("valid");

        let cell = Arc::new(SnapshotCell::new());
        cell.publish(Snapshot::build(
            1,
            newer,
            vec![
                MarketSummary::new(eth.clone(), btc, alpha.clone(), 0.06, 100.0, newer)
                    .expect("valid"),
                MarketSummary::new(fun, eth, alpha, 0.0001, 50_000.0, older).expect("valid"),
            ],
            Vec::new(),
        ));

        (MarketQuery::new(registry, Arc::clone(&cell)), cell)
    }

    #[test]
    fn resolves_single_currency_and_pairs() {
        let (query, _) = query_with_markets();

        assert!(matches!(
            query.resolve("fun"),
            Ok(MarketSelection::Currency { currency }) if currency.symbol.as_str() == "FUN"
        ));
        for input in ["ETH/FUN", "eth-fun", "ETH\\FUN", " ETH , FUN "] {
            assert!(
                matches!(query.resolve(input), Ok(MarketSelection::Pair { .. })),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let (query, _) = query_with_markets();

        for input in ["", "  ", "BTC/ETH/FUN", "BTC/", "/ETH", "BTC-ETH,FUN"] {
            assert_eq!(
                query.resolve(input),
                Err(QueryError::Unparseable {
                    input: input.to_owned()
                }),
                "input {input:?}"
            );
        }
        assert_eq!(
            query.resolve("ETH/NOPE"),
            Err(QueryError::UnknownCurrency(String::from("NOPE")))
        );
    }

    #[test]
    fn listing_reports_oldest_update() {
        let (query, _) = query_with_markets();

        let listing = query.markets("ETH").expect("resolves");
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.generation, 1);
        assert_eq!(
            listing.oldest_update().map(UtcDateTime::format_rfc3339),
            Some(String::from("2024-01-01T00:00:00Z"))
        );

        let pair = query.markets("FUN/BTC").expect("resolves");
        assert!(pair.is_empty());
        assert!(pair.oldest_update().is_none());
    }

    #[test]
    fn last_updated_follows_publication() {
        let registry = Arc::new(CurrencyRegistry::new());
        let cell = Arc::new(SnapshotCell::new());
        let query = MarketQuery::new(registry, Arc::clone(&cell));
        assert!(query.last_updated().is_none());

        let now = UtcDateTime::now();
        cell.publish(Snapshot::build(1, now, Vec::new(), Vec::new()));
        assert_eq!(query.last_updated(), Some(now));
        assert_eq!(query.generation(), 1);
    }
}
