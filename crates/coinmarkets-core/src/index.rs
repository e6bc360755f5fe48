//! Per-snapshot lookup of market records by currency and by unordered pair.
//!
//! An index is built once alongside the snapshot it describes and never
//! mutated afterwards.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{CurrencyId, ExchangeName, MarketSummary, PairKey};

/// Read-side lookup tables over one snapshot's records.
///
/// Holds positions into the snapshot's record slice, never copies of the
/// records, so an index can only ever describe the generation it was built
/// from.
#[derive(Debug, Clone)]
pub struct MarketIndex {
    records: Arc<[MarketSummary]>,
    by_currency: HashMap<CurrencyId, Vec<usize>>,
    by_pair: HashMap<PairKey, Vec<usize>>,
}

impl MarketIndex {
    pub fn build(records: Arc<[MarketSummary]>) -> Self {
        let mut by_currency: HashMap<CurrencyId, Vec<usize>> = HashMap::new();
        let mut by_pair: HashMap<PairKey, Vec<usize>> = HashMap::new();

        for (position, record) in records.iter().enumerate() {
            by_currency.entry(record.base.id).or_default().push(position);
            if record.quote.id != record.base.id {
                by_currency.entry(record.quote.id).or_default().push(position);
            }
            by_pair.entry(record.pair_key()).or_default().push(position);
        }

        Self {
            records,
            by_currency,
            by_pair,
        }
    }

    /// Records where `id` is base or quote. Empty when nothing matches.
    pub fn markets_for(&self, id: CurrencyId) -> Vec<MarketSummary> {
        self.collect(self.by_currency.get(&id))
    }

    /// Records for the unordered pair `{a, b}`; argument order is irrelevant.
    pub fn markets_for_pair(&self, a: CurrencyId, b: CurrencyId) -> Vec<MarketSummary> {
        self.collect(self.by_pair.get(&PairKey::new(a, b)))
    }

    pub fn exchanges(&self) -> Vec<ExchangeName> {
        self.records
            .iter()
            .map(|record| record.exchange.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn currency_count(&self) -> usize {
        self.by_currency.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<MarketSummary> {
        positions
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|position| self.records.get(*position).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
