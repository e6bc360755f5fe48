//! Published snapshot and the cell that holds the current one.
//!
//! A [`Snapshot`] is built completely (records and index) before it is handed
//! to [`SnapshotCell::publish`]. Readers call [`SnapshotCell::load`] and keep
//! the returned `Arc` for the whole read, so a concurrent publish never
//! changes what they see.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::index::MarketIndex;
use crate::scheduler::AdapterReport;
use crate::{MarketSummary, UtcDateTime};

/// One immutable generation of aggregated market data.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    /// `None` only for the initial empty snapshot.
    pub completed_at: Option<UtcDateTime>,
    pub records: Arc<[MarketSummary]>,
    pub index: MarketIndex,
    pub adapters: Arc<[AdapterReport]>,
}

impl Snapshot {
    /// Generation 0, visible until the first cycle publishes.
    pub fn empty() -> Self {
        let records: Arc<[MarketSummary]> = Arc::from(Vec::new());
        Self {
            generation: 0,
            completed_at: None,
            index: MarketIndex::build(Arc::clone(&records)),
            records,
            adapters: Arc::from(Vec::new()),
        }
    }

    pub fn build(
        generation: u64,
        completed_at: UtcDateTime,
        records: Vec<MarketSummary>,
        adapters: Vec<AdapterReport>,
    ) -> Self {
        let records: Arc<[MarketSummary]> = Arc::from(records);
        Self {
            generation,
            completed_at: Some(completed_at),
            index: MarketIndex::build(Arc::clone(&records)),
            records,
            adapters: Arc::from(adapters),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Single-writer, many-reader holder of the current snapshot.
#[derive(Debug)]
pub struct SnapshotCell {
    current: ArcSwap<Snapshot>,
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Swaps in `snapshot` unless its generation does not advance the current one.
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        let generation = snapshot.generation;
        let next = Arc::new(snapshot);
        let previous = self.current.rcu(|current| {
            if generation > current.generation {
                Arc::clone(&next)
            } else {
                Arc::clone(current)
            }
        });

        if previous.generation >= generation {
            tracing::warn!(
                generation,
                current = previous.generation,
                "refusing to publish stale snapshot"
            );
            return false;
        }

        tracing::debug!(generation, records = next.len(), "published snapshot");
        true
    }
}
