use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapter::ExchangeAdapter;
use crate::adapters::BinanceAdapter;
use crate::config::EngineConfig;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::query::MarketQuery;
use crate::registry::CurrencyRegistry;
use crate::scheduler::{AggregationScheduler, CycleReport, SchedulerState};
use crate::snapshot::SnapshotCell;
use crate::{ConfigError, ExchangeName};

/// Builder for [`MarketEngine`].
///
/// # Example
///
/// ```rust,ignore
/// use coinmarkets_core::{EngineConfig, MarketEngine};
///
/// let engine = MarketEngine::builder()
///     .with_config(EngineConfig::from_env()?)
///     .with_reqwest_binance()
///     .build()?;
///
/// let handle = engine.start();
/// let listing = handle.query().markets("ETH/BTC")?;
/// handle.shutdown().await;
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    registry: Option<Arc<CurrencyRegistry>>,
    adapters: Vec<Arc<dyn ExchangeAdapter>>,
    binance_client: Option<Arc<dyn HttpClient>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a registry an enrichment source already fills.
    pub fn with_registry(mut self, registry: Arc<CurrencyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn ExchangeAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Adds the Binance adapter on top of `http_client`; built against the
    /// final registry in [`build`](Self::build).
    pub fn with_binance(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.binance_client = Some(http_client);
        self
    }

    pub fn with_reqwest_binance(self) -> Self {
        self.with_binance(Arc::new(ReqwestHttpClient::new()))
    }

    pub fn build(self) -> Result<MarketEngine, ConfigError> {
        self.config.validate()?;

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CurrencyRegistry::new()));
        let mut adapters = self.adapters;
        if let Some(http_client) = self.binance_client {
            adapters.push(Arc::new(BinanceAdapter::new(
                Arc::clone(&registry),
                http_client,
                self.config.binance(),
            )));
        }
        if adapters.is_empty() {
            return Err(ConfigError::NoAdapters);
        }

        let cell = Arc::new(SnapshotCell::new());
        let scheduler = Arc::new(AggregationScheduler::new(
            adapters,
            Arc::clone(&cell),
            self.config.scheduler(),
        ));
        tracing::info!(
            adapters = ?scheduler
                .adapter_names()
                .iter()
                .map(ExchangeName::as_str)
                .collect::<Vec<_>>(),
            empty_cycle = self.config.empty_cycle_policy.as_str(),
            unknown_assets = self.config.unknown_asset_policy.as_str(),
            "market engine configured"
        );

        Ok(MarketEngine {
            registry,
            cell,
            scheduler,
            config: self.config,
        })
    }
}

/// Owns the registry, the published snapshot and the scheduler.
pub struct MarketEngine {
    registry: Arc<CurrencyRegistry>,
    cell: Arc<SnapshotCell>,
    scheduler: Arc<AggregationScheduler>,
    config: EngineConfig,
}

impl MarketEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn query(&self) -> MarketQuery {
        MarketQuery::new(Arc::clone(&self.registry), Arc::clone(&self.cell))
    }

    pub fn registry(&self) -> Arc<CurrencyRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn scheduler(&self) -> Arc<AggregationScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Runs a single cycle on the caller's task.
    pub async fn refresh_once(&self) -> Option<CycleReport> {
        self.scheduler.run_cycle(&CancellationToken::new()).await
    }

    /// Spawns the scheduler loop on the current tokio runtime.
    pub fn start(&self) -> EngineHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&self.scheduler).run(cancel.clone()));

        EngineHandle {
            cancel,
            task,
            query: self.query(),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

/// Running scheduler loop. Dropping the handle does not stop the loop; call
/// [`shutdown`](Self::shutdown).
pub struct EngineHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    query: MarketQuery,
    scheduler: Arc<AggregationScheduler>,
}

impl EngineHandle {
    pub fn query(&self) -> MarketQuery {
        self.query.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.scheduler.subscribe_state()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals the loop and waits for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(error) = self.task.await {
            tracing::error!(%error, "scheduler task ended abnormally");
        }
    }
}
