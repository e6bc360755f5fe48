//! # Coinmarkets Core
//!
//! Currency resolution and multi-exchange market aggregation engine.
//!
//! ## Overview
//!
//! - **Currency registry** keyed by normalized symbol, merging updates from
//!   several naming authorities into one stable identity
//! - **Exchange adapters** behind one fetch contract, each an isolated unit of
//!   failure
//! - **Aggregation scheduler** fanning out to all adapters per cycle with
//!   per-adapter timeouts, then publishing one immutable snapshot
//! - **Market index** by currency and by unordered pair
//! - **Query facade** reading only the latest published snapshot
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Adapter trait and fetch errors |
//! | [`adapters`] | Bundled exchange adapters (Binance) |
//! | [`circuit_breaker`] | Fail-fast guard for upstream calls |
//! | [`config`] | Engine configuration and environment parsing |
//! | [`domain`] | Currency, market and timestamp types |
//! | [`engine`] | Wiring: builder, engine, running handle |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`index`] | Per-snapshot lookup tables |
//! | [`query`] | Read-side facade |
//! | [`registry`] | Canonical currency registry |
//! | [`retry`] | Retry with backoff |
//! | [`scheduler`] | Cycle fan-out and publication |
//! | [`snapshot`] | Published snapshot and its atomic cell |
//! | [`throttle`] | Per-adapter request budget |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coinmarkets_core::{EngineConfig, MarketEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MarketEngine::builder()
//!         .with_config(EngineConfig::from_env()?)
//!         .with_reqwest_binance()
//!         .build()?;
//!
//!     engine.refresh_once().await;
//!     let listing = engine.query().markets("ETH/BTC")?;
//!     for market in &listing.markets {
//!         println!("{} {} last={}", market.exchange, market.pair_label(), market.last);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐      spawn per adapter      ┌──────────────────┐
//! │    Scheduler    │───────────────────────────▶│ ExchangeAdapter  │
//! └────────┬────────┘                             └────────┬─────────┘
//!          │ publish                                       │ resolve
//!          ▼                                               ▼
//! ┌─────────────────┐                             ┌──────────────────┐
//! │  SnapshotCell   │                             │ CurrencyRegistry │
//! │ (ArcSwap)       │                             └────────▲─────────┘
//! └────────┬────────┘                                      │
//!          │ load                                          │ get
//!          ▼                                               │
//! ┌─────────────────┐──────────────────────────────────────┘
//! │   MarketQuery   │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Adapter failures never reach the query side; the scheduler reports them
//! in [`CycleReport`] and logs them.
//!
//! ```rust
//! use coinmarkets_core::{FetchError, FetchErrorKind};
//!
//! fn describe(error: &FetchError) -> &'static str {
//!     match error.kind() {
//!         FetchErrorKind::Timeout | FetchErrorKind::Transport => "network",
//!         FetchErrorKind::MalformedPayload => "upstream changed its format",
//!         _ => "other",
//!     }
//! }
//! # assert_eq!(describe(&FetchError::timeout("slow")), "network");
//! ```

pub mod adapter;
pub mod adapters;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http_client;
pub mod index;
pub mod query;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod snapshot;
pub mod throttle;

// Adapter contract
pub use adapter::{ExchangeAdapter, FetchError, FetchErrorKind, FetchFuture};

// Adapter implementations
pub use adapters::{BinanceAdapter, BinanceConfig};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::EngineConfig;

// Domain models
pub use domain::{
    Currency, CurrencyDetail, CurrencyId, CurrencySymbol, ExchangeName, MarketSummary,
    NewCurrency, PairKey, UtcDateTime,
};

// Engine wiring
pub use engine::{EngineBuilder, EngineHandle, MarketEngine};

// Error types
pub use error::{ConfigError, QueryError, ValidationError};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Read side
pub use index::MarketIndex;
pub use query::{MarketListing, MarketQuery, MarketSelection};

// Registry
pub use registry::{CurrencyRegistry, UnknownAssetPolicy};

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Scheduling
pub use scheduler::{
    AdapterOutcome, AdapterReport, AggregationScheduler, CycleReport, EmptyCyclePolicy,
    SchedulerConfig, SchedulerState,
};
pub use snapshot::{Snapshot, SnapshotCell};

// Throttling
pub use throttle::RequestBudget;

// Re-exported so hosts can drive the scheduler without a direct dependency.
pub use tokio_util::sync::CancellationToken;
