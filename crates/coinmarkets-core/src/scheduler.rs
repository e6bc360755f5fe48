//! Periodic fan-out over all registered adapters.
//!
//! Every cycle spawns one task per adapter, bounds each with its own timeout,
//! joins them all, and publishes the combined records as the next snapshot.
//! A failed, slow or panicking adapter only removes its own records from
//! that generation.
//!
//! # States
//!
//! | From | To | When |
//! |------|----|------|
//! | `Idle` | `Fetching` | a cycle starts |
//! | `Fetching` | `Aggregating` | every adapter task has finished |
//! | `Aggregating` | `Published` | a new generation was swapped in |
//! | `Aggregating` / `Published` | `Idle` | the cycle is over |
//! | any | `Stopping` | cancellation observed |
//! | `Stopping` | `Stopped` | the loop has exited (terminal) |

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::adapter::{ExchangeAdapter, FetchError};
use crate::snapshot::{Snapshot, SnapshotCell};
use crate::{ConfigError, ExchangeName, MarketSummary, UtcDateTime};

/// What to do when no adapter succeeds in a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCyclePolicy {
    /// Publish an empty generation; queries return no markets.
    #[default]
    PublishEmpty,
    /// Keep serving the previous generation.
    RetainPrevious,
}

impl EmptyCyclePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PublishEmpty => "publish_empty",
            Self::RetainPrevious => "retain_previous",
        }
    }
}

impl FromStr for EmptyCyclePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "publish_empty" => Ok(Self::PublishEmpty),
            "retain_previous" => Ok(Self::RetainPrevious),
            other => Err(ConfigError::InvalidValue {
                key: "empty cycle policy",
                value: other.to_owned(),
                reason: "expected 'publish_empty' or 'retain_previous'",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Fetching,
    Aggregating,
    Published,
    Stopping,
    Stopped,
}

impl SchedulerState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Aggregating => "aggregating",
            Self::Published => "published",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub adapter_timeout: Duration,
    pub empty_cycle_policy: EmptyCyclePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            adapter_timeout: Duration::from_secs(10),
            empty_cycle_policy: EmptyCyclePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    Succeeded { records: usize },
    Failed { error: FetchError },
    TimedOut { after: Duration },
    Panicked { message: String },
}

impl AdapterOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Panicked { .. } => "panicked",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterReport {
    pub exchange: ExchangeName,
    pub outcome: AdapterOutcome,
    pub elapsed: Duration,
}

/// Result of one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Generation current after this cycle; unchanged when nothing was published.
    pub generation: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub record_count: usize,
    pub published: bool,
    pub completed_at: UtcDateTime,
    pub adapters: Vec<AdapterReport>,
}

impl CycleReport {
    pub fn is_empty_cycle(&self) -> bool {
        self.succeeded == 0
    }
}

enum TaskResult {
    Fetched(Vec<MarketSummary>),
    Failed(FetchError),
    TimedOut,
    Cancelled,
}

pub struct AggregationScheduler {
    adapters: Vec<Arc<dyn ExchangeAdapter>>,
    cell: Arc<SnapshotCell>,
    config: SchedulerConfig,
    state: watch::Sender<SchedulerState>,
    cycle_lock: Mutex<()>,
}

impl AggregationScheduler {
    pub fn new(
        adapters: Vec<Arc<dyn ExchangeAdapter>>,
        cell: Arc<SnapshotCell>,
        config: SchedulerConfig,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            adapters,
            cell,
            config,
            state,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn adapter_names(&self) -> Vec<ExchangeName> {
        self.adapters.iter().map(|adapter| adapter.name()).collect()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Runs one fetch-aggregate-publish cycle.
    ///
    /// Returns `None` when `cancel` fires before the cycle could publish; the
    /// current snapshot is left untouched in that case.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Option<CycleReport> {
        let _cycle = tokio::select! {
            guard = self.cycle_lock.lock() => guard,
            _ = cancel.cancelled() => {
                self.set_state(SchedulerState::Stopping);
                return None;
            }
        };
        if cancel.is_cancelled() {
            self.set_state(SchedulerState::Stopping);
            return None;
        }

        let started = Instant::now();
        self.set_state(SchedulerState::Fetching);

        let tasks = self
            .adapters
            .iter()
            .map(|adapter| {
                let exchange = adapter.name();
                let adapter = Arc::clone(adapter);
                let cancel = cancel.clone();
                let timeout = self.config.adapter_timeout;
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => TaskResult::Cancelled,
                        fetched = tokio::time::timeout(timeout, adapter.fetch()) => match fetched {
                            Ok(Ok(records)) => TaskResult::Fetched(records),
                            Ok(Err(error)) => TaskResult::Failed(error),
                            Err(_) => TaskResult::TimedOut,
                        },
                    };
                    (result, started.elapsed())
                });
                (exchange, handle)
            })
            .collect::<Vec<_>>();

        let mut records = Vec::new();
        let mut reports = Vec::with_capacity(tasks.len());
        let mut cancelled = false;

        for (exchange, handle) in tasks {
            let (outcome, elapsed) = match handle.await {
                Ok((TaskResult::Fetched(fetched), elapsed)) => {
                    tracing::debug!(
                        exchange = %exchange,
                        records = fetched.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "adapter fetch succeeded"
                    );
                    let outcome = AdapterOutcome::Succeeded {
                        records: fetched.len(),
                    };
                    records.extend(fetched);
                    (outcome, elapsed)
                }
                Ok((TaskResult::Failed(error), elapsed)) => {
                    tracing::warn!(
                        exchange = %exchange,
                        code = error.code(),
                        error = %error,
                        "adapter fetch failed"
                    );
                    (AdapterOutcome::Failed { error }, elapsed)
                }
                Ok((TaskResult::TimedOut, elapsed)) => {
                    tracing::warn!(
                        exchange = %exchange,
                        timeout_ms = self.config.adapter_timeout.as_millis() as u64,
                        "adapter fetch timed out"
                    );
                    let after = self.config.adapter_timeout;
                    (AdapterOutcome::TimedOut { after }, elapsed)
                }
                Ok((TaskResult::Cancelled, _)) => {
                    cancelled = true;
                    continue;
                }
                Err(join_error) => {
                    let message = panic_message(join_error);
                    tracing::warn!(exchange = %exchange, panic = %message, "adapter task panicked");
                    (AdapterOutcome::Panicked { message }, started.elapsed())
                }
            };
            reports.push(AdapterReport {
                exchange,
                outcome,
                elapsed,
            });
        }

        if cancelled || cancel.is_cancelled() {
            tracing::info!("cycle abandoned on shutdown");
            self.set_state(SchedulerState::Stopping);
            return None;
        }

        self.set_state(SchedulerState::Aggregating);
        Some(self.publish(records, reports, started))
    }

    fn publish(
        &self,
        records: Vec<MarketSummary>,
        reports: Vec<AdapterReport>,
        started: Instant,
    ) -> CycleReport {
        let succeeded = reports.iter().filter(|r| r.outcome.is_success()).count();
        let failed = reports.len() - succeeded;
        let record_count = records.len();
        let completed_at = UtcDateTime::now();
        let policy = self.config.empty_cycle_policy;

        if succeeded == 0 {
            tracing::error!(
                event = "empty_cycle",
                adapters = reports.len(),
                policy = policy.as_str(),
                "no adapter succeeded in this cycle"
            );
        }

        let retain = succeeded == 0 && policy == EmptyCyclePolicy::RetainPrevious;
        let published = !retain
            && self.cell.publish(Snapshot::build(
                self.cell.generation() + 1,
                completed_at,
                records,
                reports.clone(),
            ));

        if published {
            self.set_state(SchedulerState::Published);
        }

        let generation = self.cell.generation();
        tracing::info!(
            generation,
            records = record_count,
            succeeded,
            failed,
            published,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle complete"
        );
        self.set_state(SchedulerState::Idle);

        CycleReport {
            generation,
            succeeded,
            failed,
            record_count,
            published,
            completed_at,
            adapters: reports,
        }
    }

    /// Cycles until `cancel` fires, sleeping `interval` between cycles.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            adapters = self.adapters.len(),
            interval_ms = self.config.interval.as_millis() as u64,
            "scheduler started"
        );

        while !cancel.is_cancelled() {
            self.run_cycle(&cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        self.set_state(SchedulerState::Stopping);
        self.set_state(SchedulerState::Stopped);
        tracing::info!(generation = self.cell.generation(), "scheduler stopped");
    }

    fn set_state(&self, next: SchedulerState) {
        self.state.send_if_modified(|current| {
            if *current == SchedulerState::Stopped || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

fn panic_message(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("adapter task panicked")
}
