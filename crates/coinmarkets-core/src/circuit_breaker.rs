use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Circuit state guarding one exchange's upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant, failures: u32 },
    Probing { failures: u32 },
}

impl Phase {
    fn failures(self) -> u32 {
        match self {
            Self::Closed { failures } | Self::Open { failures, .. } | Self::Probing { failures } => {
                failures
            }
        }
    }
}

/// Fails fast after repeated fetch failures so a dead exchange costs one
/// cheap error per cycle instead of a full timeout.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            phase: Mutex::new(Phase::Closed { failures: 0 }),
        }
    }

    /// False while open. Once `open_timeout` has passed exactly one caller is
    /// let through as a trial request; everyone else is refused until it settles.
    pub fn allow_request(&self) -> bool {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Closed { .. } => true,
            Phase::Probing { .. } => false,
            Phase::Open { since, failures } if since.elapsed() >= self.config.open_timeout => {
                *phase = Phase::Probing { failures };
                true
            }
            Phase::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        *self.phase.lock() = Phase::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut phase = self.phase.lock();
        let failures = phase.failures().saturating_add(1);

        *phase = match *phase {
            Phase::Open { since, .. } => Phase::Open { since, failures },
            Phase::Probing { .. } => Phase::Open {
                since: Instant::now(),
                failures,
            },
            Phase::Closed { .. } if failures >= self.config.failure_threshold => {
                tracing::warn!(failures, "circuit opened after consecutive fetch failures");
                Phase::Open {
                    since: Instant::now(),
                    failures,
                }
            }
            Phase::Closed { .. } => Phase::Closed { failures },
        };
    }

    pub fn state(&self) -> CircuitState {
        match *self.phase.lock() {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::Probing { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.phase.lock().failures()
    }
}
