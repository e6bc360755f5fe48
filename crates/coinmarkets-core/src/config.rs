//! Engine configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `COINMARKETS_REFRESH_INTERVAL_SECS` | `60` | Pause between cycles |
//! | `COINMARKETS_ADAPTER_TIMEOUT_MS` | `10000` | Per-adapter fetch budget |
//! | `COINMARKETS_EMPTY_CYCLE` | `publish_empty` | `publish_empty` or `retain_previous` |
//! | `COINMARKETS_UNKNOWN_ASSETS` | `register` | `register` or `skip` |
//! | `COINMARKETS_BINANCE_ENDPOINT` | public product URL | Binance listing endpoint |

use std::str::FromStr;
use std::time::Duration;

use crate::adapters::BinanceConfig;
use crate::registry::UnknownAssetPolicy;
use crate::scheduler::{EmptyCyclePolicy, SchedulerConfig};
use crate::ConfigError;

pub const ENV_REFRESH_INTERVAL_SECS: &str = "COINMARKETS_REFRESH_INTERVAL_SECS";
pub const ENV_ADAPTER_TIMEOUT_MS: &str = "COINMARKETS_ADAPTER_TIMEOUT_MS";
pub const ENV_EMPTY_CYCLE: &str = "COINMARKETS_EMPTY_CYCLE";
pub const ENV_UNKNOWN_ASSETS: &str = "COINMARKETS_UNKNOWN_ASSETS";
pub const ENV_BINANCE_ENDPOINT: &str = "COINMARKETS_BINANCE_ENDPOINT";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub refresh_interval: Duration,
    pub adapter_timeout: Duration,
    pub empty_cycle_policy: EmptyCyclePolicy,
    /// Applied to every bundled adapter, overriding the adapter's own setting.
    pub unknown_asset_policy: UnknownAssetPolicy,
    pub binance: BinanceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            refresh_interval: scheduler.interval,
            adapter_timeout: scheduler.adapter_timeout,
            empty_cycle_policy: scheduler.empty_cycle_policy,
            unknown_asset_policy: UnknownAssetPolicy::default(),
            binance: BinanceConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(raw) = get(ENV_REFRESH_INTERVAL_SECS) {
            config.refresh_interval = Duration::from_secs(parse_number(ENV_REFRESH_INTERVAL_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_ADAPTER_TIMEOUT_MS) {
            config.adapter_timeout = Duration::from_millis(parse_number(ENV_ADAPTER_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_EMPTY_CYCLE) {
            config.empty_cycle_policy = EmptyCyclePolicy::from_str(&raw)?;
        }
        if let Some(raw) = get(ENV_UNKNOWN_ASSETS) {
            config.unknown_asset_policy = UnknownAssetPolicy::from_str(&raw)?;
        }
        if let Some(raw) = get(ENV_BINANCE_ENDPOINT) {
            if !raw.starts_with("http://") && !raw.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    key: ENV_BINANCE_ENDPOINT,
                    value: raw,
                    reason: "expected an http(s) URL",
                });
            }
            config.binance.endpoint = raw;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "refresh_interval",
            });
        }
        if self.adapter_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "adapter_timeout",
            });
        }
        if self.binance.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "binance.request_timeout",
            });
        }

        // Retries have to finish before the scheduler gives up on the fetch.
        let worst_case = self.binance.worst_case_fetch();
        if worst_case >= self.adapter_timeout {
            return Err(ConfigError::FetchExceedsTimeout {
                worst_case_ms: worst_case.as_millis() as u64,
                adapter_timeout_ms: self.adapter_timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.refresh_interval,
            adapter_timeout: self.adapter_timeout,
            empty_cycle_policy: self.empty_cycle_policy,
        }
    }

    pub fn binance(&self) -> BinanceConfig {
        BinanceConfig {
            unknown_assets: self.unknown_asset_policy,
            ..self.binance.clone()
        }
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_owned(),
        reason: "expected a non-negative integer",
    })
}
