mod currency;
mod markets;
mod watch;

use std::time::Duration;

use coinmarkets_core::{EngineConfig, MarketEngine};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let config = apply_overrides(EngineConfig::from_env()?, cli)?;
    let engine = MarketEngine::builder()
        .with_config(config)
        .with_reqwest_binance()
        .build()?;

    match &cli.command {
        Command::Markets(args) => output::render(&markets::run(args, &engine).await?, cli.pretty),
        Command::Currency(args) => output::render(&currency::run(args, &engine).await?, cli.pretty),
        Command::Watch(args) => watch::run(args, &engine, cli.pretty).await,
    }
}

fn apply_overrides(mut config: EngineConfig, cli: &Cli) -> Result<EngineConfig, CliError> {
    if let Some(timeout_ms) = cli.timeout_ms {
        config.adapter_timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(policy) = cli.unknown_assets {
        config.unknown_asset_policy = policy.into();
    }
    config.validate()?;
    Ok(config)
}

/// Runs one cycle so the registry and snapshot reflect current exchange data.
async fn refresh(engine: &MarketEngine) -> Result<(), CliError> {
    let report = engine.refresh_once().await.ok_or(CliError::Interrupted)?;
    if report.is_empty_cycle() {
        tracing::warn!("no exchange answered; results may be empty");
    }
    Ok(())
}
