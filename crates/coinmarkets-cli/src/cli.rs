//! CLI argument definitions.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `markets` | Markets for a currency (`FUN`) or a pair (`ETH/FUN`) |
//! | `currency` | Registry entry for a symbol or name |
//! | `watch` | Run the scheduler and print each cycle report |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | from env | Per-adapter fetch timeout in ms |
//! | `--unknown-assets` | from env | `register` or `skip` |
//!
//! Everything not given on the command line comes from the
//! `COINMARKETS_*` environment variables.

use clap::{Args, Parser, Subcommand, ValueEnum};

use coinmarkets_core::UnknownAssetPolicy;

#[derive(Debug, Parser)]
#[command(
    name = "coinmarkets",
    author,
    version,
    about = "Multi-exchange crypto market lookup",
    long_about = "Polls exchange adapters, resolves their asset codes to canonical currencies, \
and answers market queries from the latest aggregated snapshot."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-adapter fetch timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// What adapters do with asset codes the registry has never seen.
    #[arg(long, global = true, value_enum)]
    pub unknown_assets: Option<UnknownAssetsArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List markets for one currency or a pair.
    Markets(MarketsArgs),
    /// Show the registry entry for a currency.
    Currency(CurrencyArgs),
    /// Run refresh cycles and print a report after each.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct MarketsArgs {
    /// `FUN`, or a pair separated by one of `- / \ ,` such as `ETH/FUN`.
    pub input: String,
}

#[derive(Debug, Args)]
pub struct CurrencyArgs {
    /// Symbol (case-insensitive) or exact name.
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many cycles; runs until Ctrl-C when omitted.
    #[arg(long)]
    pub cycles: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnknownAssetsArg {
    Register,
    Skip,
}

impl From<UnknownAssetsArg> for UnknownAssetPolicy {
    fn from(value: UnknownAssetsArg) -> Self {
        match value {
            UnknownAssetsArg::Register => Self::Register,
            UnknownAssetsArg::Skip => Self::Skip,
        }
    }
}
