use std::sync::Arc;

use serde::Serialize;

use coinmarkets_core::{Currency, ExchangeName, MarketEngine};

use crate::cli::CurrencyArgs;
use crate::error::CliError;

use super::refresh;

#[derive(Debug, Serialize)]
pub struct CurrencyResponse {
    title: String,
    currency: Arc<Currency>,
    market_count: usize,
    exchanges: Vec<ExchangeName>,
}

pub async fn run(args: &CurrencyArgs, engine: &MarketEngine) -> Result<CurrencyResponse, CliError> {
    refresh(engine).await?;

    let query = engine.query();
    let currency = query
        .currency(&args.symbol)
        .ok_or_else(|| CliError::NotFound(args.symbol.clone()))?;
    let markets = query.snapshot().index.markets_for(currency.id);
    let mut exchanges = markets
        .iter()
        .map(|market| market.exchange.clone())
        .collect::<Vec<_>>();
    exchanges.sort();
    exchanges.dedup();

    Ok(CurrencyResponse {
        title: currency.title(),
        market_count: markets.len(),
        currency,
        exchanges,
    })
}
