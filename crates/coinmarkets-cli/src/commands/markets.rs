use std::cmp::Ordering;

use serde::Serialize;

use coinmarkets_core::{MarketEngine, MarketListing, MarketSummary, UtcDateTime};

use crate::cli::MarketsArgs;
use crate::error::CliError;

use super::refresh;

#[derive(Debug, Serialize)]
pub struct MarketsResponse {
    title: String,
    generation: u64,
    oldest_update: Option<UtcDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    markets: Vec<MarketRow>,
}

#[derive(Debug, Serialize)]
struct MarketRow {
    exchange: String,
    pair: String,
    last: f64,
    volume: f64,
    quote_volume: f64,
    last_updated: UtcDateTime,
}

impl From<&MarketSummary> for MarketRow {
    fn from(market: &MarketSummary) -> Self {
        Self {
            exchange: market.exchange.to_string(),
            pair: market.pair_label(),
            last: market.last,
            volume: market.volume,
            quote_volume: market.quote_volume(),
            last_updated: market.last_updated,
        }
    }
}

pub async fn run(args: &MarketsArgs, engine: &MarketEngine) -> Result<MarketsResponse, CliError> {
    refresh(engine).await?;
    let listing = engine.query().markets(&args.input)?;
    Ok(to_response(&listing))
}

/// Groups rows by exchange, busiest pairs first.
fn to_response(listing: &MarketListing) -> MarketsResponse {
    let mut markets = listing.markets.iter().collect::<Vec<_>>();
    markets.sort_by(|left, right| {
        left.exchange.cmp(&right.exchange).then_with(|| {
            right
                .quote_volume()
                .partial_cmp(&left.quote_volume())
                .unwrap_or(Ordering::Equal)
        })
    });

    MarketsResponse {
        title: listing.selection.title(),
        generation: listing.generation,
        oldest_update: listing.oldest_update(),
        message: listing.is_empty().then_some("no market details found"),
        markets: markets.into_iter().map(MarketRow::from).collect(),
    }
}
