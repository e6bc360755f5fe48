//! # Domain Models
//!
//! Canonical types shared by the registry, the adapters and the query side.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Currency`] | Canonical currency entity owned by the registry |
//! | [`CurrencyId`] | Stable registry identifier |
//! | [`CurrencySymbol`] | Validated, uppercase ticker |
//! | [`CurrencyDetail`] | Enrichment payload (price, market cap, logo) |
//! | [`MarketSummary`] | One exchange's quote for one pair |
//! | [`ExchangeName`] | Exchange tag carried by every record |
//! | [`PairKey`] | Unordered pair of currency ids |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates invariants: a `MarketSummary` with a negative or
//! non-finite price never exists.

mod models;
mod symbol;
mod timestamp;

pub use models::{
    Currency, CurrencyDetail, CurrencyId, ExchangeName, MarketSummary, NewCurrency, PairKey,
};
pub use symbol::CurrencySymbol;
pub use timestamp::UtcDateTime;
