use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CurrencySymbol, UtcDateTime, ValidationError};

/// Stable registry identifier. Assigned once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyId(u64);

impl CurrencyId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for CurrencyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enrichment data attached to a currency by a listing source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyDetail {
    pub price_usd: Option<f64>,
    pub price_btc: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub rank: Option<u32>,
    pub url: Option<String>,
    pub logo_url: Option<String>,
}

impl CurrencyDetail {
    /// Field-wise merge: every `Some` in `newer` overwrites.
    pub fn merge_from(&mut self, newer: &CurrencyDetail) {
        fn take<T: Clone>(slot: &mut Option<T>, newer: &Option<T>) {
            if let Some(value) = newer {
                *slot = Some(value.clone());
            }
        }

        take(&mut self.price_usd, &newer.price_usd);
        take(&mut self.price_btc, &newer.price_btc);
        take(&mut self.market_cap_usd, &newer.market_cap_usd);
        take(&mut self.volume_24h_usd, &newer.volume_24h_usd);
        take(&mut self.percent_change_24h, &newer.percent_change_24h);
        take(&mut self.rank, &newer.rank);
        take(&mut self.url, &newer.url);
        take(&mut self.logo_url, &newer.logo_url);
    }
}

/// Canonical currency entity owned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub symbol: CurrencySymbol,
    pub name: String,
    pub detail: Option<CurrencyDetail>,
    pub image_url: Option<String>,
}

impl Currency {
    /// Display title, e.g. `FunFair (FUN)`.
    pub fn title(&self) -> String {
        if self.name.is_empty() || self.name.eq_ignore_ascii_case(self.symbol.as_str()) {
            return self.symbol.to_string();
        }
        format!("{} ({})", self.name, self.symbol)
    }
}

/// Registration payload for enrichment sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCurrency {
    pub symbol: String,
    pub name: Option<String>,
    pub detail: Option<CurrencyDetail>,
    pub image_url: Option<String>,
}

impl NewCurrency {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_detail(mut self, detail: CurrencyDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Exchange identifier used to tag market records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExchangeName(String);

impl ExchangeName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyExchangeName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// For compile-time adapter names, which are known to be non-empty.
    pub fn from_static(name: &'static str) -> Self {
        debug_assert!(!name.trim().is_empty(), "exchange name must not be empty");
        Self(name.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExchangeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ExchangeName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExchangeName> for String {
    fn from(value: ExchangeName) -> Self {
        value.0
    }
}

/// Unordered currency pair key: (lower id, higher id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey(CurrencyId, CurrencyId);

impl PairKey {
    pub fn new(a: CurrencyId, b: CurrencyId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub const fn low(self) -> CurrencyId {
        self.0
    }

    pub const fn high(self) -> CurrencyId {
        self.1
    }
}

/// One exchange's current quote for one trading pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub base: Arc<Currency>,
    pub quote: Arc<Currency>,
    pub exchange: ExchangeName,
    pub last: f64,
    pub volume: f64,
    pub last_updated: UtcDateTime,
}

impl MarketSummary {
    pub fn new(
        base: Arc<Currency>,
        quote: Arc<Currency>,
        exchange: ExchangeName,
        last: f64,
        volume: f64,
        last_updated: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("last", last)?;
        validate_non_negative("volume", volume)?;

        Ok(Self {
            base,
            quote,
            exchange,
            last,
            volume,
            last_updated,
        })
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.base.id, self.quote.id)
    }

    pub fn involves(&self, id: CurrencyId) -> bool {
        self.base.id == id || self.quote.id == id
    }

    /// Traded value in quote currency units.
    pub fn quote_volume(&self) -> f64 {
        self.volume * self.last
    }

    /// `BASE/QUOTE` label.
    pub fn pair_label(&self) -> String {
        format!("{}/{}", self.base.symbol, self.quote.symbol)
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
