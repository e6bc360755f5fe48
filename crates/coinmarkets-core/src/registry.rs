//! Canonical currency registry.
//!
//! Entries are `Arc<Currency>` values keyed by normalized symbol. A merge
//! builds a complete replacement value and swaps it in under the shard lock,
//! so a reader holding or loading an entry sees either the previous or the
//! fully merged currency.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, Currency, CurrencyDetail, CurrencyId, CurrencySymbol, NewCurrency,
    ValidationError,
};

/// What an adapter does with an asset symbol the registry has never seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownAssetPolicy {
    /// Create a registry entry named after the symbol.
    #[default]
    Register,
    /// Drop the market record.
    Skip,
}

impl UnknownAssetPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Skip => "skip",
        }
    }
}

impl FromStr for UnknownAssetPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "register" => Ok(Self::Register),
            "skip" => Ok(Self::Skip),
            other => Err(ConfigError::InvalidValue {
                key: "unknown asset policy",
                value: other.to_owned(),
                reason: "expected 'register' or 'skip'",
            }),
        }
    }
}

/// Concurrent symbol-keyed currency store.
#[derive(Debug)]
pub struct CurrencyRegistry {
    by_symbol: DashMap<CurrencySymbol, Arc<Currency>>,
    by_id: DashMap<CurrencyId, CurrencySymbol>,
    next_id: AtomicU64,
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self {
            by_symbol: DashMap::new(),
            by_id: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers or merges a currency. An empty `name` leaves an existing name untouched.
    pub fn register(
        &self,
        symbol: &str,
        name: &str,
        detail: Option<CurrencyDetail>,
    ) -> Result<Arc<Currency>, ValidationError> {
        self.register_currency(NewCurrency {
            symbol: symbol.to_owned(),
            name: Some(name.to_owned()),
            detail,
            image_url: None,
        })
    }

    pub fn register_currency(&self, new: NewCurrency) -> Result<Arc<Currency>, ValidationError> {
        let symbol = CurrencySymbol::parse(&new.symbol)?;
        let name = new
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let (currency, created) = match self.by_symbol.entry(symbol.clone()) {
            Entry::Occupied(mut entry) => {
                let mut merged = Currency::clone(entry.get());
                if let Some(name) = name {
                    merged.name = name.to_owned();
                }
                if let Some(detail) = &new.detail {
                    match merged.detail.as_mut() {
                        Some(existing) => existing.merge_from(detail),
                        None => merged.detail = Some(detail.clone()),
                    }
                }
                if let Some(image_url) = new.image_url {
                    merged.image_url = Some(image_url);
                }

                let merged = Arc::new(merged);
                entry.insert(Arc::clone(&merged));
                (merged, false)
            }
            Entry::Vacant(entry) => {
                let id = CurrencyId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                let currency = Arc::new(Currency {
                    id,
                    name: name.map_or_else(|| symbol.to_string(), str::to_owned),
                    symbol,
                    detail: new.detail,
                    image_url: new.image_url,
                });
                // Visible by id before it is visible by symbol.
                self.by_id.insert(id, currency.symbol.clone());
                entry.insert(Arc::clone(&currency));
                (currency, true)
            }
        };

        if created {
            tracing::debug!(symbol = %currency.symbol, id = currency.id.get(), "registered currency");
        }

        Ok(currency)
    }

    /// Looks up by symbol (case and whitespace insensitive), then by exact name.
    pub fn get(&self, symbol_or_name: &str) -> Option<Arc<Currency>> {
        let input = symbol_or_name.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(found) = self.get_symbol(input) {
            return Some(found);
        }

        self.by_symbol
            .iter()
            .filter(|entry| entry.value().name == input)
            .map(|entry| Arc::clone(entry.value()))
            .min_by_key(|currency| currency.id)
    }

    /// Symbol-only lookup; never falls back to names.
    pub fn get_symbol(&self, symbol: &str) -> Option<Arc<Currency>> {
        let symbol = CurrencySymbol::parse(symbol).ok()?;
        self.by_symbol.get(&symbol).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_by_id(&self, id: CurrencyId) -> Option<Arc<Currency>> {
        let symbol = self.by_id.get(&id)?.value().clone();
        self.by_symbol.get(&symbol).map(|entry| Arc::clone(entry.value()))
    }

    /// Resolves an exchange asset code under the given policy.
    pub fn resolve(&self, symbol: &str, policy: UnknownAssetPolicy) -> Option<Arc<Currency>> {
        if let Some(found) = self.get_symbol(symbol) {
            return Some(found);
        }

        match policy {
            UnknownAssetPolicy::Skip => None,
            UnknownAssetPolicy::Register => self.register(symbol, "", None).ok(),
        }
    }

    /// All entries ordered by id.
    pub fn currencies(&self) -> Vec<Arc<Currency>> {
        let mut all = self
            .by_symbol
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect::<Vec<_>>();
        all.sort_by_key(|currency| currency.id);
        all
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
