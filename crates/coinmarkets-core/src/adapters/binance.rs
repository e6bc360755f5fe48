use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::adapter::{ExchangeAdapter, FetchError, FetchFuture};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::registry::{CurrencyRegistry, UnknownAssetPolicy};
use crate::retry::RetryPolicy;
use crate::throttle::RequestBudget;
use crate::{ExchangeName, MarketSummary, UtcDateTime};

pub const BINANCE_EXCHANGE: &str = "Binance";
pub const BINANCE_PRODUCT_ENDPOINT: &str = "https://www.binance.com/exchange/public/product";

#[derive(Debug, Clone, PartialEq)]
pub struct BinanceConfig {
    pub endpoint: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerConfig,
    pub requests_per_minute: u32,
    pub unknown_assets: UnknownAssetPolicy,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(BINANCE_PRODUCT_ENDPOINT),
            request_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            requests_per_minute: 20,
            unknown_assets: UnknownAssetPolicy::default(),
        }
    }
}

impl BinanceConfig {
    /// Longest one fetch can take: every attempt hitting `request_timeout`
    /// plus the largest possible backoff between them.
    pub fn worst_case_fetch(&self) -> Duration {
        self.request_timeout
            .saturating_mul(self.retry.max_retries.saturating_add(1))
            .saturating_add(self.retry.max_total_delay())
    }
}

/// Binance public product listing adapter.
///
/// One GET returns every spot market with its base/quote asset codes,
/// previous close and volume. The previous close is reported as the last
/// price.
///
/// Unknown asset codes follow `BinanceConfig::unknown_assets`: under
/// `Register` they become registry entries named after the code, under
/// `Skip` the product is dropped. Products with missing or non-numeric
/// price/volume are dropped before any registry write.
pub struct BinanceAdapter {
    registry: Arc<CurrencyRegistry>,
    http_client: Arc<dyn HttpClient>,
    config: BinanceConfig,
    circuit_breaker: Arc<CircuitBreaker>,
    budget: RequestBudget,
}

impl BinanceAdapter {
    pub fn new(
        registry: Arc<CurrencyRegistry>,
        http_client: Arc<dyn HttpClient>,
        config: BinanceConfig,
    ) -> Self {
        let budget = RequestBudget::new(Duration::from_secs(60), config.requests_per_minute);
        let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker));
        Self {
            registry,
            http_client,
            config,
            circuit_breaker,
            budget,
        }
    }

    pub fn with_reqwest(registry: Arc<CurrencyRegistry>, config: BinanceConfig) -> Self {
        Self::new(registry, Arc::new(ReqwestHttpClient::new()), config)
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn request_products(&self) -> Result<String, FetchError> {
        let request = HttpRequest::get(&self.config.endpoint)
            .with_header("accept", "application/json")
            .with_timeout(self.config.request_timeout);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.timed_out() {
                FetchError::timeout(format!("binance request timed out: {}", error.message()))
            } else if error.retryable() {
                FetchError::transport(format!("binance transport error: {}", error.message()))
            } else {
                FetchError::unavailable(format!("binance transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            return Err(FetchError::upstream_status(response.status));
        }

        Ok(response.body)
    }

    fn normalize(&self, body: &str) -> Result<Vec<MarketSummary>, FetchError> {
        let response: BinanceProductResponse = serde_json::from_str(body)
            .map_err(|e| FetchError::malformed(format!("failed to parse binance response: {e}")))?;
        let products = response
            .data
            .ok_or_else(|| FetchError::malformed("binance response has no 'data' field"))?;

        let exchange = self.name();
        let as_of = UtcDateTime::now();
        let total = products.len();
        let records = products
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<BinanceProduct>(raw) {
                Ok(product) => self.normalize_product(product, &exchange, as_of),
                Err(error) => {
                    tracing::debug!(exchange = %exchange, %error, "skipping unreadable product");
                    None
                }
            })
            .collect::<Vec<_>>();

        if records.len() < total {
            tracing::debug!(
                exchange = %exchange,
                kept = records.len(),
                dropped = total - records.len(),
                "dropped products during normalization"
            );
        }

        Ok(records)
    }

    fn normalize_product(
        &self,
        product: BinanceProduct,
        exchange: &ExchangeName,
        as_of: UtcDateTime,
    ) -> Option<MarketSummary> {
        let last = product.prev_close.as_ref().and_then(FlexibleNumber::as_f64)?;
        let volume = product.volume.as_ref().and_then(FlexibleNumber::as_f64)?;

        let policy = self.config.unknown_assets;
        let base = self.registry.resolve(&product.base_asset, policy)?;
        let quote = self.registry.resolve(&product.quote_asset, policy)?;

        MarketSummary::new(base, quote, exchange.clone(), last, volume, as_of).ok()
    }
}

impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> ExchangeName {
        ExchangeName::from_static(BINANCE_EXCHANGE)
    }

    fn fetch<'a>(&'a self) -> FetchFuture<'a> {
        Box::pin(async move {
            if !self.circuit_breaker.allow_request() {
                return Err(FetchError::unavailable(
                    "binance circuit breaker is open; skipping upstream call",
                ));
            }

            if !self.budget.try_acquire() {
                return Err(FetchError::rate_limited(format!(
                    "binance request budget of {} per minute exhausted",
                    self.budget.limit()
                )));
            }

            let attempt = BreakerAttempt::new(&self.circuit_breaker);
            let outcome = match self.config.retry.run(|_| self.request_products()).await {
                Ok(body) => self.normalize(&body),
                Err(error) => Err(error),
            };
            attempt.settle(outcome.is_ok());
            outcome
        })
    }
}

/// Reports one upstream attempt to the breaker. A fetch dropped before it
/// settles (scheduler timeout, shutdown) counts as a failure.
struct BreakerAttempt<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl<'a> BreakerAttempt<'a> {
    fn new(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            settled: false,
        }
    }

    fn settle(mut self, succeeded: bool) {
        self.settled = true;
        if succeeded {
            self.breaker.record_success();
        } else {
            self.breaker.record_failure();
        }
    }
}

impl Drop for BreakerAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(exchange = BINANCE_EXCHANGE, "fetch abandoned before completion");
            self.breaker.record_failure();
        }
    }
}

#[derive(Debug, Deserialize)]
struct BinanceProductResponse {
    data: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceProduct {
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    prev_close: Option<FlexibleNumber>,
    #[serde(default)]
    volume: Option<FlexibleNumber>,
}

/// Binance mixes JSON numbers and numeric strings across endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlexibleNumber {
    Number(f64),
    Text(String),
}

impl FlexibleNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}
