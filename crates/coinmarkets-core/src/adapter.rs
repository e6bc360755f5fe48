//! Exchange adapter contract.
//!
//! Every exchange integration implements [`ExchangeAdapter`]: it fetches one
//! round of market data, resolves asset codes against the
//! [`CurrencyRegistry`](crate::CurrencyRegistry), and returns canonical
//! [`MarketSummary`] records. The scheduler treats each adapter as an
//! isolated unit of failure.
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! use coinmarkets_core::{ExchangeAdapter, ExchangeName, FetchError, MarketSummary};
//!
//! struct FixedAdapter {
//!     records: Vec<MarketSummary>,
//! }
//!
//! impl ExchangeAdapter for FixedAdapter {
//!     fn name(&self) -> ExchangeName {
//!         ExchangeName::parse("Fixed").expect("static name")
//!     }
//!
//!     fn fetch<'a>(&'a self) -> FetchFuture<'a> {
//!         Box::pin(async move { Ok(self.records.clone()) })
//!     }
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{ExchangeName, MarketSummary};

/// Boxed future returned by [`ExchangeAdapter::fetch`].
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<MarketSummary>, FetchError>> + Send + 'a>>;

/// Adapter-level failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Timeout,
    Transport,
    UpstreamStatus,
    MalformedPayload,
    RateLimited,
    Unavailable,
    Cancelled,
}

/// Structured adapter failure. Never crosses into the query side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    retryable: bool,
}

impl FetchError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Transport,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn upstream_status(status: u16) -> Self {
        Self {
            kind: FetchErrorKind::UpstreamStatus,
            message: format!("upstream returned status {status}"),
            retryable: status == 429 || status >= 500,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::MalformedPayload,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Unavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: FetchErrorKind::Cancelled,
            message: String::from("fetch cancelled by shutdown"),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::Timeout => "fetch.timeout",
            FetchErrorKind::Transport => "fetch.transport",
            FetchErrorKind::UpstreamStatus => "fetch.upstream_status",
            FetchErrorKind::MalformedPayload => "fetch.malformed_payload",
            FetchErrorKind::RateLimited => "fetch.rate_limited",
            FetchErrorKind::Unavailable => "fetch.unavailable",
            FetchErrorKind::Cancelled => "fetch.cancelled",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

/// Exchange adapter contract.
///
/// # Unknown assets
///
/// Each implementation documents how it treats asset codes missing from the
/// registry; the bundled adapters follow a configurable
/// [`UnknownAssetPolicy`](crate::UnknownAssetPolicy). Records whose base or
/// quote cannot be resolved are dropped, never stored half-resolved.
///
/// # Cancellation
///
/// `fetch` may be dropped at any await point when the caller's timeout fires
/// or shutdown is requested. Implementations must not leave shared state
/// half-written across an await.
pub trait ExchangeAdapter: Send + Sync {
    /// Stable exchange identifier used to tag produced records.
    fn name(&self) -> ExchangeName;

    /// Runs one retrieval and normalization round.
    fn fetch<'a>(&'a self) -> FetchFuture<'a>;
}
