use thiserror::Error;

/// Validation errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("currency symbol cannot be empty")]
    EmptySymbol,
    #[error("currency symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("currency symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("exchange name cannot be empty")]
    EmptyExchangeName,

    #[error("'{value}' is not an RFC3339 timestamp")]
    InvalidTimestamp { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
}

/// Startup configuration errors. These are the only fatal errors of the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error(
        "binance fetch can take up to {worst_case_ms}ms, which does not fit in adapter_timeout {adapter_timeout_ms}ms"
    )]
    FetchExceedsTimeout {
        worst_case_ms: u64,
        adapter_timeout_ms: u64,
    },

    #[error("at least one exchange adapter must be registered")]
    NoAdapters,
}

/// Errors surfaced while resolving free-text market queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("could not understand '{input}'")]
    Unparseable { input: String },

    #[error("currency '{0}' was not found")]
    UnknownCurrency(String),
}
