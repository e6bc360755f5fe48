mod binance;

pub use binance::{BinanceAdapter, BinanceConfig, BINANCE_EXCHANGE, BINANCE_PRODUCT_ENDPOINT};
