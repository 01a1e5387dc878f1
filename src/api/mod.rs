pub mod binance;

pub use binance::{ApiCredentials, BinanceClient};
