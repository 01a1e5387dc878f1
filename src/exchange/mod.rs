// Capability surfaces for the engine's external collaborators.
//
// The driver selects one implementation of each trait at construction
// (paper fills or the real exchange); decision logic never branches on
// trading mode.

pub mod paper;

use crate::error::EngineError;
use crate::models::{Balance, Candle, Side};

pub use paper::PaperExchange;

/// Acknowledgement of a filled order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub fill_price: f64,
    pub amount: f64,
}

/// Produces ordered OHLCV candle sequences for a symbol.
pub trait MarketDataSource {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Candle>, EngineError>> + Send;
}

/// Balance, pricing and order routing for one exchange account.
///
/// Calls are synchronous point-in-time requests from the engine's view:
/// the driver awaits each to completion before moving on. `price` on the
/// order methods is the driver's reference price; simulated exchanges
/// fill at it, real ones submit market orders and report the actual fill.
pub trait ExchangeClient {
    fn get_balance(
        &self,
        currency: &str,
    ) -> impl std::future::Future<Output = Result<Balance, EngineError>> + Send;

    fn get_market_price(
        &self,
        symbol: &str,
    ) -> impl std::future::Future<Output = Result<f64, EngineError>> + Send;

    /// Open a position on `side`.
    fn place_order(
        &self,
        symbol: &str,
        side: Side,
        amount: f64,
        price: f64,
    ) -> impl std::future::Future<Output = Result<OrderAck, EngineError>> + Send;

    /// Close `amount` of an open position on `side`.
    fn close_position(
        &self,
        symbol: &str,
        side: Side,
        amount: f64,
        price: f64,
    ) -> impl std::future::Future<Output = Result<OrderAck, EngineError>> + Send;

    /// Declared amount precision (decimal places) for the symbol, when
    /// known. None means orders go out unrounded.
    fn amount_precision(&self, symbol: &str) -> Option<u32>;
}
