use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// OHLCV candlestick data for the traded symbol.
///
/// Candles are immutable once produced and ordered by strictly increasing
/// timestamp. One engine instance trades one symbol, so the symbol itself
/// lives in configuration rather than on every candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Order side that opens a position in this direction.
    pub fn entry_order(&self) -> &'static str {
        match self {
            Side::Long => "buy",
            Side::Short => "sell",
        }
    }

    /// Order side that closes a position in this direction.
    pub fn exit_order(&self) -> &'static str {
        match self {
            Side::Long => "sell",
            Side::Short => "buy",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// An open position, owned exclusively by the position ledger.
///
/// Created from an accepted entry intent, mutated only by the ledger
/// (the `tp1_hit` flag), and destroyed when the ledger closes it into a
/// [`ClosedTrade`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub opened_at: DateTime<Utc>,
    pub tp1_hit: bool,
}

impl Position {
    /// Realized profit percentage at the given exit price.
    ///
    /// Long: (exit/entry - 1) * 100, Short: (entry/exit - 1) * 100.
    pub fn profit_pct(&self, exit_price: f64) -> f64 {
        match self.side {
            Side::Long => (exit_price / self.entry_price - 1.0) * 100.0,
            Side::Short => (self.entry_price / exit_price - 1.0) * 100.0,
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit2,
    SignalExit,
    EndOfPeriod,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop loss"),
            ExitReason::TakeProfit2 => write!(f, "take profit 2"),
            ExitReason::SignalExit => write!(f, "signal exit"),
            ExitReason::EndOfPeriod => write!(f, "end of period"),
        }
    }
}

/// Immutable record of a completed round trip, one per closed position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub profit_pct: f64,
    pub exit_reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
}

/// Account balance for a single currency as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub free: f64,
    pub used: f64,
    pub total: f64,
}

/// Validate that a candle sequence is ordered by strictly increasing
/// timestamp. Gaps are allowed; reordering is not.
pub fn validate_candles(candles: &[Candle]) -> Result<(), EngineError> {
    for window in candles.windows(2) {
        if window[1].timestamp <= window[0].timestamp {
            return Err(EngineError::DataUnavailable(format!(
                "candles not strictly increasing: {} followed by {}",
                window[0].timestamp, window[1].timestamp
            )));
        }
    }
    Ok(())
}
