// Risk management module
//
// Admission control for new entries: per-day trade count and concurrent
// position limits, checked at decision time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Hard limits on position concurrency and trade rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskLimits {
    pub max_open_orders: u32,
    pub max_daily_trades: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_open_orders: 2,
            max_daily_trades: 6,
        }
    }
}

/// Mutable per-day risk counters, owned by the driver's tick loop.
#[derive(Debug, Clone)]
pub struct RiskState {
    pub trades_today: u32,
    pub last_trade_date: NaiveDate,
}

impl RiskState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            trades_today: 0,
            last_trade_date: today,
        }
    }

    /// Reset the daily counter the first time the tick date advances past
    /// the date trades were last counted on. In live mode `today` is the
    /// wall-clock date; in backtest it is the current candle's date.
    pub fn roll_date(&mut self, today: NaiveDate) {
        if today > self.last_trade_date {
            if self.trades_today > 0 {
                tracing::info!("Daily trades reset for {}", today);
            }
            self.trades_today = 0;
            self.last_trade_date = today;
        }
    }

    /// Count a successfully filled entry toward the daily limit.
    pub fn record_trade(&mut self) {
        self.trades_today += 1;
    }
}

/// Why an entry intent was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionBlock {
    MaxOpenPositions { open: u32, limit: u32 },
    DailyTradeLimit { today: u32, limit: u32 },
}

impl std::fmt::Display for AdmissionBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionBlock::MaxOpenPositions { open, limit } => {
                write!(f, "open positions at limit ({}/{})", open, limit)
            }
            AdmissionBlock::DailyTradeLimit { today, limit } => {
                write!(f, "daily trade limit reached ({}/{})", today, limit)
            }
        }
    }
}

impl RiskLimits {
    /// Gate a new entry intent against the current counters.
    pub fn check(&self, open_positions: u32, state: &RiskState) -> Result<(), AdmissionBlock> {
        if open_positions >= self.max_open_orders {
            return Err(AdmissionBlock::MaxOpenPositions {
                open: open_positions,
                limit: self.max_open_orders,
            });
        }

        if state.trades_today >= self.max_daily_trades {
            return Err(AdmissionBlock::DailyTradeLimit {
                today: state.trades_today,
                limit: self.max_daily_trades,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_admission_ok_below_limits() {
        let limits = RiskLimits::default();
        let state = RiskState::new(date(1));
        assert!(limits.check(0, &state).is_ok());
        assert!(limits.check(1, &state).is_ok());
    }

    #[test]
    fn test_admission_blocks_open_position_limit() {
        let limits = RiskLimits {
            max_open_orders: 2,
            max_daily_trades: 6,
        };
        let state = RiskState::new(date(1));

        let result = limits.check(2, &state);
        assert_eq!(
            result,
            Err(AdmissionBlock::MaxOpenPositions { open: 2, limit: 2 })
        );
    }

    #[test]
    fn test_admission_blocks_daily_trade_limit() {
        let limits = RiskLimits {
            max_open_orders: 5,
            max_daily_trades: 1,
        };
        let mut state = RiskState::new(date(1));
        state.record_trade();

        let result = limits.check(0, &state);
        assert_eq!(
            result,
            Err(AdmissionBlock::DailyTradeLimit { today: 1, limit: 1 })
        );
    }

    #[test]
    fn test_daily_reset_on_date_advance() {
        let mut state = RiskState::new(date(1));
        state.record_trade();
        state.record_trade();
        assert_eq!(state.trades_today, 2);

        // Same day: counter persists.
        state.roll_date(date(1));
        assert_eq!(state.trades_today, 2);

        // Next day: counter resets.
        state.roll_date(date(2));
        assert_eq!(state.trades_today, 0);
        assert_eq!(state.last_trade_date, date(2));
    }

    #[test]
    fn test_date_never_rolls_backwards() {
        let mut state = RiskState::new(date(5));
        state.record_trade();

        state.roll_date(date(4));
        assert_eq!(state.trades_today, 1);
        assert_eq!(state.last_trade_date, date(5));
    }
}
