use crate::backtest::report::{BacktestReport, EquityState};
use crate::config::BotConfig;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::exchange::PaperExchange;
use crate::execution::TickPrices;
use crate::models::{validate_candles, Candle};
use crate::notify::NullNotifier;

/// Backtest runner: drives the same tick pipeline as the live loop over
/// a historical candle window, candle by candle, with synthetic fills.
pub struct BacktestRunner {
    initial_capital: f64,
}

impl BacktestRunner {
    pub fn new(initial_capital: f64) -> Self {
        Self { initial_capital }
    }

    /// Run a backtest over the historical window.
    ///
    /// Each tick feeds the growing candle prefix through the engine so
    /// recursive indicators see exactly the history a live fetch of the
    /// same candles would have produced. Any position still open at the
    /// end of the window is force-closed at the final price.
    pub async fn run(
        &self,
        config: &BotConfig,
        candles: Vec<Candle>,
    ) -> Result<BacktestReport, EngineError> {
        validate_candles(&candles)?;

        let Some(first) = candles.first() else {
            return Err(EngineError::DataUnavailable(
                "no historical candles to backtest".to_string(),
            ));
        };

        let mut engine = Engine::new(config, first.timestamp);
        let warmup = engine.warmup_len();
        if candles.len() <= warmup {
            return Err(EngineError::DataUnavailable(format!(
                "not enough candles for backtest: got {}, need more than {}",
                candles.len(),
                warmup
            )));
        }

        tracing::info!(
            "Starting backtest: {} candles on {}, warmup {}",
            candles.len(),
            config.symbol,
            warmup
        );

        let exchange = PaperExchange::new(self.initial_capital, None);
        let notifier = NullNotifier;

        let mut equity = EquityState::new(self.initial_capital);
        let mut equity_curve = vec![self.initial_capital];
        let mut trades = Vec::new();
        let mut rejected_entries = 0;

        for i in warmup..candles.len() {
            let window = &candles[..=i];
            let current = &candles[i];
            let tick = TickPrices::from_candle(current);

            let outcome = engine
                .run_tick(&exchange, &notifier, window, tick, current.timestamp)
                .await?;

            if outcome.rejected_entry.is_some() {
                rejected_entries += 1;
            }
            for trade in outcome.closed {
                equity.apply_trade(trade.profit_pct);
                equity_curve.push(equity.current_equity);
                trades.push(trade);
            }
        }

        // End of period: flatten whatever is still open at the last price.
        let last = &candles[candles.len() - 1];
        for trade in engine.force_close_all(last.close, last.timestamp) {
            equity.apply_trade(trade.profit_pct);
            equity_curve.push(equity.current_equity);
            trades.push(trade);
        }

        let report = BacktestReport::from_trades(
            self.initial_capital,
            equity,
            equity_curve,
            trades,
            rejected_entries,
        );

        tracing::info!(
            "Backtest complete: {} trades, total return {:+.2}%",
            report.total_trades,
            report.total_return_pct
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::synthetic::{MarketScenario, SyntheticDataGenerator};

    fn test_config() -> BotConfig {
        BotConfig::from_lookup(&|_| None).unwrap()
    }

    #[tokio::test]
    async fn test_backtest_insufficient_data() {
        let mut gen = SyntheticDataGenerator::new(42);
        let candles = gen.generate(MarketScenario::Uptrend, 10, 15);

        let runner = BacktestRunner::new(1000.0);
        let result = runner.run(&test_config(), candles).await;

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not enough candles"));
    }

    #[tokio::test]
    async fn test_backtest_empty_window() {
        let runner = BacktestRunner::new(1000.0);
        let result = runner.run(&test_config(), Vec::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_backtest_runs_clean_on_sideways_market() {
        let mut gen = SyntheticDataGenerator::new(42);
        let candles = gen.generate(MarketScenario::Sideways, 400, 15);

        let runner = BacktestRunner::new(1000.0);
        let report = runner.run(&test_config(), candles).await.unwrap();

        // The run must terminate with a flat book and a consistent curve.
        assert!(report.final_equity > 0.0);
        assert_eq!(
            report.equity_curve.len(),
            report.total_trades + 1,
            "one equity point per closed trade plus the starting capital"
        );
        assert_eq!(report.winning_trades + report.losing_trades, report.total_trades);
    }

    #[tokio::test]
    async fn test_backtest_equity_reproduces_trade_returns() {
        let mut gen = SyntheticDataGenerator::new(1234);
        let candles = gen.generate(MarketScenario::Volatile, 500, 15);

        let runner = BacktestRunner::new(1000.0);
        let report = runner.run(&test_config(), candles).await.unwrap();

        let mut replayed = 1000.0;
        for trade in &report.trades {
            replayed *= 1.0 + trade.profit_pct / 100.0;
        }
        assert!((replayed - report.final_equity).abs() < 1e-6);
    }
}
