use serde::{Deserialize, Serialize};

use crate::models::ClosedTrade;

/// Equity accounting over a backtest run, updated per closed trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquityState {
    pub current_equity: f64,
    pub peak_equity: f64,
    pub max_drawdown_pct: f64,
}

impl EquityState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            current_equity: initial_capital,
            peak_equity: initial_capital,
            max_drawdown_pct: 0.0,
        }
    }

    /// Compound one realized trade into the curve and update the peak
    /// and drawdown.
    pub fn apply_trade(&mut self, profit_pct: f64) {
        self.current_equity *= 1.0 + profit_pct / 100.0;

        if self.current_equity > self.peak_equity {
            self.peak_equity = self.current_equity;
        }

        let drawdown = (self.peak_equity - self.current_equity) / self.peak_equity * 100.0;
        if drawdown > self.max_drawdown_pct {
            self.max_drawdown_pct = drawdown;
        }
    }
}

/// Complete backtest results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub equity_curve: Vec<f64>,
    pub rejected_entries: usize,
    pub trades: Vec<ClosedTrade>,
}

impl BacktestReport {
    pub fn from_trades(
        initial_capital: f64,
        equity: EquityState,
        equity_curve: Vec<f64>,
        trades: Vec<ClosedTrade>,
        rejected_entries: usize,
    ) -> Self {
        let total_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.profit_pct > 0.0).count();
        let losing_trades = total_trades - winning_trades;

        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let total_return_pct =
            (equity.current_equity - initial_capital) / initial_capital * 100.0;

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_return_pct,
            max_drawdown_pct: equity.max_drawdown_pct,
            initial_capital,
            final_equity: equity.current_equity,
            equity_curve,
            rejected_entries,
            trades,
        }
    }

    /// Print a formatted report to stdout.
    pub fn print_report(&self) {
        println!("\nBacktest Results:");
        println!("  Total Trades:    {}", self.total_trades);
        println!(
            "  Winning Trades:  {} ({:.2}%)",
            self.winning_trades, self.win_rate
        );
        println!("  Losing Trades:   {}", self.losing_trades);
        println!("  Total Return:    {:+.2}%", self.total_return_pct);
        println!("  Max Drawdown:    {:.2}%", self.max_drawdown_pct);
        println!(
            "  Final Equity:    {:.2} (from {:.2})",
            self.final_equity, self.initial_capital
        );
        println!("  Rejected Entries: {}", self.rejected_entries);

        if !self.trades.is_empty() {
            println!("\n  Trades:");
            for trade in &self.trades {
                println!(
                    "    {} {:.4} -> {:.4}  {:+.2}%  ({})",
                    trade.side, trade.entry_price, trade.exit_price, trade.profit_pct,
                    trade.exit_reason
                );
            }
        }
        println!();
    }
}
