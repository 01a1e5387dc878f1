use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Candle, ClosedTrade, ExitReason, Position, Side};
use crate::strategy::EntrySignal;

/// Price view for a single tick.
///
/// Backtest ticks carry the candle's full range so stop and target
/// breaches are detected at tick level; live ticks collapse to the last
/// traded price (high = low = last) and flow through the same checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPrices {
    pub last: f64,
    pub high: f64,
    pub low: f64,
}

impl TickPrices {
    pub fn from_last(last: f64) -> Self {
        Self {
            last,
            high: last,
            low: last,
        }
    }

    pub fn from_candle(candle: &Candle) -> Self {
        Self {
            last: candle.close,
            high: candle.high,
            low: candle.low,
        }
    }

    /// Fill price for a level-triggered exit, kept inside the tick range.
    fn fill_at_level(&self, level: f64) -> f64 {
        level.clamp(self.low, self.high)
    }
}

/// The single state transition a position may take on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Close { reason: ExitReason, fill_price: f64 },
    MarkTp1 { price: f64 },
}

/// A transition planned for one position, not yet applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedTransition {
    pub position_id: Uuid,
    pub transition: Transition,
}

/// Exclusive owner of all open positions and the closed-trade log.
///
/// Transitions are planned first and committed separately so that a
/// failed exchange close leaves the position exactly as it was: the
/// driver only commits a close after the collaborator call succeeded.
#[derive(Debug, Default)]
pub struct PositionLedger {
    open: Vec<Position>,
    closed: Vec<ClosedTrade>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn position(&self, id: Uuid) -> Option<&Position> {
        self.open.iter().find(|p| p.id == id)
    }

    /// Open a position from an accepted entry at the actual fill price.
    pub fn open_position(
        &mut self,
        signal: &EntrySignal,
        fill_price: f64,
        quantity: f64,
        opened_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.open.push(Position {
            id,
            side: signal.side,
            entry_price: fill_price,
            quantity,
            stop_loss: signal.stop_loss,
            take_profit_1: signal.take_profit_1,
            take_profit_2: signal.take_profit_2,
            opened_at,
            tp1_hit: false,
        });
        id
    }

    /// Plan at most one transition per open position for this tick.
    ///
    /// Checks run in priority order and the first match wins: stop loss,
    /// take-profit 2, take-profit 1 (once), then signal exit. Signal exit
    /// conditions are computed by the decision engine and passed in per
    /// side.
    pub fn plan_transitions(
        &self,
        tick: &TickPrices,
        exit_long: bool,
        exit_short: bool,
    ) -> Vec<PlannedTransition> {
        self.open
            .iter()
            .filter_map(|position| {
                self.plan_for(position, tick, exit_long, exit_short)
                    .map(|transition| PlannedTransition {
                        position_id: position.id,
                        transition,
                    })
            })
            .collect()
    }

    fn plan_for(
        &self,
        position: &Position,
        tick: &TickPrices,
        exit_long: bool,
        exit_short: bool,
    ) -> Option<Transition> {
        match position.side {
            Side::Long => {
                if tick.low <= position.stop_loss {
                    return Some(Transition::Close {
                        reason: ExitReason::StopLoss,
                        fill_price: tick.fill_at_level(position.stop_loss),
                    });
                }
                if tick.high >= position.take_profit_2 {
                    return Some(Transition::Close {
                        reason: ExitReason::TakeProfit2,
                        fill_price: tick.fill_at_level(position.take_profit_2),
                    });
                }
                if !position.tp1_hit && tick.high >= position.take_profit_1 {
                    return Some(Transition::MarkTp1 {
                        price: tick.fill_at_level(position.take_profit_1),
                    });
                }
                if exit_long {
                    return Some(Transition::Close {
                        reason: ExitReason::SignalExit,
                        fill_price: tick.last,
                    });
                }
            }
            Side::Short => {
                if tick.high >= position.stop_loss {
                    return Some(Transition::Close {
                        reason: ExitReason::StopLoss,
                        fill_price: tick.fill_at_level(position.stop_loss),
                    });
                }
                if tick.low <= position.take_profit_2 {
                    return Some(Transition::Close {
                        reason: ExitReason::TakeProfit2,
                        fill_price: tick.fill_at_level(position.take_profit_2),
                    });
                }
                if !position.tp1_hit && tick.low <= position.take_profit_1 {
                    return Some(Transition::MarkTp1 {
                        price: tick.fill_at_level(position.take_profit_1),
                    });
                }
                if exit_short {
                    return Some(Transition::Close {
                        reason: ExitReason::SignalExit,
                        fill_price: tick.last,
                    });
                }
            }
        }
        None
    }

    /// Apply a planned transition.
    ///
    /// Returns the closed trade for close transitions, None for TP1 marks.
    /// Committing a plan whose position no longer exists is a no-op, so
    /// replaying the same tick's plans cannot double-close anything.
    pub fn commit(
        &mut self,
        planned: &PlannedTransition,
        now: DateTime<Utc>,
    ) -> Option<ClosedTrade> {
        let index = self.open.iter().position(|p| p.id == planned.position_id)?;

        match planned.transition {
            Transition::MarkTp1 { price } => {
                let position = &mut self.open[index];
                if !position.tp1_hit {
                    position.tp1_hit = true;
                    tracing::info!(
                        "Take profit 1 hit for {} {} at {:.4}",
                        position.side,
                        position.id,
                        price
                    );
                }
                None
            }
            Transition::Close { reason, fill_price } => {
                let position = self.open.remove(index);
                let trade = ClosedTrade {
                    side: position.side,
                    entry_price: position.entry_price,
                    exit_price: fill_price,
                    quantity: position.quantity,
                    profit_pct: position.profit_pct(fill_price),
                    exit_reason: reason,
                    opened_at: position.opened_at,
                    exit_time: now,
                };
                tracing::info!(
                    "Closed {} {} at {:.4} ({}, P/L {:.2}%)",
                    trade.side,
                    position.id,
                    fill_price,
                    reason,
                    trade.profit_pct
                );
                self.closed.push(trade.clone());
                Some(trade)
            }
        }
    }

    /// Close every remaining open position at the final available price.
    /// Backtest only: the end of the historical window.
    pub fn force_close_all(&mut self, price: f64, now: DateTime<Utc>) -> Vec<ClosedTrade> {
        let plans: Vec<PlannedTransition> = self
            .open
            .iter()
            .map(|position| PlannedTransition {
                position_id: position.id,
                transition: Transition::Close {
                    reason: ExitReason::EndOfPeriod,
                    fill_price: price,
                },
            })
            .collect();

        plans
            .iter()
            .filter_map(|plan| self.commit(plan, now))
            .collect()
    }
}
