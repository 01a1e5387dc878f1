// Simulation driver core: the tick pipeline shared by live polling and
// historical backtesting. Candles flow one direction per tick:
// indicators -> events -> decision -> ledger mutation -> exchange calls.

pub mod live;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::BotConfig;
use crate::error::EngineError;
use crate::exchange::ExchangeClient;
use crate::execution::{position_size, PlannedTransition, PositionLedger, TickPrices, Transition};
use crate::indicators::{compute_frames, IndicatorFrame};
use crate::models::{Candle, ClosedTrade, Side};
use crate::notify::{Notifier, NotifyEvent};
use crate::risk::{RiskLimits, RiskState};
use crate::strategy::EmaMacdVwapStrategy;

/// What one tick did to the ledger.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub closed: Vec<ClosedTrade>,
    pub opened: Option<Uuid>,
    pub tp1_hits: u32,
    pub rejected_entry: Option<String>,
}

/// Owned engine state, advanced one tick at a time by a driver.
///
/// The engine holds everything mutable (ledger, risk counters) and takes
/// each tick's inputs explicitly, so a tick is deterministic given its
/// candle window and collaborator responses.
pub struct Engine {
    strategy: EmaMacdVwapStrategy,
    ledger: PositionLedger,
    risk: RiskState,
    limits: RiskLimits,
    symbol: String,
    quote_currency: String,
    risk_percentage: f64,
}

impl Engine {
    pub fn new(config: &BotConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            strategy: EmaMacdVwapStrategy::new(config.strategy_params()),
            ledger: PositionLedger::new(),
            risk: RiskState::new(started_at.date_naive()),
            limits: config.risk_limits(),
            symbol: config.symbol.clone(),
            quote_currency: config.quote_currency().to_string(),
            risk_percentage: config.risk_percentage,
        }
    }

    pub fn strategy(&self) -> &EmaMacdVwapStrategy {
        &self.strategy
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn risk(&self) -> &RiskState {
        &self.risk
    }

    /// Candles required in a window before decisions can fire.
    pub fn warmup_len(&self) -> usize {
        self.strategy.warmup_len()
    }

    /// Close every remaining position at the final available price
    /// (backtest end of period).
    pub fn force_close_all(&mut self, price: f64, now: DateTime<Utc>) -> Vec<ClosedTrade> {
        self.ledger.force_close_all(price, now)
    }

    /// Run one tick of the pipeline over the candle window.
    ///
    /// Steps: roll the daily counters, derive indicator frames, apply
    /// ledger transitions (exits before entries), then evaluate a new
    /// entry under admission control. Collaborator failures on the order
    /// path are recoverable: the affected intent is dropped for this tick
    /// and the ledger keeps its pre-call state.
    pub async fn run_tick<E: ExchangeClient, N: Notifier>(
        &mut self,
        exchange: &E,
        notifier: &N,
        window: &[Candle],
        tick: TickPrices,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, EngineError> {
        let mut outcome = TickOutcome::default();

        self.risk.roll_date(now.date_naive());

        let frames = compute_frames(window, &self.strategy.indicator_params())?;
        let pair = match frames.len() {
            0 | 1 => None,
            n => Some((frames[n - 2], frames[n - 1])),
        };

        self.apply_transitions(exchange, notifier, &pair, tick, now, &mut outcome)
            .await;
        self.try_entry(exchange, notifier, &pair, tick, now, &mut outcome)
            .await;

        Ok(outcome)
    }

    async fn apply_transitions<E: ExchangeClient, N: Notifier>(
        &mut self,
        exchange: &E,
        notifier: &N,
        pair: &Option<(IndicatorFrame, IndicatorFrame)>,
        tick: TickPrices,
        now: DateTime<Utc>,
        outcome: &mut TickOutcome,
    ) {
        let (exit_long, exit_short) = match pair {
            Some((prev, curr)) => (
                self.strategy.exit_signal(prev, curr, Side::Long),
                self.strategy.exit_signal(prev, curr, Side::Short),
            ),
            None => (false, false),
        };

        for plan in self.ledger.plan_transitions(&tick, exit_long, exit_short) {
            let Some(position) = self.ledger.position(plan.position_id) else {
                continue;
            };
            let side = position.side;
            let quantity = position.quantity;

            match plan.transition {
                Transition::MarkTp1 { price } => {
                    self.ledger.commit(&plan, now);
                    outcome.tp1_hits += 1;
                    notifier
                        .notify(&NotifyEvent::TakeProfit1Hit {
                            symbol: self.symbol.clone(),
                            side,
                            price,
                        })
                        .await;
                }
                Transition::Close { reason, fill_price } => {
                    match exchange
                        .close_position(&self.symbol, side, quantity, fill_price)
                        .await
                    {
                        Ok(ack) => {
                            let committed = self.ledger.commit(
                                &PlannedTransition {
                                    position_id: plan.position_id,
                                    transition: Transition::Close {
                                        reason,
                                        fill_price: ack.fill_price,
                                    },
                                },
                                now,
                            );
                            if let Some(trade) = committed {
                                notifier
                                    .notify(&NotifyEvent::PositionClosed {
                                        symbol: self.symbol.clone(),
                                        side: trade.side,
                                        amount: trade.quantity,
                                        price: trade.exit_price,
                                        reason: trade.exit_reason,
                                        profit_pct: trade.profit_pct,
                                    })
                                    .await;
                                outcome.closed.push(trade);
                            }
                        }
                        Err(e) => {
                            // Position stays exactly as it was; retried
                            // naturally on the next tick.
                            tracing::error!(
                                "Failed to close {} position {}: {}",
                                side,
                                plan.position_id,
                                e
                            );
                            notifier
                                .notify(&NotifyEvent::Error {
                                    message: format!("close failed: {}", e),
                                })
                                .await;
                        }
                    }
                }
            }
        }
    }

    async fn try_entry<E: ExchangeClient, N: Notifier>(
        &mut self,
        exchange: &E,
        notifier: &N,
        pair: &Option<(IndicatorFrame, IndicatorFrame)>,
        tick: TickPrices,
        now: DateTime<Utc>,
        outcome: &mut TickOutcome,
    ) {
        let Some((prev, curr)) = pair else {
            return;
        };
        let Some(entry) = self.strategy.evaluate_entry(prev, curr, tick.last) else {
            return;
        };

        if let Err(block) = self.limits.check(self.ledger.open_count() as u32, &self.risk) {
            tracing::info!("Entry rejected: {}", block);
            outcome.rejected_entry = Some(block.to_string());
            notifier
                .notify(&NotifyEvent::EntryRejected {
                    symbol: self.symbol.clone(),
                    reason: block.to_string(),
                })
                .await;
            return;
        }

        let balance = match exchange.get_balance(&self.quote_currency).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::error!("Balance check failed, dropping entry intent: {}", e);
                notifier
                    .notify(&NotifyEvent::Error {
                        message: format!("balance check failed: {}", e),
                    })
                    .await;
                return;
            }
        };

        let amount = position_size(
            balance.free,
            self.risk_percentage,
            entry.price,
            exchange.amount_precision(&self.symbol),
        );
        if amount <= 0.0 {
            tracing::warn!(
                "Computed order amount {} not positive, aborting entry",
                amount
            );
            outcome.rejected_entry = Some("computed amount not positive".to_string());
            notifier
                .notify(&NotifyEvent::EntryRejected {
                    symbol: self.symbol.clone(),
                    reason: "computed amount not positive".to_string(),
                })
                .await;
            return;
        }

        match exchange
            .place_order(&self.symbol, entry.side, amount, entry.price)
            .await
        {
            Ok(ack) => {
                let id = self
                    .ledger
                    .open_position(&entry, ack.fill_price, ack.amount, now);
                // A fill failure would not have counted toward the daily
                // limit; only successful entries do.
                self.risk.record_trade();
                outcome.opened = Some(id);

                tracing::info!(
                    "Opened {} {} @ {:.4} (SL {:.4}, TP1 {:.4}, TP2 {:.4})",
                    entry.side,
                    id,
                    ack.fill_price,
                    entry.stop_loss,
                    entry.take_profit_1,
                    entry.take_profit_2
                );
                notifier
                    .notify(&NotifyEvent::PositionOpened {
                        symbol: self.symbol.clone(),
                        side: entry.side,
                        amount: ack.amount,
                        price: ack.fill_price,
                        stop_loss: entry.stop_loss,
                        take_profit_1: entry.take_profit_1,
                        take_profit_2: entry.take_profit_2,
                    })
                    .await;
            }
            Err(e) => {
                tracing::error!("Order placement failed: {}", e);
                notifier
                    .notify(&NotifyEvent::Error {
                        message: format!("order placement failed: {}", e),
                    })
                    .await;
            }
        }
    }
}
