use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{ExchangeClient, OrderAck};
use crate::error::EngineError;
use crate::models::{Balance, Side};

/// A simulated fill recorded by the paper exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub order_id: String,
    pub side: Side,
    pub is_close: bool,
    pub amount: f64,
    pub price: f64,
}

/// Simulated exchange: every order fills instantly at the driver's
/// reference price. Paper fills do not debit the wallet, so sizing stays
/// proportional to the configured capital throughout a run.
pub struct PaperExchange {
    balance: Balance,
    precision: Option<u32>,
    next_order: AtomicU64,
    mark_price: Mutex<Option<f64>>,
    orders: Mutex<Vec<PaperOrder>>,
}

impl PaperExchange {
    pub fn new(quote_balance: f64, precision: Option<u32>) -> Self {
        Self {
            balance: Balance {
                free: quote_balance,
                used: 0.0,
                total: quote_balance,
            },
            precision,
            next_order: AtomicU64::new(1),
            mark_price: Mutex::new(None),
            orders: Mutex::new(Vec::new()),
        }
    }

    /// All fills recorded so far, in order.
    pub fn orders(&self) -> Vec<PaperOrder> {
        self.orders.lock().unwrap().clone()
    }

    fn record(&self, side: Side, is_close: bool, amount: f64, price: f64) -> OrderAck {
        let seq = self.next_order.fetch_add(1, Ordering::Relaxed);
        let order_id = format!("paper_{}", seq);

        *self.mark_price.lock().unwrap() = Some(price);
        self.orders.lock().unwrap().push(PaperOrder {
            order_id: order_id.clone(),
            side,
            is_close,
            amount,
            price,
        });

        tracing::info!(
            "Placed PAPER {} order {}: {:.6} @ {:.4}",
            if is_close { "close" } else { "open" },
            order_id,
            amount,
            price
        );

        OrderAck {
            order_id,
            fill_price: price,
            amount,
        }
    }
}

impl ExchangeClient for PaperExchange {
    async fn get_balance(&self, _currency: &str) -> Result<Balance, EngineError> {
        Ok(self.balance)
    }

    async fn get_market_price(&self, symbol: &str) -> Result<f64, EngineError> {
        self.mark_price.lock().unwrap().ok_or_else(|| {
            EngineError::DataUnavailable(format!("no paper mark price seen yet for {}", symbol))
        })
    }

    async fn place_order(
        &self,
        _symbol: &str,
        side: Side,
        amount: f64,
        price: f64,
    ) -> Result<OrderAck, EngineError> {
        if amount <= 0.0 {
            return Err(EngineError::Execution(format!(
                "order amount must be positive, got {}",
                amount
            )));
        }
        Ok(self.record(side, false, amount, price))
    }

    async fn close_position(
        &self,
        _symbol: &str,
        side: Side,
        amount: f64,
        price: f64,
    ) -> Result<OrderAck, EngineError> {
        Ok(self.record(side, true, amount, price))
    }

    fn amount_precision(&self, _symbol: &str) -> Option<u32> {
        self.precision
    }
}
