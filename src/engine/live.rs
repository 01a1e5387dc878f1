use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Duration};

use super::Engine;
use crate::config::BotConfig;
use crate::error::EngineError;
use crate::exchange::{ExchangeClient, MarketDataSource};
use crate::execution::TickPrices;
use crate::models::validate_candles;
use crate::notify::{Notifier, NotifyEvent};

/// Live/polling driver: fetch candles, run one engine tick, sleep.
///
/// Collaborators are chosen once at construction (paper or real order
/// routing); the tick pipeline itself is the same one the backtester
/// drives. Cancellation is cooperative: the stop flag is polled at the
/// top of each tick and never interrupts in-flight collaborator calls.
pub struct LiveTrader<M, E, N> {
    market: M,
    exchange: E,
    notifier: N,
    engine: Engine,
    symbol: String,
    timeframe: String,
    fetch_limit: usize,
    poll_interval: Duration,
    retry_delay: Duration,
    stop: Arc<AtomicBool>,
}

impl<M, E, N> LiveTrader<M, E, N>
where
    M: MarketDataSource,
    E: ExchangeClient,
    N: Notifier,
{
    pub fn new(config: &BotConfig, market: M, exchange: E, notifier: N) -> Self {
        let engine = Engine::new(config, Utc::now());
        let fetch_limit = (engine.warmup_len() * 2).max(100);
        let poll_interval = Duration::from_secs(config.poll_interval_seconds);

        Self {
            market,
            exchange,
            notifier,
            engine,
            symbol: config.symbol.clone(),
            timeframe: config.timeframe.clone(),
            fetch_limit,
            poll_interval,
            retry_delay: poll_interval.min(Duration::from_secs(30)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the loop at the top of the next tick.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Poll until stopped. Recoverable failures (no data, rejected
    /// orders) are logged and retried after a short delay; configuration
    /// and computation errors abort the loop.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        tracing::info!(
            "Starting live loop on {} ({}), polling every {:?}",
            self.symbol,
            self.timeframe,
            self.poll_interval
        );

        loop {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("Stop requested, leaving live loop");
                break;
            }

            match self.tick_once().await {
                Ok(()) => sleep(self.poll_interval).await,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Tick skipped: {}", e);
                    self.notifier
                        .notify(&NotifyEvent::Error {
                            message: format!("tick skipped: {}", e),
                        })
                        .await;
                    sleep(self.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!("Fatal engine error: {}", e);
                    self.notifier
                        .notify(&NotifyEvent::Error {
                            message: format!("fatal: {}", e),
                        })
                        .await;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    async fn tick_once(&mut self) -> Result<(), EngineError> {
        let candles = self
            .market
            .fetch_candles(&self.symbol, &self.timeframe, self.fetch_limit)
            .await?;

        let needed = self.engine.warmup_len();
        let Some(latest) = candles.last() else {
            return Err(EngineError::DataUnavailable(
                "market data source returned no candles".to_string(),
            ));
        };
        if candles.len() < needed {
            return Err(EngineError::DataUnavailable(format!(
                "insufficient candles: got {}, need {}",
                candles.len(),
                needed
            )));
        }
        validate_candles(&candles)?;

        let tick = TickPrices::from_last(latest.close);
        let outcome = self
            .engine
            .run_tick(&self.exchange, &self.notifier, &candles, tick, Utc::now())
            .await?;

        tracing::info!(
            "Tick @ {:.4}: {} closed, {} open, tp1 hits {}",
            tick.last,
            outcome.closed.len(),
            self.engine.ledger().open_count(),
            outcome.tp1_hits
        );

        Ok(())
    }
}
