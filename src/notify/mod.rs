// Notification delivery module
//
// Best-effort trade notifications. Failures are logged and never
// propagate into the driver's tick.

use serde::Serialize;

use crate::models::{ExitReason, Side};

/// Events the engine reports to the outside world.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyEvent {
    PositionOpened {
        symbol: String,
        side: Side,
        amount: f64,
        price: f64,
        stop_loss: f64,
        take_profit_1: f64,
        take_profit_2: f64,
    },
    TakeProfit1Hit {
        symbol: String,
        side: Side,
        price: f64,
    },
    PositionClosed {
        symbol: String,
        side: Side,
        amount: f64,
        price: f64,
        reason: ExitReason,
        profit_pct: f64,
    },
    EntryRejected {
        symbol: String,
        reason: String,
    },
    Error {
        message: String,
    },
}

/// Fire-and-forget message sink.
pub trait Notifier {
    fn notify(&self, event: &NotifyEvent) -> impl std::future::Future<Output = ()> + Send;
}

/// Notifier that drops everything (backtests, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    async fn notify(&self, _event: &NotifyEvent) {}
}

/// Posts each event as JSON to a configured webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, url }
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &NotifyEvent) {
        match self.client.post(&self.url).json(event).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Notification delivered: {:?}", event);
            }
            Ok(response) => {
                tracing::warn!(
                    "Notification webhook returned {}: {:?}",
                    response.status(),
                    event
                );
            }
            Err(e) => {
                tracing::warn!("Failed to deliver notification: {}", e);
            }
        }
    }
}
