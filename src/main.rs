use std::sync::atomic::Ordering;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use trendbot::api::{ApiCredentials, BinanceClient};
use trendbot::backtest::BacktestRunner;
use trendbot::config::{BotConfig, TradingMode};
use trendbot::engine::live::LiveTrader;
use trendbot::error::EngineError;
use trendbot::exchange::{ExchangeClient, MarketDataSource, PaperExchange};
use trendbot::notify::{Notifier, NotifyEvent, NullNotifier, WebhookNotifier};

#[derive(Parser)]
#[command(name = "trendbot", about = "EMA-MACD-VWAP candle trading engine")]
struct Cli {
    /// Trading mode: live or paper order routing, or a historical backtest
    #[arg(long, value_enum, default_value = "paper")]
    mode: Mode,

    /// Path to the environment file
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Number of historical candles to fetch for a backtest
    #[arg(long, default_value_t = 1000)]
    backtest_candles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Live,
    Paper,
    Backtest,
}

/// Notifier chosen at startup from configuration.
enum AnyNotifier {
    Webhook(WebhookNotifier),
    Null(NullNotifier),
}

impl Notifier for AnyNotifier {
    async fn notify(&self, event: &NotifyEvent) {
        match self {
            AnyNotifier::Webhook(n) => n.notify(event).await,
            AnyNotifier::Null(n) => n.notify(event).await,
        }
    }
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trendbot={}", level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn notifier_from(config: &BotConfig) -> AnyNotifier {
    match &config.webhook_url {
        Some(url) => {
            tracing::info!("Webhook notifications enabled");
            AnyNotifier::Webhook(WebhookNotifier::new(url.clone()))
        }
        None => AnyNotifier::Null(NullNotifier),
    }
}

async fn run_trading<E: ExchangeClient>(
    config: &BotConfig,
    market: BinanceClient,
    exchange: E,
) -> Result<(), EngineError> {
    let notifier = notifier_from(config);
    let mut trader = LiveTrader::new(config, market, exchange, notifier);

    let stop = trader.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received, stopping after the current tick...");
        stop.store(true, Ordering::SeqCst);
    });

    trader.run().await
}

async fn run_backtest(config: &BotConfig, candle_limit: usize) -> Result<(), EngineError> {
    let market = BinanceClient::new(None);
    let candles = market
        .fetch_candles(&config.symbol, &config.timeframe, candle_limit)
        .await?;

    tracing::info!(
        "Fetched {} historical candles for {} {}",
        candles.len(),
        config.symbol,
        config.timeframe
    );

    let runner = BacktestRunner::new(config.initial_capital);
    let report = runner.run(config, candles).await?;
    report.print_report();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::from_path(&cli.env_file).ok();

    let mut config = BotConfig::from_env()?;
    // The CLI mode wins over the configured trading mode.
    match cli.mode {
        Mode::Live => config.trading_mode = TradingMode::Live,
        Mode::Paper => config.trading_mode = TradingMode::Paper,
        Mode::Backtest => {}
    }
    setup_logging(&config.log_level);
    config.validate()?;

    tracing::info!("Configuration loaded: {}", config);

    match cli.mode {
        Mode::Backtest => run_backtest(&config, cli.backtest_candles).await?,
        Mode::Live | Mode::Paper => {
            let market = BinanceClient::new(None);

            match config.trading_mode {
                TradingMode::Live => {
                    let credentials = ApiCredentials::new(
                        config.api_key.clone().unwrap_or_default(),
                        config.api_secret.clone().unwrap_or_default(),
                    );
                    let exchange = BinanceClient::new(Some(credentials));
                    if let Err(e) = exchange.refresh_symbol_precision(&config.symbol).await {
                        tracing::warn!(
                            "Could not load amount precision, orders go out unrounded: {}",
                            e
                        );
                    }
                    run_trading(&config, market, exchange).await?
                }
                TradingMode::Paper => {
                    let exchange = PaperExchange::new(config.initial_capital, None);
                    run_trading(&config, market, exchange).await?
                }
            }
        }
    }

    Ok(())
}
