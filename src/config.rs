use std::str::FromStr;

use crate::error::EngineError;
use crate::risk::RiskLimits;
use crate::strategy::StrategyParams;

/// How orders are routed: simulated fills or the real exchange account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingMode {
    Paper,
    Live,
}

impl FromStr for TradingMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paper" => Ok(TradingMode::Paper),
            "live" => Ok(TradingMode::Live),
            other => Err(EngineError::Configuration(format!(
                "invalid trading mode: {}. Must be 'paper' or 'live'",
                other
            ))),
        }
    }
}

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    // Trading parameters
    pub symbol: String,
    pub timeframe: String,
    pub risk_percentage: f64,
    pub max_open_orders: u32,
    pub max_daily_trades: u32,

    // Strategy parameters
    pub ema_short: usize,
    pub ema_long: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub vwap_lookback: usize,
    pub vwap_band_threshold: f64,
    pub atr_period: usize,
    pub stop_loss_atr_multiplier: f64,
    pub take_profit1_atr_multiplier: f64,
    pub take_profit2_atr_multiplier: f64,

    // Mode and driver settings
    pub trading_mode: TradingMode,
    pub initial_capital: f64,
    pub poll_interval_seconds: u64,

    // Collaborator credentials and endpoints
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub webhook_url: Option<String>,

    pub log_level: String,
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, EngineError> {
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|_| {
            EngineError::Configuration(format!("invalid value for {}: {}", key, raw))
        }),
        None => Ok(default),
    }
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup (injectable for tests).
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let trading_mode = lookup("TRADING_MODE")
            .unwrap_or_else(|| "paper".to_string())
            .parse()?;

        Ok(Self {
            symbol: lookup("SYMBOL").unwrap_or_else(|| "BTC/USDT".to_string()),
            timeframe: lookup("TIMEFRAME").unwrap_or_else(|| "15m".to_string()),
            risk_percentage: parse_var(lookup, "RISK_PERCENTAGE", 50.0)?,
            max_open_orders: parse_var(lookup, "MAX_OPEN_ORDERS", 2)?,
            max_daily_trades: parse_var(lookup, "MAX_DAILY_TRADES", 6)?,
            ema_short: parse_var(lookup, "EMA_SHORT", 9)?,
            ema_long: parse_var(lookup, "EMA_LONG", 21)?,
            macd_fast: parse_var(lookup, "MACD_FAST", 12)?,
            macd_slow: parse_var(lookup, "MACD_SLOW", 26)?,
            macd_signal: parse_var(lookup, "MACD_SIGNAL", 9)?,
            vwap_lookback: parse_var(lookup, "VWAP_LOOKBACK", 14)?,
            vwap_band_threshold: parse_var(lookup, "VWAP_BAND_THRESHOLD", 0.0015)?,
            atr_period: parse_var(lookup, "ATR_PERIOD", 14)?,
            stop_loss_atr_multiplier: parse_var(lookup, "STOP_LOSS_ATR_MULTIPLIER", 2.0)?,
            take_profit1_atr_multiplier: parse_var(lookup, "TAKE_PROFIT1_ATR_MULTIPLIER", 3.0)?,
            take_profit2_atr_multiplier: parse_var(lookup, "TAKE_PROFIT2_ATR_MULTIPLIER", 5.0)?,
            trading_mode,
            initial_capital: parse_var(lookup, "INITIAL_CAPITAL", 1000.0)?,
            poll_interval_seconds: parse_var(lookup, "POLL_INTERVAL_SECONDS", 60)?,
            api_key: lookup("EXCHANGE_API_KEY"),
            api_secret: lookup("EXCHANGE_API_SECRET"),
            webhook_url: lookup("WEBHOOK_URL"),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the loaded configuration. Fatal on failure: the driver
    /// never starts with an invalid setup.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: String| Err(EngineError::Configuration(msg));

        if self.base_currency().is_empty() || self.quote_currency().is_empty() {
            return fail(format!(
                "SYMBOL must be of the form BASE/QUOTE, got {}",
                self.symbol
            ));
        }
        if self.ema_short == 0 || self.ema_long == 0 || self.ema_short >= self.ema_long {
            return fail(format!(
                "EMA periods must satisfy 0 < short < long, got {}/{}",
                self.ema_short, self.ema_long
            ));
        }
        if self.macd_fast == 0 || self.macd_signal == 0 || self.macd_fast >= self.macd_slow {
            return fail(format!(
                "MACD periods must satisfy 0 < fast < slow with signal > 0, got {}/{}/{}",
                self.macd_fast, self.macd_slow, self.macd_signal
            ));
        }
        if self.vwap_lookback < 2 {
            return fail(format!(
                "VWAP_LOOKBACK must be at least 2, got {}",
                self.vwap_lookback
            ));
        }
        if self.vwap_band_threshold <= 0.0 {
            return fail(format!(
                "VWAP_BAND_THRESHOLD must be positive, got {}",
                self.vwap_band_threshold
            ));
        }
        if self.atr_period == 0 {
            return fail("ATR_PERIOD must be positive".to_string());
        }
        if self.stop_loss_atr_multiplier <= 0.0
            || self.take_profit1_atr_multiplier <= 0.0
            || self.take_profit1_atr_multiplier >= self.take_profit2_atr_multiplier
        {
            return fail(format!(
                "ATR multipliers must satisfy 0 < SL and 0 < TP1 < TP2, got {}/{}/{}",
                self.stop_loss_atr_multiplier,
                self.take_profit1_atr_multiplier,
                self.take_profit2_atr_multiplier
            ));
        }
        if !(self.risk_percentage > 0.0 && self.risk_percentage <= 100.0) {
            return fail(format!(
                "RISK_PERCENTAGE must be in (0, 100], got {}",
                self.risk_percentage
            ));
        }
        if self.max_open_orders == 0 || self.max_daily_trades == 0 {
            return fail("MAX_OPEN_ORDERS and MAX_DAILY_TRADES must be positive".to_string());
        }
        if self.initial_capital <= 0.0 {
            return fail(format!(
                "INITIAL_CAPITAL must be positive, got {}",
                self.initial_capital
            ));
        }
        if self.poll_interval_seconds == 0 {
            return fail("POLL_INTERVAL_SECONDS must be positive".to_string());
        }
        if self.trading_mode == TradingMode::Live
            && (self.api_key.is_none() || self.api_secret.is_none())
        {
            return fail(
                "live trading requires EXCHANGE_API_KEY and EXCHANGE_API_SECRET".to_string(),
            );
        }

        Ok(())
    }

    pub fn base_currency(&self) -> &str {
        self.symbol.split('/').next().unwrap_or("")
    }

    pub fn quote_currency(&self) -> &str {
        self.symbol.split('/').nth(1).unwrap_or("")
    }

    /// Symbol in the exchange's concatenated form (BTC/USDT -> BTCUSDT).
    pub fn exchange_symbol(&self) -> String {
        self.symbol.replace('/', "")
    }

    pub fn strategy_params(&self) -> StrategyParams {
        StrategyParams {
            ema_short: self.ema_short,
            ema_long: self.ema_long,
            macd_fast: self.macd_fast,
            macd_slow: self.macd_slow,
            macd_signal: self.macd_signal,
            vwap_lookback: self.vwap_lookback,
            vwap_band_threshold: self.vwap_band_threshold,
            atr_period: self.atr_period,
            stop_loss_atr: self.stop_loss_atr_multiplier,
            take_profit1_atr: self.take_profit1_atr_multiplier,
            take_profit2_atr: self.take_profit2_atr_multiplier,
        }
    }

    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            max_open_orders: self.max_open_orders,
            max_daily_trades: self.max_daily_trades,
        }
    }
}

impl std::fmt::Display for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} mode={:?} risk={}% orders<={} trades/day<={} ema={}/{} macd={}/{}/{} \
             vwap={}@{} atr={} sl/tp={}x/{}x/{}x key={}",
            self.symbol,
            self.timeframe,
            self.trading_mode,
            self.risk_percentage,
            self.max_open_orders,
            self.max_daily_trades,
            self.ema_short,
            self.ema_long,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
            self.vwap_lookback,
            self.vwap_band_threshold,
            self.atr_period,
            self.stop_loss_atr_multiplier,
            self.take_profit1_atr_multiplier,
            self.take_profit2_atr_multiplier,
            if self.api_key.is_some() { "********" } else { "<unset>" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_mirror_reference_settings() {
        let vars = HashMap::new();
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();

        assert_eq!(config.symbol, "BTC/USDT");
        assert_eq!(config.timeframe, "15m");
        assert_eq!(config.ema_short, 9);
        assert_eq!(config.ema_long, 21);
        assert_eq!(config.macd_slow, 26);
        assert_eq!(config.vwap_band_threshold, 0.0015);
        assert_eq!(config.max_daily_trades, 6);
        assert_eq!(config.trading_mode, TradingMode::Paper);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_applied() {
        let vars = HashMap::from([
            ("SYMBOL", "ETH/USDT"),
            ("EMA_SHORT", "5"),
            ("EMA_LONG", "13"),
            ("RISK_PERCENTAGE", "25"),
        ]);
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();

        assert_eq!(config.symbol, "ETH/USDT");
        assert_eq!(config.ema_short, 5);
        assert_eq!(config.risk_percentage, 25.0);
        assert_eq!(config.base_currency(), "ETH");
        assert_eq!(config.quote_currency(), "USDT");
        assert_eq!(config.exchange_symbol(), "ETHUSDT");
    }

    #[test]
    fn test_unparseable_value_is_configuration_error() {
        let vars = HashMap::from([("EMA_SHORT", "nine")]);
        let result = BotConfig::from_lookup(&lookup_from(&vars));
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_invalid_trading_mode_rejected() {
        let vars = HashMap::from([("TRADING_MODE", "demo")]);
        let result = BotConfig::from_lookup(&lookup_from(&vars));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_ema_periods() {
        let vars = HashMap::from([("EMA_SHORT", "21"), ("EMA_LONG", "9")]);
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_take_profits() {
        let vars = HashMap::from([
            ("TAKE_PROFIT1_ATR_MULTIPLIER", "5"),
            ("TAKE_PROFIT2_ATR_MULTIPLIER", "3"),
        ]);
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_live_mode_requires_credentials() {
        let vars = HashMap::from([("TRADING_MODE", "live")]);
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();
        assert!(config.validate().is_err());

        let vars = HashMap::from([
            ("TRADING_MODE", "live"),
            ("EXCHANGE_API_KEY", "key"),
            ("EXCHANGE_API_SECRET", "secret"),
        ]);
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_display_hides_secrets() {
        let vars = HashMap::from([
            ("EXCHANGE_API_KEY", "supersecretkey"),
            ("EXCHANGE_API_SECRET", "alsosecret"),
        ]);
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();
        let shown = config.to_string();

        assert!(!shown.contains("supersecretkey"));
        assert!(shown.contains("********"));
    }

    #[test]
    fn test_bad_symbol_rejected() {
        let vars = HashMap::from([("SYMBOL", "BTCUSDT")]);
        let config = BotConfig::from_lookup(&lookup_from(&vars)).unwrap();
        assert!(config.validate().is_err());
    }
}
