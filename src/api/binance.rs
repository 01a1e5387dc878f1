use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tokio::time::{sleep, Duration};

use crate::error::EngineError;
use crate::exchange::{ExchangeClient, MarketDataSource, OrderAck};
use crate::models::{Balance, Candle, Side};

const BINANCE_API_BASE: &str = "https://api.binance.com";
const RATE_LIMIT_RPM: u32 = 600;
const MAX_RETRIES: u32 = 3;

type HmacSha256 = Hmac<Sha256>;

// Type alias for the rate limiter to simplify signatures
type RestRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// API key pair for the private endpoints.
#[derive(Clone)]
pub struct ApiCredentials {
    pub key: String,
    secret: String,
}

impl ApiCredentials {
    pub fn new(key: String, secret: String) -> Self {
        Self { key, secret }
    }

    /// HMAC-SHA256 signature of a query string, hex encoded.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// REST client for Binance spot: public market data plus the signed
/// account/order surface. Public calls go through a shared rate limiter
/// and retry transient failures with exponential backoff.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
    rate_limiter: Arc<RestRateLimiter>,
    precision_cache: Arc<Mutex<HashMap<String, u32>>>,
}

/// Kline row: open time, OHLCV as strings, close time, then quote fields
/// this client does not use.
type KlineRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
    serde_json::Value,
);

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    executed_qty: String,
    cummulative_quote_qty: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolFilter {
    filter_type: String,
    step_size: Option<String>,
}

fn to_exchange_symbol(symbol: &str) -> String {
    symbol.replace('/', "")
}

fn parse_f64(raw: &str, what: &str) -> Result<f64, String> {
    raw.parse()
        .map_err(|_| format!("unparseable {}: {}", what, raw))
}

/// Decimal places implied by a LOT_SIZE step like "0.00100000".
fn step_size_decimals(step: &str) -> Option<u32> {
    let value: f64 = step.parse().ok()?;
    if value <= 0.0 {
        return None;
    }

    let mut decimals = 0u32;
    let mut scaled = value;
    while scaled.fract().abs() > 1e-9 && decimals < 12 {
        scaled *= 10.0;
        decimals += 1;
    }
    Some(decimals)
}

impl BinanceClient {
    pub fn new(credentials: Option<ApiCredentials>) -> Self {
        Self::with_base_url(BINANCE_API_BASE.to_string(), credentials)
    }

    /// Client against an explicit base URL (tests point this at a mock).
    pub fn with_base_url(base_url: String, credentials: Option<ApiCredentials>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).unwrap());

        Self {
            client,
            base_url,
            credentials,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            precision_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Make a rate-limited public request with retry on transient errors.
    async fn get_public(&self, url: &str) -> Result<reqwest::Response, EngineError> {
        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let backoff_secs = 2u64.pow(attempt);
                        tracing::warn!(
                            "Transient error {} from exchange, retrying in {}s (attempt {}/{})",
                            status,
                            backoff_secs,
                            attempt,
                            MAX_RETRIES
                        );
                        sleep(Duration::from_secs(backoff_secs)).await;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(EngineError::DataUnavailable(format!(
                        "exchange API error ({}): {}",
                        status, body
                    )));
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let backoff_secs = 2u64.pow(attempt);
                    tracing::warn!(
                        "Network error: {}, retrying in {}s (attempt {}/{})",
                        e,
                        backoff_secs,
                        attempt,
                        MAX_RETRIES
                    );
                    sleep(Duration::from_secs(backoff_secs)).await;
                }
                Err(e) => {
                    return Err(EngineError::DataUnavailable(format!(
                        "network error after {} retries: {}",
                        MAX_RETRIES, e
                    )));
                }
            }
        }

        Err(EngineError::DataUnavailable(format!(
            "request failed after {} retries",
            MAX_RETRIES
        )))
    }

    fn signed_query(&self, params: &[(&str, String)]) -> Result<String, EngineError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            EngineError::Configuration("private endpoint requires API credentials".to_string())
        })?;

        let mut query_parts: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        query_parts.push(format!("timestamp={}", Utc::now().timestamp_millis()));

        let query = query_parts.join("&");
        let signature = credentials.sign(&query);
        Ok(format!("{}&signature={}", query, signature))
    }

    fn api_key(&self) -> Result<&str, EngineError> {
        self.credentials
            .as_ref()
            .map(|c| c.key.as_str())
            .ok_or_else(|| {
                EngineError::Configuration("private endpoint requires API credentials".to_string())
            })
    }

    /// Fetch and cache the symbol's amount precision from its LOT_SIZE
    /// filter. Called once at startup; order sizing reads the cache.
    pub async fn refresh_symbol_precision(&self, symbol: &str) -> Result<(), EngineError> {
        let exchange_symbol = to_exchange_symbol(symbol);
        let url = format!(
            "{}/api/v3/exchangeInfo?symbol={}",
            self.base_url, exchange_symbol
        );

        let response = self.get_public(&url).await?;
        let info: ExchangeInfo = response.json().await.map_err(|e| {
            EngineError::DataUnavailable(format!("failed to parse exchange info: {}", e))
        })?;

        let decimals = info
            .symbols
            .first()
            .and_then(|s| {
                s.filters
                    .iter()
                    .find(|f| f.filter_type == "LOT_SIZE")
                    .and_then(|f| f.step_size.as_deref())
                    .and_then(step_size_decimals)
            })
            .ok_or_else(|| {
                EngineError::DataUnavailable(format!(
                    "no LOT_SIZE filter declared for {}",
                    exchange_symbol
                ))
            })?;

        tracing::info!("Amount precision for {}: {} decimals", symbol, decimals);
        self.precision_cache
            .lock()
            .unwrap()
            .insert(exchange_symbol, decimals);
        Ok(())
    }

    async fn submit_order(
        &self,
        symbol: &str,
        order_side: &str,
        amount: f64,
    ) -> Result<OrderAck, EngineError> {
        let exchange_symbol = to_exchange_symbol(symbol);
        let params = [
            ("symbol", exchange_symbol.clone()),
            ("side", order_side.to_uppercase()),
            ("type", "MARKET".to_string()),
            ("quantity", format!("{}", amount)),
        ];
        let query = self.signed_query(&params)?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", self.api_key()?)
            .send()
            .await
            .map_err(|e| EngineError::Execution(format!("order request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Execution(format!(
                "order rejected ({}): {}",
                status, body
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Execution(format!("unparseable order response: {}", e)))?;

        let executed =
            parse_f64(&order.executed_qty, "executed quantity").map_err(EngineError::Execution)?;
        let quote = parse_f64(&order.cummulative_quote_qty, "quote quantity")
            .map_err(EngineError::Execution)?;

        if executed <= 0.0 {
            return Err(EngineError::Execution(format!(
                "order {} reported no executed quantity",
                order.order_id
            )));
        }

        Ok(OrderAck {
            order_id: order.order_id.to_string(),
            fill_price: quote / executed,
            amount: executed,
        })
    }
}

impl MarketDataSource for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, EngineError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            to_exchange_symbol(symbol),
            timeframe,
            limit
        );

        let response = self.get_public(&url).await?;
        let rows: Vec<KlineRow> = response
            .json()
            .await
            .map_err(|e| EngineError::DataUnavailable(format!("failed to parse klines: {}", e)))?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp = Utc.timestamp_millis_opt(row.0).single().ok_or_else(|| {
                EngineError::DataUnavailable(format!("invalid kline timestamp {}", row.0))
            })?;
            candles.push(Candle {
                timestamp,
                open: parse_f64(&row.1, "open").map_err(EngineError::DataUnavailable)?,
                high: parse_f64(&row.2, "high").map_err(EngineError::DataUnavailable)?,
                low: parse_f64(&row.3, "low").map_err(EngineError::DataUnavailable)?,
                close: parse_f64(&row.4, "close").map_err(EngineError::DataUnavailable)?,
                volume: parse_f64(&row.5, "volume").map_err(EngineError::DataUnavailable)?,
            });
        }

        tracing::debug!("Fetched {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }
}

impl ExchangeClient for BinanceClient {
    async fn get_balance(&self, currency: &str) -> Result<Balance, EngineError> {
        let query = self.signed_query(&[])?;
        let url = format!("{}/api/v3/account?{}", self.base_url, query);

        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", self.api_key()?)
            .send()
            .await
            .map_err(|e| EngineError::Execution(format!("balance request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Execution(format!(
                "balance request rejected ({}): {}",
                status, body
            )));
        }

        let account: AccountInfo = response
            .json()
            .await
            .map_err(|e| EngineError::Execution(format!("unparseable account info: {}", e)))?;

        match account.balances.iter().find(|b| b.asset == currency) {
            Some(balance) => {
                let free =
                    parse_f64(&balance.free, "free balance").map_err(EngineError::Execution)?;
                let used =
                    parse_f64(&balance.locked, "locked balance").map_err(EngineError::Execution)?;
                Ok(Balance {
                    free,
                    used,
                    total: free + used,
                })
            }
            None => {
                tracing::warn!("Currency {} not found in account balance", currency);
                Ok(Balance {
                    free: 0.0,
                    used: 0.0,
                    total: 0.0,
                })
            }
        }
    }

    async fn get_market_price(&self, symbol: &str) -> Result<f64, EngineError> {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={}",
            self.base_url,
            to_exchange_symbol(symbol)
        );

        let response = self.get_public(&url).await?;
        let ticker: TickerPrice = response
            .json()
            .await
            .map_err(|e| EngineError::DataUnavailable(format!("failed to parse ticker: {}", e)))?;

        parse_f64(&ticker.price, "ticker price").map_err(EngineError::DataUnavailable)
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        amount: f64,
        _price: f64,
    ) -> Result<OrderAck, EngineError> {
        self.submit_order(symbol, side.entry_order(), amount).await
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: Side,
        amount: f64,
        _price: f64,
    ) -> Result<OrderAck, EngineError> {
        self.submit_order(symbol, side.exit_order(), amount).await
    }

    fn amount_precision(&self, symbol: &str) -> Option<u32> {
        self.precision_cache
            .lock()
            .unwrap()
            .get(&to_exchange_symbol(symbol))
            .copied()
    }
}
