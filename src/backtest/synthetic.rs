use crate::models::Candle;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy)]
pub enum MarketScenario {
    /// Steady uptrend with noise (+2% daily average)
    Uptrend,
    /// Steady downtrend with noise (-2% daily average)
    Downtrend,
    /// Sideways/choppy market, mean-reverting around the base price
    Sideways,
    /// High volatility, large swings per candle
    Volatile,
}

/// Seeded generator of synthetic candle histories.
///
/// Stands in for the market-data capability in tests and backtest
/// experiments; it is not part of the engine contract.
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 30_000.0,
            base_volume: 1_000.0,
        }
    }

    /// Generate `num_candles` candles spaced `interval_minutes` apart,
    /// starting from a fixed epoch so runs are fully deterministic.
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let start_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let drift_per_interval = match scenario {
            MarketScenario::Uptrend => 0.02 / (24.0 * 60.0 / interval_minutes as f64),
            MarketScenario::Downtrend => -0.02 / (24.0 * 60.0 / interval_minutes as f64),
            MarketScenario::Sideways | MarketScenario::Volatile => 0.0,
        };

        let mut candles = Vec::with_capacity(num_candles);
        let mut current_price = self.base_price;

        for i in 0..num_candles {
            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);

            match scenario {
                MarketScenario::Uptrend | MarketScenario::Downtrend => {
                    let drift = current_price * drift_per_interval;
                    let noise = current_price * self.rng.gen_range(-0.001..0.001);
                    current_price += drift + noise;
                }
                MarketScenario::Sideways => {
                    let reversion = (self.base_price - current_price) * 0.1;
                    let noise = current_price * self.rng.gen_range(-0.01..0.01);
                    current_price += reversion + noise;
                }
                MarketScenario::Volatile => {
                    let change = current_price * self.rng.gen_range(-0.05..0.05);
                    current_price = (current_price + change).max(self.base_price * 0.5);
                }
            }

            candles.push(self.create_candle(current_price, timestamp));
        }

        candles
    }

    /// Build a plausible OHLCV candle around a close price.
    fn create_candle(&mut self, price: f64, timestamp: DateTime<Utc>) -> Candle {
        let noise_pct = 0.002;

        let high = price * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = price * (1.0 - self.rng.gen_range(0.0..noise_pct));
        let open = (price * (1.0 + self.rng.gen_range(-noise_pct..noise_pct))).clamp(low, high);
        let volume = self.base_volume * self.rng.gen_range(0.7..1.3);

        Candle {
            timestamp,
            open,
            high,
            low,
            close: price,
            volume,
        }
    }
}
