/// Average True Range (ATR) indicator
///
/// Measures market volatility from the true range of each candle.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// The first candle has no previous close, so its true range degrades to
/// high - low. ATR is the simple rolling mean of the true range over the
/// period, undefined until `period` candles are available.
use crate::models::Candle;

/// True range per candle; same length as the input.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                c.high - c.low
            } else {
                let prev_close = candles[i - 1].close;
                (c.high - c.low)
                    .max((c.high - prev_close).abs())
                    .max((c.low - prev_close).abs())
            }
        })
        .collect()
}

/// Calculate the ATR series. Entries before `period` candles are None.
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if period == 0 || candles.len() < period {
        return out;
    }

    let ranges = true_ranges(candles);
    let mut window_sum: f64 = ranges.iter().take(period).sum();
    out[period - 1] = Some(window_sum / period as f64);

    for i in period..ranges.len() {
        window_sum += ranges[i] - ranges[i - period];
        out[i] = Some(window_sum / period as f64);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn create_test_candles(prices: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Candle {
                timestamp: Utc::now() + Duration::hours(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_first_true_range_is_high_minus_low() {
        let candles = create_test_candles(&[(100.0, 108.0, 97.0, 105.0)]);
        let ranges = true_ranges(&candles);
        assert!((ranges[0] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_true_range_accounts_for_gaps() {
        // Second candle gaps well above the previous close.
        let candles = create_test_candles(&[
            (100.0, 101.0, 99.0, 100.0),
            (120.0, 121.0, 119.0, 120.0),
        ]);
        let ranges = true_ranges(&candles);
        // max(121-119, |121-100|, |119-100|) = 21
        assert!((ranges[1] - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_atr_constant_range() {
        let prices = vec![(100.0, 101.0, 99.0, 100.0); 20];
        let candles = create_test_candles(&prices);
        let atr = atr_series(&candles, 14);

        for value in atr.iter().take(13) {
            assert!(value.is_none());
        }
        for value in atr.iter().skip(13) {
            assert!((value.unwrap() - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_atr_rolling_mean() {
        let candles = create_test_candles(&[
            (100.0, 102.0, 98.0, 100.0), // TR 4
            (100.0, 101.0, 99.0, 100.0), // TR 2
            (100.0, 103.0, 97.0, 100.0), // TR 6
            (100.0, 101.0, 99.0, 100.0), // TR 2
        ]);
        let atr = atr_series(&candles, 2);

        assert!(atr[0].is_none());
        assert!((atr[1].unwrap() - 3.0).abs() < 1e-9);
        assert!((atr[2].unwrap() - 4.0).abs() < 1e-9);
        assert!((atr[3].unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_atr_higher_in_volatile_market() {
        let quiet = create_test_candles(&[(100.0, 101.0, 99.0, 100.0); 15]);
        let volatile = create_test_candles(&[(100.0, 110.0, 90.0, 105.0); 15]);

        let quiet_atr = atr_series(&quiet, 14).last().unwrap().unwrap();
        let volatile_atr = atr_series(&volatile, 14).last().unwrap().unwrap();
        assert!(volatile_atr > quiet_atr * 5.0);
    }

    #[test]
    fn test_atr_insufficient_data() {
        let candles = create_test_candles(&[(100.0, 101.0, 99.0, 100.0); 5]);
        let atr = atr_series(&candles, 14);
        assert!(atr.iter().all(|v| v.is_none()));
    }
}
