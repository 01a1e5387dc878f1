/// Rolling VWAP (Volume Weighted Average Price) with bands
///
/// typical price = (high + low + close) / 3
/// middle = rolling sum(tp * volume) / rolling sum(volume)
/// band half-width = 2 x rolling sample standard deviation of typical price
/// upper / lower = middle +/- half-width
///
/// Values are undefined until `lookback` candles are available. A window
/// whose traded volume sums to zero has no volume-weighted price at all;
/// that is a computation error and is surfaced immediately rather than
/// silently defaulted.
use crate::error::EngineError;
use crate::models::Candle;

/// One VWAP sample: middle line plus the two-sigma envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VwapPoint {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Calculate the rolling VWAP band series.
///
/// Entries before `lookback` candles are None. Lookbacks below 2 cannot
/// carry a standard deviation and yield an all-None series.
pub fn vwap_series(
    candles: &[Candle],
    lookback: usize,
) -> Result<Vec<Option<VwapPoint>>, EngineError> {
    let mut out = vec![None; candles.len()];
    if lookback < 2 || candles.len() < lookback {
        return Ok(out);
    }

    let typical: Vec<f64> = candles
        .iter()
        .map(|c| (c.high + c.low + c.close) / 3.0)
        .collect();

    for i in (lookback - 1)..candles.len() {
        let start = i + 1 - lookback;
        let window = &candles[start..=i];
        let tp_window = &typical[start..=i];

        let volume_sum: f64 = window.iter().map(|c| c.volume).sum();
        if volume_sum <= 0.0 {
            return Err(EngineError::Computation(format!(
                "VWAP window ending at {} has zero traded volume",
                window[window.len() - 1].timestamp
            )));
        }

        let weighted_sum: f64 = window
            .iter()
            .zip(tp_window.iter())
            .map(|(c, tp)| tp * c.volume)
            .sum();
        let middle = weighted_sum / volume_sum;

        // Sample standard deviation of the typical price over the window.
        let mean = tp_window.iter().sum::<f64>() / lookback as f64;
        let variance = tp_window
            .iter()
            .map(|tp| (tp - mean).powi(2))
            .sum::<f64>()
            / (lookback - 1) as f64;
        let half_width = 2.0 * variance.sqrt();

        out[i] = Some(VwapPoint {
            middle,
            upper: middle + half_width,
            lower: middle - half_width,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn make_candles(closes: &[f64], volume: f64) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: Utc::now() + Duration::minutes(i as i64 * 15),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume,
            })
            .collect()
    }

    #[test]
    fn test_vwap_undefined_during_warmup() {
        let candles = make_candles(&[100.0, 101.0, 102.0, 103.0, 104.0], 1000.0);
        let vwap = vwap_series(&candles, 3).unwrap();

        assert!(vwap[0].is_none());
        assert!(vwap[1].is_none());
        assert!(vwap[2].is_some());
        assert_eq!(vwap.len(), candles.len());
    }

    #[test]
    fn test_vwap_band_ordering() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 8.0)
            .collect();
        let candles = make_candles(&closes, 1200.0);
        let vwap = vwap_series(&candles, 14).unwrap();

        for point in vwap.iter().flatten() {
            assert!(point.lower <= point.middle);
            assert!(point.middle <= point.upper);
        }
    }

    #[test]
    fn test_vwap_flat_prices_collapse_bands() {
        let candles = make_candles(&[100.0; 20], 1000.0);
        let vwap = vwap_series(&candles, 5).unwrap();

        let point = vwap.last().unwrap().unwrap();
        assert!((point.middle - 100.0).abs() < 1e-9);
        assert!((point.upper - point.lower).abs() < 1e-9);
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        // Two prices, all the volume on the second: the middle sits there.
        let mut candles = make_candles(&[100.0, 200.0], 1.0);
        candles[1].volume = 1_000_000.0;

        let vwap = vwap_series(&candles, 2).unwrap();
        let point = vwap[1].unwrap();
        assert!(point.middle > 199.0);
    }

    #[test]
    fn test_vwap_zero_volume_is_error() {
        let candles = make_candles(&[100.0, 101.0, 102.0], 0.0);
        let result = vwap_series(&candles, 2);

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("zero traded volume"));
    }

    #[test]
    fn test_vwap_degenerate_lookback() {
        let candles = make_candles(&[100.0, 101.0, 102.0], 1000.0);
        let vwap = vwap_series(&candles, 1).unwrap();
        assert!(vwap.iter().all(|p| p.is_none()));
    }
}
