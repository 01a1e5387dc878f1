/// Per-candle indicator assembly.
///
/// A frame carries every derived value for one candle. A None field means
/// "not yet computable" for that candle (warm-up window).
use crate::error::EngineError;
use crate::models::Candle;

use super::atr::atr_series;
use super::ema::ema_series;
use super::macd::macd_series;
use super::vwap::vwap_series;

/// Periods for every derived series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub ema_short: usize,
    pub ema_long: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub vwap_lookback: usize,
    pub atr_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_short: 9,
            ema_long: 21,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            vwap_lookback: 14,
            atr_period: 14,
        }
    }
}

impl IndicatorParams {
    /// Candles to skip before every frame field is defined, with a small
    /// guard margin so crossover detection always has a previous frame.
    pub fn warmup_len(&self) -> usize {
        let slowest = self
            .ema_long
            .max(self.macd_slow)
            .max(self.vwap_lookback)
            .max(self.atr_period);
        slowest + 2
    }
}

/// Derived values for a single candle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorFrame {
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub vwap_middle: Option<f64>,
    pub vwap_upper: Option<f64>,
    pub vwap_lower: Option<f64>,
    pub atr: Option<f64>,
}

/// Compute one frame per candle.
///
/// Fails with a computation error when an indicator hits an undefined
/// precondition (e.g. a zero-volume VWAP window).
pub fn compute_frames(
    candles: &[Candle],
    params: &IndicatorParams,
) -> Result<Vec<IndicatorFrame>, EngineError> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let ema_short = ema_series(&closes, params.ema_short);
    let ema_long = ema_series(&closes, params.ema_long);
    let macd = macd_series(
        &closes,
        params.macd_fast,
        params.macd_slow,
        params.macd_signal,
    );
    let vwap = vwap_series(candles, params.vwap_lookback)?;
    let atr = atr_series(candles, params.atr_period);

    let mut frames = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        frames.push(IndicatorFrame {
            ema_short: ema_short.get(i).copied(),
            ema_long: ema_long.get(i).copied(),
            macd_line: macd[i].map(|p| p.line),
            macd_signal: macd[i].map(|p| p.signal),
            macd_hist: macd[i].map(|p| p.histogram),
            vwap_middle: vwap[i].map(|p| p.middle),
            vwap_upper: vwap[i].map(|p| p.upper),
            vwap_lower: vwap[i].map(|p| p.lower),
            atr: atr[i],
        });
    }

    Ok(frames)
}
