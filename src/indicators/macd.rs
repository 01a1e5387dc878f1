/// MACD (Moving Average Convergence Divergence)
///
/// MACD line = EMA(close, fast) - EMA(close, slow)
/// Signal line = EMA(MACD line, signal)
/// Histogram = MACD line - Signal line
///
/// All three values are undefined until the slow EMA warm-up completes
/// (index < slow - 1). The signal EMA is seeded at the first defined MACD
/// line value, the same seeding convention the EMA itself uses.
use super::ema::ema_series;

/// One MACD sample: line, signal and histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Calculate the MACD series. Entries before the slow warm-up are None.
pub fn macd_series(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<Option<MacdPoint>> {
    if values.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return vec![None; values.len()];
    }

    let ema_fast = ema_series(values, fast);
    let ema_slow = ema_series(values, slow);
    let warmup = slow - 1;

    let mut out = vec![None; values.len()];
    if values.len() <= warmup {
        return out;
    }

    let line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .skip(warmup)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema_series(&line, signal_period);

    for (offset, (&l, &s)) in line.iter().zip(signal.iter()).enumerate() {
        out[warmup + offset] = Some(MacdPoint {
            line: l,
            signal: s,
            histogram: l - s,
        });
    }

    out
}
