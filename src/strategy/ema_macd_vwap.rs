use super::events::{band_proximity, detect_crossover, Crossover, VwapBand};
use crate::indicators::{IndicatorFrame, IndicatorParams};
use crate::models::Side;

/// Tunable parameters for the EMA-MACD-VWAP strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    pub ema_short: usize,
    pub ema_long: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub vwap_lookback: usize,
    pub vwap_band_threshold: f64,
    pub atr_period: usize,
    pub stop_loss_atr: f64,
    pub take_profit1_atr: f64,
    pub take_profit2_atr: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            ema_short: 9,
            ema_long: 21,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            vwap_lookback: 14,
            vwap_band_threshold: 0.0015,
            atr_period: 14,
            stop_loss_atr: 2.0,
            take_profit1_atr: 3.0,
            take_profit2_atr: 5.0,
        }
    }
}

/// An accepted entry setup: direction plus the ATR-derived exit levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub side: Side,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub atr: f64,
    pub band: VwapBand,
}

/// Rules strategy: enter when the EMA pair and the MACD pair cross in the
/// same direction while price sits near a VWAP band; exit an open position
/// when both pairs cross the opposite way.
#[derive(Debug, Clone)]
pub struct EmaMacdVwapStrategy {
    params: StrategyParams,
}

impl EmaMacdVwapStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            ema_short: self.params.ema_short,
            ema_long: self.params.ema_long,
            macd_fast: self.params.macd_fast,
            macd_slow: self.params.macd_slow,
            macd_signal: self.params.macd_signal,
            vwap_lookback: self.params.vwap_lookback,
            atr_period: self.params.atr_period,
        }
    }

    /// Candles required before the first decision can be made.
    pub fn warmup_len(&self) -> usize {
        self.indicator_params().warmup_len()
    }

    /// EMA and MACD crossovers between two consecutive frames, or None
    /// while either pair is still warming up.
    fn crossovers(
        &self,
        prev: &IndicatorFrame,
        curr: &IndicatorFrame,
    ) -> Option<(Crossover, Crossover)> {
        let ema = detect_crossover(
            curr.ema_short?,
            curr.ema_long?,
            prev.ema_short?,
            prev.ema_long?,
        );
        let macd = detect_crossover(
            curr.macd_line?,
            curr.macd_signal?,
            prev.macd_line?,
            prev.macd_signal?,
        );
        Some((ema, macd))
    }

    /// Evaluate the entry conditions on the latest tick.
    ///
    /// Long: both crossovers bullish and price near any VWAP band.
    /// Short: both bearish near a band, exit levels mirrored.
    pub fn evaluate_entry(
        &self,
        prev: &IndicatorFrame,
        curr: &IndicatorFrame,
        price: f64,
    ) -> Option<EntrySignal> {
        let band = band_proximity(
            price,
            curr.vwap_middle?,
            curr.vwap_upper?,
            curr.vwap_lower?,
            self.params.vwap_band_threshold,
        )?;

        let (ema_cross, macd_cross) = self.crossovers(prev, curr)?;
        let atr = curr.atr?;

        match (ema_cross, macd_cross) {
            (Crossover::Bullish, Crossover::Bullish) => {
                tracing::info!(
                    "LONG signal - EMA and MACD bullish crossover near VWAP {} band",
                    band
                );
                Some(EntrySignal {
                    side: Side::Long,
                    price,
                    stop_loss: price - atr * self.params.stop_loss_atr,
                    take_profit_1: price + atr * self.params.take_profit1_atr,
                    take_profit_2: price + atr * self.params.take_profit2_atr,
                    atr,
                    band,
                })
            }
            (Crossover::Bearish, Crossover::Bearish) => {
                tracing::info!(
                    "SHORT signal - EMA and MACD bearish crossover near VWAP {} band",
                    band
                );
                Some(EntrySignal {
                    side: Side::Short,
                    price,
                    stop_loss: price + atr * self.params.stop_loss_atr,
                    take_profit_1: price - atr * self.params.take_profit1_atr,
                    take_profit_2: price - atr * self.params.take_profit2_atr,
                    atr,
                    band,
                })
            }
            _ => None,
        }
    }

    /// Whether an open position on `side` should exit on this tick: both
    /// crossovers against the position. Independent of stop/target checks.
    pub fn exit_signal(&self, prev: &IndicatorFrame, curr: &IndicatorFrame, side: Side) -> bool {
        let Some((ema_cross, macd_cross)) = self.crossovers(prev, curr) else {
            return false;
        };

        match side {
            Side::Long => ema_cross == Crossover::Bearish && macd_cross == Crossover::Bearish,
            Side::Short => ema_cross == Crossover::Bullish && macd_cross == Crossover::Bullish,
        }
    }
}

impl Default for EmaMacdVwapStrategy {
    fn default() -> Self {
        Self::new(StrategyParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(
        ema_short: f64,
        ema_long: f64,
        macd_line: f64,
        macd_signal: f64,
    ) -> IndicatorFrame {
        IndicatorFrame {
            ema_short: Some(ema_short),
            ema_long: Some(ema_long),
            macd_line: Some(macd_line),
            macd_signal: Some(macd_signal),
            macd_hist: Some(macd_line - macd_signal),
            vwap_middle: Some(100.0),
            vwap_upper: Some(105.0),
            vwap_lower: Some(95.0),
            atr: Some(2.0),
        }
    }

    #[test]
    fn test_long_entry_near_middle_band() {
        let strategy = EmaMacdVwapStrategy::default();
        let prev = frame(100.0, 101.0, -0.5, 0.0);
        let curr = frame(102.0, 101.0, 0.5, 0.0);

        let entry = strategy.evaluate_entry(&prev, &curr, 100.05).unwrap();
        assert_eq!(entry.side, Side::Long);
        assert_eq!(entry.band, VwapBand::Middle);
        assert!((entry.stop_loss - (100.05 - 4.0)).abs() < 1e-9);
        assert!((entry.take_profit_1 - (100.05 + 6.0)).abs() < 1e-9);
        assert!((entry.take_profit_2 - (100.05 + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_short_entry_levels_mirrored() {
        let strategy = EmaMacdVwapStrategy::default();
        let prev = frame(102.0, 101.0, 0.5, 0.0);
        let curr = frame(100.0, 101.0, -0.5, 0.0);

        let entry = strategy.evaluate_entry(&prev, &curr, 100.05).unwrap();
        assert_eq!(entry.side, Side::Short);
        assert!(entry.stop_loss > entry.price);
        assert!(entry.take_profit_1 < entry.price);
        assert!(entry.take_profit_2 < entry.take_profit_1);
    }

    #[test]
    fn test_no_entry_away_from_bands() {
        let strategy = EmaMacdVwapStrategy::default();
        let prev = frame(100.0, 101.0, -0.5, 0.0);
        let curr = frame(102.0, 101.0, 0.5, 0.0);

        // Both crossovers fire, but 97 is not within 0.15% of any band.
        assert!(strategy.evaluate_entry(&prev, &curr, 97.0).is_none());
    }

    #[test]
    fn test_no_entry_on_disagreeing_crossovers() {
        let strategy = EmaMacdVwapStrategy::default();
        let prev = frame(100.0, 101.0, 0.5, 0.0);
        let curr = frame(102.0, 101.0, -0.5, 0.0);

        assert!(strategy.evaluate_entry(&prev, &curr, 100.05).is_none());
    }

    #[test]
    fn test_no_entry_during_warmup() {
        let strategy = EmaMacdVwapStrategy::default();
        let mut prev = frame(100.0, 101.0, -0.5, 0.0);
        let curr = frame(102.0, 101.0, 0.5, 0.0);
        prev.macd_line = None;

        assert!(strategy.evaluate_entry(&prev, &curr, 100.05).is_none());
    }

    #[test]
    fn test_exit_signal_for_long() {
        let strategy = EmaMacdVwapStrategy::default();
        let prev = frame(102.0, 101.0, 0.5, 0.0);
        let curr = frame(100.0, 101.0, -0.5, 0.0);

        assert!(strategy.exit_signal(&prev, &curr, Side::Long));
        assert!(!strategy.exit_signal(&prev, &curr, Side::Short));
    }

    #[test]
    fn test_exit_signal_for_short() {
        let strategy = EmaMacdVwapStrategy::default();
        let prev = frame(100.0, 101.0, -0.5, 0.0);
        let curr = frame(102.0, 101.0, 0.5, 0.0);

        assert!(strategy.exit_signal(&prev, &curr, Side::Short));
        assert!(!strategy.exit_signal(&prev, &curr, Side::Long));
    }

    #[test]
    fn test_single_crossover_does_not_exit() {
        let strategy = EmaMacdVwapStrategy::default();
        // Only the EMA pair crosses down; MACD keeps rising.
        let prev = frame(102.0, 101.0, -0.5, 0.0);
        let curr = frame(100.0, 101.0, 0.5, 0.0);

        assert!(!strategy.exit_signal(&prev, &curr, Side::Long));
    }

    #[test]
    fn test_warmup_len_tracks_slowest_indicator() {
        let strategy = EmaMacdVwapStrategy::default();
        assert!(strategy.warmup_len() >= 26);
    }
}
