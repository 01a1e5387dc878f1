/// Exponential Moving Average (EMA)
///
/// Smoothing factor alpha = 2 / (period + 1). The first output value is
/// seeded with the first input value rather than left undefined, so the
/// series is defined from index 0 and has the same length as the input.

/// Calculate an EMA series over the input values.
///
/// Returns an empty vector for a zero period or empty input.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());

    let mut ema = values[0];
    out.push(ema);

    for &value in &values[1..] {
        ema = alpha * value + (1.0 - alpha) * ema;
        out.push(ema);
    }

    out
}

/// Latest EMA value over the input, or None if the input is empty.
pub fn ema_latest(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rolling_std(values: &[f64]) -> f64 {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        var.sqrt()
    }

    #[test]
    fn test_ema_length_matches_input() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        for period in [1, 5, 9, 21] {
            assert_eq!(ema_series(&values, period).len(), values.len());
        }
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let values = vec![103.5, 104.0, 105.0, 104.5];
        let ema = ema_series(&values, 9);
        assert_eq!(ema[0], 103.5);
    }

    #[test]
    fn test_ema_recurrence() {
        let values = vec![100.0, 110.0];
        let ema = ema_series(&values, 3);
        // alpha = 0.5: 0.5 * 110 + 0.5 * 100 = 105
        assert!((ema[1] - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_ema_period_one_tracks_input() {
        let values = vec![100.0, 105.0, 95.0, 110.0];
        let ema = ema_series(&values, 1);
        for (e, v) in ema.iter().zip(values.iter()) {
            assert!((e - v).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ema_smoother_than_input() {
        // EMA output should be no more volatile than the input series.
        let values: Vec<f64> = (0..100)
            .map(|i| 100.0 + if i % 2 == 0 { 5.0 } else { -5.0 })
            .collect();
        let ema = ema_series(&values, 10);
        assert!(rolling_std(&ema) <= rolling_std(&values));
    }

    #[test]
    fn test_ema_empty_and_zero_period() {
        assert!(ema_series(&[], 9).is_empty());
        assert!(ema_series(&[100.0, 101.0], 0).is_empty());
        assert!(ema_latest(&[], 9).is_none());
    }

    #[test]
    fn test_ema_converges_toward_constant() {
        let values = vec![100.0; 60];
        let ema = ema_series(&values, 9);
        assert!((ema.last().unwrap() - 100.0).abs() < 1e-12);
    }
}
