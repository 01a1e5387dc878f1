/// Crossover and band-proximity event detection.
///
/// Both detectors are pure functions of their scalar inputs; all state
/// (current vs previous frame) is supplied by the caller.

/// Outcome of comparing two series across consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Bullish,
    Bearish,
    None,
}

/// Detect a crossover of series `a` over series `b` between two ticks.
///
/// Bullish: previously a <= b, now a > b. Bearish: previously a >= b, now
/// a < b. Equality counts toward a crossover being "about to happen", not
/// yet happened; the strict inequality on the current tick decides.
pub fn detect_crossover(curr_a: f64, curr_b: f64, prev_a: f64, prev_b: f64) -> Crossover {
    if prev_a <= prev_b && curr_a > curr_b {
        Crossover::Bullish
    } else if prev_a >= prev_b && curr_a < curr_b {
        Crossover::Bearish
    } else {
        Crossover::None
    }
}

/// Which VWAP band a price is near.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VwapBand {
    Lower,
    Middle,
    Upper,
}

impl std::fmt::Display for VwapBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VwapBand::Lower => write!(f, "lower"),
            VwapBand::Middle => write!(f, "middle"),
            VwapBand::Upper => write!(f, "upper"),
        }
    }
}

/// Check whether the price sits within `threshold` (a fraction of each
/// band's own magnitude, so the window is asymmetric for asymmetric bands)
/// of any VWAP band. First match in the order lower, middle, upper wins.
pub fn band_proximity(
    price: f64,
    middle: f64,
    upper: f64,
    lower: f64,
    threshold: f64,
) -> Option<VwapBand> {
    if (price - lower).abs() <= lower * threshold {
        Some(VwapBand::Lower)
    } else if (price - middle).abs() <= middle * threshold {
        Some(VwapBand::Middle)
    } else if (price - upper).abs() <= upper * threshold {
        Some(VwapBand::Upper)
    } else {
        None
    }
}
