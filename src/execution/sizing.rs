/// Position sizing from available balance and risk percentage.

/// Order amount in base currency: the risked slice of the free quote
/// balance divided by price, floored to the exchange's amount precision
/// when it is known. A non-positive result means the entry cannot be
/// sized and must be aborted by the caller.
pub fn position_size(
    available_balance: f64,
    risk_percentage: f64,
    price: f64,
    precision: Option<u32>,
) -> f64 {
    if available_balance <= 0.0 || price <= 0.0 {
        return 0.0;
    }

    let risk_amount = available_balance * (risk_percentage / 100.0);
    let amount = risk_amount / price;

    match precision {
        Some(decimals) => {
            let scale = 10f64.powi(decimals as i32);
            (amount * scale).floor() / scale
        }
        None => amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sizing() {
        // 50% of 1000 USDT at a price of 100 buys 5 units.
        let amount = position_size(1000.0, 50.0, 100.0, None);
        assert!((amount - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_precision_floors_not_rounds() {
        let amount = position_size(1000.0, 50.0, 300.0, Some(3));
        // Unrounded 1.6666...; floored at 3 decimals.
        assert!((amount - 1.666).abs() < 1e-12);
    }

    #[test]
    fn test_zero_precision() {
        let amount = position_size(10_000.0, 50.0, 300.0, Some(0));
        assert_eq!(amount, 16.0);
    }

    #[test]
    fn test_empty_balance_gives_zero() {
        assert_eq!(position_size(0.0, 50.0, 100.0, None), 0.0);
        assert_eq!(position_size(-5.0, 50.0, 100.0, None), 0.0);
    }

    #[test]
    fn test_degenerate_price_gives_zero() {
        assert_eq!(position_size(1000.0, 50.0, 0.0, None), 0.0);
    }

    #[test]
    fn test_dust_floors_to_zero() {
        // Sized amount below the smallest representable step.
        let amount = position_size(1.0, 1.0, 50_000.0, Some(4));
        assert_eq!(amount, 0.0);
    }
}
