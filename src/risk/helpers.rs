use crate::error::{ensure_finite, TradeError, TradeResult};

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

/// Number of `minutes_per_bar` bars spanning `days` days
///
/// Used to translate a daily moving-average period into an intraday one,
/// e.g. 1 day on 5 minute bars is 288 bars.
pub fn convert_period(days: f64, minutes_per_bar: f64) -> TradeResult<f64> {
    let days = ensure_finite("days", days)?;
    if !minutes_per_bar.is_finite() || minutes_per_bar <= 0.0 {
        return Err(TradeError::InvalidInput {
            field: "minutes_per_bar",
            value: minutes_per_bar,
            reason: "must be positive",
        });
    }

    Ok(days * MINUTES_PER_DAY / minutes_per_bar)
}

/// `price` reduced by `fraction` (0.02 = 2%)
pub fn price_after_loss(price: f64, fraction: f64) -> f64 {
    price * (1.0 - fraction)
}

/// Fractional decrease going from `price_a` to `price_b`
pub fn loss_fraction(price_a: f64, price_b: f64) -> TradeResult<f64> {
    if price_a == 0.0 || !price_a.is_finite() {
        return Err(TradeError::InvalidPrice {
            field: "price_a",
            value: price_a,
        });
    }
    let price_b = ensure_finite("price_b", price_b)?;

    Ok((price_a - price_b) / price_a)
}

/// Stop placed one ATR below the EMA at the point of purchase
pub fn stop_from_volatility(ema: f64, atr: f64) -> f64 {
    ema - atr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_period() {
        assert_eq!(convert_period(1.0, 5.0).unwrap(), 288.0);
        assert_eq!(convert_period(2.0, 60.0).unwrap(), 48.0);
        assert_eq!(convert_period(0.5, 1.0).unwrap(), 720.0);
    }

    #[test]
    fn test_convert_period_rejects_zero_bar() {
        assert!(matches!(
            convert_period(1.0, 0.0),
            Err(TradeError::InvalidInput {
                field: "minutes_per_bar",
                ..
            })
        ));
        assert!(convert_period(1.0, -5.0).is_err());
    }

    #[test]
    fn test_price_after_loss() {
        assert!((price_after_loss(100.0, 0.08) - 92.0).abs() < 1e-9);
        assert_eq!(price_after_loss(100.0, 0.0), 100.0);
    }

    #[test]
    fn test_loss_fraction() {
        assert!((loss_fraction(100.0, 92.0).unwrap() - 0.08).abs() < 1e-12);
        // Gains show up as negative loss
        assert!(loss_fraction(100.0, 110.0).unwrap() < 0.0);
    }

    #[test]
    fn test_loss_fraction_zero_reference() {
        assert!(matches!(
            loss_fraction(0.0, 10.0),
            Err(TradeError::InvalidPrice { field: "price_a", .. })
        ));
    }

    #[test]
    fn test_loss_fraction_inverts_price_after_loss() {
        let price = 57.3;
        let lowered = price_after_loss(price, 0.035);
        assert!((loss_fraction(price, lowered).unwrap() - 0.035).abs() < 1e-12);
    }

    #[test]
    fn test_stop_from_volatility() {
        assert_eq!(stop_from_volatility(20.5, 0.5), 20.0);
        assert_eq!(stop_from_volatility(1.0, 2.0), -1.0);
    }
}
