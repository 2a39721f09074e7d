use thiserror::Error;

/// Errors raised by the calculation engines and their configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid price {field}={value}: must be positive and finite")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("invalid input {field}={value}: {reason}")]
    InvalidInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("position too small: {capital:.2} buys no shares at {price}")]
    PositionTooSmall { capital: f64, price: f64 },

    #[error("stop price {stop} equals entry price {entry}")]
    StopEqualsEntry { entry: f64, stop: f64 },

    #[error("no entry price set on calculator")]
    MissingEntryPrice,
}

pub type TradeResult<T> = std::result::Result<T, TradeError>;

/// Reject prices that are zero, negative or not finite
pub(crate) fn ensure_price(field: &'static str, value: f64) -> TradeResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(TradeError::InvalidPrice { field, value })
    }
}

/// Reject amounts that are negative or not finite (zero is allowed)
pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> TradeResult<f64> {
    if !value.is_finite() {
        return Err(TradeError::InvalidInput {
            field,
            value,
            reason: "must be finite",
        });
    }
    if value < 0.0 {
        return Err(TradeError::InvalidInput {
            field,
            value,
            reason: "must not be negative",
        });
    }
    Ok(value)
}

pub(crate) fn ensure_finite(field: &'static str, value: f64) -> TradeResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TradeError::InvalidInput {
            field,
            value,
            reason: "must be finite",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_price() {
        assert_eq!(ensure_price("entry_price", 20.0), Ok(20.0));
        assert!(matches!(
            ensure_price("entry_price", 0.0),
            Err(TradeError::InvalidPrice { .. })
        ));
        assert!(ensure_price("entry_price", f64::NAN).is_err());
    }

    #[test]
    fn test_ensure_non_negative_allows_zero() {
        assert_eq!(ensure_non_negative("commission", 0.0), Ok(0.0));
        assert!(matches!(
            ensure_non_negative("commission", -1.0),
            Err(TradeError::InvalidInput { field: "commission", .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = TradeError::StopEqualsEntry {
            entry: 20.0,
            stop: 20.0,
        };
        assert_eq!(err.to_string(), "stop price 20 equals entry price 20");
    }
}
