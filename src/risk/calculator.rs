use serde::{Deserialize, Serialize};
use std::fmt;

use super::sizing::{self, Gain, RiskStop, ShareCount};
use crate::error::{ensure_non_negative, ensure_price, TradeError, TradeResult};

/// Account constraints for one trade-sizing scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub capital: f64,
    pub commission: f64,
    pub risk_tolerance: f64,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            capital: 4000.0,      // money committed to one trade
            commission: 5.0,      // charged on entry and again on exit
            risk_tolerance: 50.0, // 1R
        }
    }
}

impl CalculatorConfig {
    pub fn with_capital(mut self, capital: f64) -> Self {
        self.capital = capital;
        self
    }

    pub fn with_commission(mut self, commission: f64) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_risk_tolerance(mut self, risk_tolerance: f64) -> Self {
        self.risk_tolerance = risk_tolerance;
        self
    }

    /// Validate and build the calculator
    pub fn build(self) -> TradeResult<PositionCalculator> {
        PositionCalculator::new(self)
    }
}

/// Gain/risk calculator bound to one scenario
///
/// Values are immutable. Revising capital, commission, tolerance or entry
/// goes through a `with_*` transition that validates and returns a new value,
/// so nothing derived from the old inputs can go stale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionCalculator {
    capital: f64,
    commission: f64,
    risk_tolerance: f64,
    entry_price: Option<f64>,
}

impl PositionCalculator {
    pub fn new(config: CalculatorConfig) -> TradeResult<Self> {
        Ok(Self {
            capital: ensure_non_negative("capital", config.capital)?,
            commission: ensure_non_negative("commission", config.commission)?,
            risk_tolerance: ensure_non_negative("risk_tolerance", config.risk_tolerance)?,
            entry_price: None,
        })
    }

    /// Build a calculator from an entry/stop pair
    ///
    /// Fixes the entry price, then commits exactly the capital `capital_for_stop`
    /// asks for.
    pub fn with_buy_and_stop(
        entry_price: f64,
        stop_price: f64,
        risk_tolerance: f64,
        commission: f64,
    ) -> TradeResult<Self> {
        let capital = sizing::capital_for_stop(entry_price, stop_price, risk_tolerance, commission)?;

        tracing::debug!(
            entry = entry_price,
            stop = stop_price,
            capital,
            "Solved capital for stop"
        );

        CalculatorConfig {
            capital,
            commission,
            risk_tolerance,
        }
        .build()?
        .with_entry_price(entry_price)
    }

    pub fn with_capital(self, capital: f64) -> TradeResult<Self> {
        Ok(Self {
            capital: ensure_non_negative("capital", capital)?,
            ..self
        })
    }

    pub fn with_commission(self, commission: f64) -> TradeResult<Self> {
        Ok(Self {
            commission: ensure_non_negative("commission", commission)?,
            ..self
        })
    }

    pub fn with_risk_tolerance(self, risk_tolerance: f64) -> TradeResult<Self> {
        Ok(Self {
            risk_tolerance: ensure_non_negative("risk_tolerance", risk_tolerance)?,
            ..self
        })
    }

    pub fn with_entry_price(self, entry_price: f64) -> TradeResult<Self> {
        Ok(Self {
            entry_price: Some(ensure_price("entry_price", entry_price)?),
            ..self
        })
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn risk_tolerance(&self) -> f64 {
        self.risk_tolerance
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    fn entry(&self) -> TradeResult<f64> {
        self.entry_price.ok_or(TradeError::MissingEntryPrice)
    }

    /// Shares the configured capital buys at the entry price
    pub fn num_shares(&self) -> TradeResult<ShareCount> {
        sizing::num_shares(self.entry()?, self.capital)
    }

    /// Shares the configured capital buys at an arbitrary price
    pub fn shares_at(&self, price: f64) -> TradeResult<ShareCount> {
        sizing::num_shares(price, self.capital)
    }

    /// Gain if the position is sold at `exit_price`
    pub fn gain(&self, exit_price: f64) -> TradeResult<Gain> {
        sizing::gain(self.entry()?, exit_price, self.capital, self.commission)
    }

    /// Stop placement that caps the loss at 1R
    pub fn risk_stop(&self) -> TradeResult<RiskStop> {
        sizing::risk_stop_from_capital(
            self.entry()?,
            self.capital,
            self.risk_tolerance,
            self.commission,
        )
    }

    /// Capital needed for a stop at `stop_price` to lose at most 1R
    ///
    /// Usually fed back through `with_capital` once the trader settles on it.
    pub fn capital_for_stop(&self, stop_price: f64) -> TradeResult<f64> {
        sizing::capital_for_stop(
            self.entry()?,
            stop_price,
            self.risk_tolerance,
            self.commission,
        )
    }
}

impl Default for PositionCalculator {
    fn default() -> Self {
        let config = CalculatorConfig::default();
        Self {
            capital: config.capital,
            commission: config.commission,
            risk_tolerance: config.risk_tolerance,
            entry_price: None,
        }
    }
}

impl fmt::Display for PositionCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PositionCalculator(capital={:.2}, commission={:.2}, risk_tolerance={:.2}",
            self.capital, self.commission, self.risk_tolerance
        )?;
        match self.entry_price {
            Some(entry) => write!(f, ", entry={})", entry),
            None => write!(f, ")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let calc = PositionCalculator::default();
        assert_eq!(calc.capital(), 4000.0);
        assert_eq!(calc.commission(), 5.0);
        assert_eq!(calc.risk_tolerance(), 50.0);
        assert_eq!(calc.entry_price(), None);
        assert_eq!(CalculatorConfig::default().build().unwrap(), calc);
    }

    #[test]
    fn test_reference_scenario() {
        let calc = PositionCalculator::default().with_entry_price(20.0).unwrap();

        assert_eq!(calc.num_shares().unwrap().shares, 200);

        let stop = calc.risk_stop().unwrap();
        assert!((stop.per_share_move - 0.2).abs() < 1e-9);
        assert!((stop.stop_price - 19.8).abs() < 1e-9);

        let gain = calc.gain(22.0).unwrap();
        assert_eq!(gain.shares, 200);
        assert!((gain.amount - 390.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_entry_price() {
        let calc = PositionCalculator::default();
        assert_eq!(calc.num_shares(), Err(TradeError::MissingEntryPrice));
        assert_eq!(calc.gain(22.0), Err(TradeError::MissingEntryPrice));
        assert_eq!(calc.risk_stop(), Err(TradeError::MissingEntryPrice));
        assert_eq!(calc.capital_for_stop(19.0), Err(TradeError::MissingEntryPrice));
        assert_eq!(calc.shares_at(20.0).unwrap().shares, 200);
    }

    #[test]
    fn test_transitions_return_new_values() {
        let calc = PositionCalculator::default().with_entry_price(20.0).unwrap();
        let bigger = calc.with_capital(8000.0).unwrap();

        assert_eq!(calc.num_shares().unwrap().shares, 200);
        assert_eq!(bigger.num_shares().unwrap().shares, 400);
        assert_eq!(bigger.entry_price(), Some(20.0));
    }

    #[test]
    fn test_rejects_negative_config() {
        let result = CalculatorConfig::default().with_commission(-1.0).build();
        assert!(matches!(
            result,
            Err(TradeError::InvalidInput { field: "commission", .. })
        ));

        let result = PositionCalculator::default().with_risk_tolerance(-10.0);
        assert!(matches!(
            result,
            Err(TradeError::InvalidInput { field: "risk_tolerance", .. })
        ));

        let result = PositionCalculator::default().with_entry_price(0.0);
        assert!(matches!(result, Err(TradeError::InvalidPrice { .. })));
    }

    #[test]
    fn test_zero_commission_and_tolerance_allowed() {
        let calc = CalculatorConfig::default()
            .with_commission(0.0)
            .with_risk_tolerance(0.0)
            .build()
            .unwrap()
            .with_entry_price(20.0)
            .unwrap();

        let stop = calc.risk_stop().unwrap();
        assert_eq!(stop.stop_price, 20.0);
    }

    #[test]
    fn test_with_buy_and_stop() {
        let calc = PositionCalculator::with_buy_and_stop(20.0, 19.8, 50.0, 5.0).unwrap();
        assert_eq!(calc.entry_price(), Some(20.0));
        assert!((calc.capital() - 4000.0).abs() < 1e-6);
        assert_eq!(calc.commission(), 5.0);
        assert_eq!(calc.risk_tolerance(), 50.0);
    }

    #[test]
    fn test_with_buy_and_stop_equal_prices() {
        let result = PositionCalculator::with_buy_and_stop(20.0, 20.0, 50.0, 5.0);
        assert!(matches!(result, Err(TradeError::StopEqualsEntry { .. })));
    }

    #[test]
    fn test_with_buy_and_stop_above_entry_is_rejected() {
        // A stop above entry solves to negative capital
        let result = PositionCalculator::with_buy_and_stop(20.0, 21.0, 50.0, 5.0);
        assert!(matches!(
            result,
            Err(TradeError::InvalidInput { field: "capital", .. })
        ));
    }

    #[test]
    fn test_display() {
        let calc = PositionCalculator::default();
        assert_eq!(
            calc.to_string(),
            "PositionCalculator(capital=4000.00, commission=5.00, risk_tolerance=50.00)"
        );
        let calc = calc.with_entry_price(20.5).unwrap();
        assert!(calc.to_string().ends_with(", entry=20.5)"));
    }
}
