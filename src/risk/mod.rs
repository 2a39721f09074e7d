// Risk management module
// Position sizing, gain/risk figures and stop placement
pub mod calculator;
pub mod helpers;
pub mod sizing;

pub use calculator::{CalculatorConfig, PositionCalculator};
pub use helpers::{convert_period, loss_fraction, price_after_loss, stop_from_volatility};
pub use sizing::{capital_for_stop, gain, num_shares, risk_stop_from_capital, Gain, RiskStop, ShareCount};
