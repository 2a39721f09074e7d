use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Price observed for one instrument at a scheduler tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Local>,
}

/// Output of one monitored tick: where the stop sits and how big to trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSuggestion {
    pub symbol: String,
    pub timestamp: DateTime<Local>,
    pub price: f64,
    pub ema: f64,
    pub atr: f64,
    pub stop_price: f64,
    /// None when the volatility stop is not below the price
    pub capital: Option<f64>,
    pub shares: Option<u64>,
}
