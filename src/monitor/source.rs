use chrono::{DateTime, Local};
use std::collections::VecDeque;

use crate::models::PriceTick;

/// Supplies the latest price for one instrument at a tick
pub trait PriceSource: Send {
    fn latest(&mut self, at: DateTime<Local>) -> anyhow::Result<PriceTick>;
}

/// Supplies the current ATR (or any volatility offset) at a tick
pub trait VolatilitySource: Send {
    fn atr(&mut self, at: DateTime<Local>) -> anyhow::Result<f64>;
}

/// Constant volatility offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAtr(pub f64);

impl VolatilitySource for FixedAtr {
    fn atr(&mut self, _at: DateTime<Local>) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

/// Replays a fixed list of prices, one per tick
#[derive(Debug, Clone)]
pub struct ReplaySource {
    symbol: String,
    prices: VecDeque<f64>,
}

impl ReplaySource {
    pub fn new(symbol: impl Into<String>, prices: impl IntoIterator<Item = f64>) -> Self {
        Self {
            symbol: symbol.into(),
            prices: prices.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.prices.len()
    }
}

impl PriceSource for ReplaySource {
    fn latest(&mut self, at: DateTime<Local>) -> anyhow::Result<PriceTick> {
        let price = self
            .prices
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("replay for {} is exhausted", self.symbol))?;

        Ok(PriceTick {
            symbol: self.symbol.clone(),
            price,
            timestamp: at,
        })
    }
}
