use crate::error::{TradeError, TradeResult};

/// Streaming Exponential Moving Average
///
/// Carries a single scalar between updates. The smoothing factor is derived
/// from `period` on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    period: f64,
    current: f64,
}

impl Ema {
    /// Create an EMA seeded with `seed`
    ///
    /// # Arguments
    /// * `period` - Number of bars the average represents, must be finite and > 0
    /// * `seed` - Starting value, usually the SMA of a warm-up window
    pub fn new(period: f64, seed: f64) -> TradeResult<Self> {
        // period == -1 makes the smoothing factor divide by zero
        if !period.is_finite() || period <= 0.0 {
            return Err(TradeError::InvalidConfig(format!(
                "EMA period must be a positive number, got {}",
                period
            )));
        }
        if !seed.is_finite() {
            return Err(TradeError::InvalidConfig(format!(
                "EMA seed must be finite, got {}",
                seed
            )));
        }

        Ok(Self {
            period,
            current: seed,
        })
    }

    /// Create an EMA seeded with the simple average of a warm-up window
    pub fn from_warmup(period: usize, window: &[f64]) -> TradeResult<Self> {
        let seed = calculate_sma(window, period).ok_or_else(|| {
            TradeError::InvalidConfig(format!(
                "warm-up window has {} prices, need {}",
                window.len(),
                period
            ))
        })?;
        Self::new(period as f64, seed)
    }

    pub fn smoothing_factor(&self) -> f64 {
        2.0 / (self.period + 1.0)
    }

    /// Feed one observation and return the new average
    pub fn update(&mut self, observation: f64) -> f64 {
        let next = self.current + self.smoothing_factor() * (observation - self.current);
        self.current = next;
        next
    }

    pub fn value(&self) -> f64 {
        self.current
    }

    pub fn period(&self) -> f64 {
        self.period
    }
}

/// Calculate Simple Moving Average (SMA) of the last `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Calculate Exponential Moving Average (EMA) over a full price series
///
/// Seeds with the SMA of the first `period` prices, then streams the rest.
pub fn calculate_ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let mut ema = Ema::from_warmup(period, &prices[..period]).ok()?;
    for price in &prices[period..] {
        ema.update(*price);
    }

    Some(ema.value())
}
