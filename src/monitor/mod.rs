// Tick pipeline: price -> EMA -> volatility stop -> position size
pub mod source;

pub use source::{FixedAtr, PriceSource, ReplaySource, VolatilitySource};

use chrono::{DateTime, Local};
use std::collections::VecDeque;

use crate::error::{ensure_finite, ensure_price};
use crate::indicators::Ema;
use crate::models::StopSuggestion;
use crate::risk::{stop_from_volatility, PositionCalculator};
use crate::scheduler::TickHandler;

const DEFAULT_MAX_HISTORY: usize = 500;

/// Tracks one instrument across scheduler ticks
///
/// Owns its own `Ema`; monitor one stream per instance.
pub struct StopMonitor<P, V> {
    prices: P,
    volatility: V,
    ema: Ema,
    calculator: PositionCalculator,
    history: VecDeque<StopSuggestion>,
    max_history: usize,
}

impl<P: PriceSource, V: VolatilitySource> StopMonitor<P, V> {
    pub fn new(prices: P, volatility: V, ema: Ema, calculator: PositionCalculator) -> Self {
        Self {
            prices,
            volatility,
            ema,
            calculator,
            history: VecDeque::new(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    /// Pull a price, advance the EMA and size a position against the volatility stop
    ///
    /// Inputs are checked before the EMA moves, so a rejected tick leaves it untouched.
    pub fn observe(&mut self, at: DateTime<Local>) -> anyhow::Result<StopSuggestion> {
        let tick = self.prices.latest(at)?;
        ensure_price("price", tick.price)?;
        let atr = ensure_finite("atr", self.volatility.atr(at)?)?;

        let ema = self.ema.update(tick.price);
        let stop_price = stop_from_volatility(ema, atr);

        let (capital, shares) = if stop_price < tick.price {
            let sized = self.calculator.with_entry_price(tick.price)?;
            let capital = sized.capital_for_stop(stop_price)?;
            let shares = sized.with_capital(capital)?.num_shares()?.shares;
            (Some(capital), Some(shares))
        } else {
            tracing::warn!(
                symbol = %tick.symbol,
                price = tick.price,
                stop = stop_price,
                "Volatility stop is not below price, skipping sizing"
            );
            (None, None)
        };

        let suggestion = StopSuggestion {
            symbol: tick.symbol,
            timestamp: at,
            price: tick.price,
            ema,
            atr,
            stop_price,
            capital,
            shares,
        };

        tracing::info!(
            symbol = %suggestion.symbol,
            price = suggestion.price,
            ema = %format!("{:.4}", ema),
            stop = %format!("{:.4}", stop_price),
            shares = ?suggestion.shares,
            "Stop suggestion"
        );

        self.history.push_back(suggestion.clone());
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }

        Ok(suggestion)
    }

    pub fn ema(&self) -> &Ema {
        &self.ema
    }

    pub fn calculator(&self) -> &PositionCalculator {
        &self.calculator
    }

    pub fn latest(&self) -> Option<&StopSuggestion> {
        self.history.back()
    }

    pub fn history(&self) -> impl Iterator<Item = &StopSuggestion> {
        self.history.iter()
    }
}

impl<P: PriceSource, V: VolatilitySource> TickHandler for StopMonitor<P, V> {
    fn on_tick(&mut self, at: DateTime<Local>) -> anyhow::Result<()> {
        self.observe(at).map(|_| ())
    }
}
