// Position sizing and gain/risk arithmetic
// Commission is charged twice, once on entry and once on exit.
//   shares           = floor(capital / entry)
//   gain(exit)       = (exit - entry) * shares - 2 * commission
//   stop             = entry - (risk_tolerance - 2 * commission) / shares
//   required_capital = entry * (2 * commission - risk_tolerance) / (stop - entry)
// capital_for_stop is not the inverse of risk_stop_from_capital; the floored
// share count makes it the more conservative of the two.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_non_negative, ensure_price, TradeError, TradeResult};

/// Whole shares affordable at a price, and the capital they actually consume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShareCount {
    pub shares: u64,
    pub adjusted_capital: f64,
}

/// Net result of a round trip after commissions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    pub amount: f64,
    pub shares: u64,
}

/// Where to place the stop for a given capital, and the per-share room it allows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskStop {
    pub stop_price: f64,
    pub per_share_move: f64,
}

/// Number of whole shares `capital` buys at `entry_price`
pub fn num_shares(entry_price: f64, capital: f64) -> TradeResult<ShareCount> {
    let entry_price = ensure_price("entry_price", entry_price)?;
    let capital = ensure_non_negative("capital", capital)?;

    let shares = (capital / entry_price).floor() as u64;
    Ok(ShareCount {
        shares,
        adjusted_capital: shares as f64 * entry_price,
    })
}

/// Gain from buying at `entry_price` and selling at `exit_price`
pub fn gain(entry_price: f64, exit_price: f64, capital: f64, commission: f64) -> TradeResult<Gain> {
    let exit_price = ensure_finite("exit_price", exit_price)?;
    let commission = ensure_non_negative("commission", commission)?;
    let shares = tradable_shares(entry_price, capital)?;

    Ok(Gain {
        amount: (exit_price - entry_price) * shares as f64 - 2.0 * commission,
        shares,
    })
}

/// Stop placement that caps the loss at `risk_tolerance` for the shares `capital` buys
pub fn risk_stop_from_capital(
    entry_price: f64,
    capital: f64,
    risk_tolerance: f64,
    commission: f64,
) -> TradeResult<RiskStop> {
    let risk_tolerance = ensure_non_negative("risk_tolerance", risk_tolerance)?;
    let commission = ensure_non_negative("commission", commission)?;
    let shares = tradable_shares(entry_price, capital)?;

    let net_risk = risk_tolerance - 2.0 * commission;
    let per_share_move = net_risk / shares as f64;

    Ok(RiskStop {
        stop_price: entry_price - per_share_move,
        per_share_move,
    })
}

/// Capital to commit so that a stop at `stop_price` loses at most `risk_tolerance`
pub fn capital_for_stop(
    entry_price: f64,
    stop_price: f64,
    risk_tolerance: f64,
    commission: f64,
) -> TradeResult<f64> {
    let entry_price = ensure_price("entry_price", entry_price)?;
    let stop_price = ensure_finite("stop_price", stop_price)?;
    let risk_tolerance = ensure_non_negative("risk_tolerance", risk_tolerance)?;
    let commission = ensure_non_negative("commission", commission)?;

    let delta = stop_price - entry_price;
    if delta == 0.0 {
        return Err(TradeError::StopEqualsEntry {
            entry: entry_price,
            stop: stop_price,
        });
    }

    Ok(entry_price * (2.0 * commission - risk_tolerance) / delta)
}

fn tradable_shares(entry_price: f64, capital: f64) -> TradeResult<u64> {
    let count = num_shares(entry_price, capital)?;
    if count.shares == 0 {
        return Err(TradeError::PositionTooSmall {
            capital,
            price: entry_price,
        });
    }
    Ok(count.shares)
}
