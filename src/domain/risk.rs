//! Forced-exit evaluation.
//!
//! Runs before any signal-driven action and only while shares are held.
//! Checks fire in fixed priority: stop-loss, then fixed take-profit, then
//! the trend protective exit. The first match wins and always liquidates the
//! entire position.

use crate::domain::ledger::{ExitCause, Position};

/// Exit thresholds, as fractions of avg_cost. `take_profit_pct` is `None`
/// for deployments without a fixed profit target (crossover).
#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    pub stop_loss_pct: f64,
    pub take_profit_pct: Option<f64>,
}

/// Decides whether the current bar forces a full liquidation.
///
/// `trend_ma` is the protective reference average (the short-window MA in
/// trend-template deployments); `None` disables the trend exit, either
/// because the deployment has none or the average is still warming up.
pub fn forced_exit(
    position: &Position,
    price: f64,
    trend_ma: Option<f64>,
    params: &RiskParams,
) -> Option<ExitCause> {
    if position.shares <= 0 {
        return None;
    }

    if price < position.avg_cost * (1.0 - params.stop_loss_pct) {
        return Some(ExitCause::StopLoss);
    }

    if let Some(take_profit_pct) = params.take_profit_pct {
        if price > position.avg_cost * (1.0 + take_profit_pct) {
            return Some(ExitCause::TakeProfit);
        }
    }

    if let Some(trend_ma) = trend_ma {
        if price < trend_ma && price > position.avg_cost {
            return Some(ExitCause::Trend);
        }
    }

    None
}
