//! Decision engine: one step per bar.
//!
//! A step turns today's signal plus the risk-evaluator verdict into at most
//! one ledger-affecting action. Forced exits preempt everything; a Buy always
//! leaves a marker even when execution is rejected, so the log records the
//! missed opportunity.

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::ledger::{ExitCause, Position, TradeEvent, TradeKind};
use crate::domain::risk;
use crate::domain::signal::{Signal, SignalVariant};
use crate::domain::strategy::Strategy;
use chrono::NaiveDateTime;
use std::fmt;

/// Why a Buy signal did not execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Another lot would push holdings past the position cap.
    CapReached,
    /// Price is not above the current avg_cost; pyramiding only adds on
    /// new relative highs, never averages down.
    NotAboveCost,
    InsufficientCash,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectReason::CapReached => "position cap reached",
            RejectReason::NotAboveCost => "price not above average cost",
            RejectReason::InsufficientCash => "insufficient cash",
        };
        write!(f, "{label}")
    }
}

/// What one engine step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    ForcedExit(ExitCause),
    Bought,
    BuyRejected(RejectReason),
    /// Crossover Sell executed as a signal exit.
    SignalExit,
    /// Crossover Sell with nothing held; nothing appended.
    SellIgnored,
    Held,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::ForcedExit(cause) => write!(f, "forced exit ({cause})"),
            StepOutcome::Bought => write!(f, "bought one lot"),
            StepOutcome::BuyRejected(reason) => write!(f, "buy rejected ({reason})"),
            StepOutcome::SignalExit => write!(f, "signal exit"),
            StepOutcome::SellIgnored => write!(f, "sell signal with no position"),
            StepOutcome::Held => write!(f, "held"),
        }
    }
}

/// Events produced by one step, in append order, plus the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub events: Vec<TradeEvent>,
    pub outcome: StepOutcome,
}

/// Protective reference average for the risk evaluator. Only the
/// trend-template deployment runs a trend exit; it watches the short-window
/// average (the quarterly line at the default 50 bars).
pub fn trend_reference(strategy: &Strategy, snapshot: &IndicatorSnapshot) -> Option<f64> {
    match strategy.variant {
        SignalVariant::TrendTemplate => snapshot.ma_short,
        SignalVariant::Crossover => None,
    }
}

/// Runs one decision step. `position` is the fold of the log as of the
/// previous step; the caller applies the returned events itself.
pub fn step(
    strategy: &Strategy,
    position: &Position,
    signal: Signal,
    price: f64,
    trend_ma: Option<f64>,
    timestamp: NaiveDateTime,
) -> StepResult {
    let instrument = strategy.instrument.as_str();

    if let Some(cause) = risk::forced_exit(position, price, trend_ma, &strategy.risk_params()) {
        let realized = (price - position.avg_cost) * position.shares as f64;
        return StepResult {
            events: vec![TradeEvent::executed_sell(
                timestamp,
                instrument,
                cause,
                position.shares,
                price,
                realized,
            )],
            outcome: StepOutcome::ForcedExit(cause),
        };
    }

    match signal {
        Signal::Buy => {
            let mut events = vec![TradeEvent::marker(
                timestamp,
                instrument,
                TradeKind::BuySignal,
                price,
            )];
            match buy_rejection(strategy, position, price) {
                Some(reason) => StepResult {
                    events,
                    outcome: StepOutcome::BuyRejected(reason),
                },
                None => {
                    events.push(TradeEvent::executed_buy(
                        timestamp,
                        instrument,
                        strategy.lot_size,
                        price,
                    ));
                    StepResult {
                        events,
                        outcome: StepOutcome::Bought,
                    }
                }
            }
        }
        Signal::Sell if position.shares > 0 => {
            let realized = (price - position.avg_cost) * position.shares as f64;
            StepResult {
                events: vec![TradeEvent::executed_sell(
                    timestamp,
                    instrument,
                    ExitCause::Signal,
                    position.shares,
                    price,
                    realized,
                )],
                outcome: StepOutcome::SignalExit,
            }
        }
        Signal::Sell => StepResult {
            events: Vec::new(),
            outcome: StepOutcome::SellIgnored,
        },
        Signal::Hold => StepResult {
            events: vec![TradeEvent::marker(
                timestamp,
                instrument,
                TradeKind::HoldMarker,
                price,
            )],
            outcome: StepOutcome::Held,
        },
    }
}

/// First gate a lot buy fails, or `None` when it may execute. Checked in
/// fixed order: capacity, pyramid rule, cash.
fn buy_rejection(strategy: &Strategy, position: &Position, price: f64) -> Option<RejectReason> {
    if position.shares + strategy.lot_size > strategy.max_position {
        return Some(RejectReason::CapReached);
    }
    if position.shares > 0 && price <= position.avg_cost {
        return Some(RejectReason::NotAboveCost);
    }
    if position.cash < price * strategy.lot_size as f64 {
        return Some(RejectReason::InsufficientCash);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap()
    }

    fn strategy() -> Strategy {
        Strategy::trend_template("2330.TW")
    }

    fn held(shares: i64, avg_cost: f64, cash: f64) -> Position {
        Position {
            cash,
            shares,
            avg_cost,
        }
    }

    #[test]
    fn buy_from_flat_executes_one_lot() {
        let flat = Position::new(1_000_000.0);
        let result = step(&strategy(), &flat, Signal::Buy, 100.0, None, ts());

        assert_eq!(result.outcome, StepOutcome::Bought);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].kind, TradeKind::BuySignal);
        assert_eq!(result.events[1].kind, TradeKind::ExecutedBuy);
        assert_eq!(result.events[1].shares, 1_000);
        assert_relative_eq!(result.events[1].total_value, 100_000.0);
    }

    #[test]
    fn rejected_buy_still_leaves_marker() {
        let full = held(3_000, 100.0, 700_000.0);
        let result = step(&strategy(), &full, Signal::Buy, 110.0, None, ts());

        assert_eq!(result.outcome, StepOutcome::BuyRejected(RejectReason::CapReached));
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].kind, TradeKind::BuySignal);
    }

    #[test]
    fn pyramiding_requires_price_above_cost() {
        let position = held(1_000, 100.0, 900_000.0);

        let at_cost = step(&strategy(), &position, Signal::Buy, 100.0, None, ts());
        assert_eq!(
            at_cost.outcome,
            StepOutcome::BuyRejected(RejectReason::NotAboveCost)
        );

        let above = step(&strategy(), &position, Signal::Buy, 101.0, None, ts());
        assert_eq!(above.outcome, StepOutcome::Bought);
    }

    #[test]
    fn cash_gate_rejects_unaffordable_lot() {
        let poor = held(0, 0.0, 50_000.0);
        let result = step(&strategy(), &poor, Signal::Buy, 100.0, None, ts());
        assert_eq!(
            result.outcome,
            StepOutcome::BuyRejected(RejectReason::InsufficientCash)
        );
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn cap_is_never_overshot() {
        // 2,500 held with a 1,000 lot and 3,000 cap: one more lot would land
        // at 3,500, so the buy must be rejected even though 2,500 < 3,000.
        let mut s = strategy();
        s.max_position = 3_000;
        let position = held(2_500, 100.0, 800_000.0);
        let result = step(&s, &position, Signal::Buy, 110.0, None, ts());
        assert_eq!(result.outcome, StepOutcome::BuyRejected(RejectReason::CapReached));
    }

    #[test]
    fn forced_exit_overrides_buy_signal() {
        let position = held(1_000, 100.0, 900_000.0);
        // 84 breaches the 15% stop; the Buy signal must not act.
        let result = step(&strategy(), &position, Signal::Buy, 84.0, None, ts());

        assert_eq!(result.outcome, StepOutcome::ForcedExit(ExitCause::StopLoss));
        assert_eq!(result.events.len(), 1);
        assert_eq!(
            result.events[0].kind,
            TradeKind::ExecutedSell(ExitCause::StopLoss)
        );
        assert_eq!(result.events[0].shares, 1_000);
        assert_relative_eq!(result.events[0].realized_profit.unwrap(), -16_000.0);
    }

    #[test]
    fn take_profit_realizes_gain() {
        let position = held(1_000, 100.0, 900_000.0);
        let result = step(&strategy(), &position, Signal::Hold, 150.0, None, ts());

        assert_eq!(result.outcome, StepOutcome::ForcedExit(ExitCause::TakeProfit));
        assert_relative_eq!(result.events[0].realized_profit.unwrap(), 50_000.0);
    }

    #[test]
    fn trend_exit_uses_reference_average() {
        let position = held(1_000, 100.0, 900_000.0);
        let result = step(&strategy(), &position, Signal::Hold, 105.0, Some(110.0), ts());
        assert_eq!(result.outcome, StepOutcome::ForcedExit(ExitCause::Trend));
    }

    #[test]
    fn sell_signal_liquidates_held_position() {
        let mut s = Strategy::crossover("2330.TW");
        s.stop_loss_pct = 0.5; // keep the stop out of the way
        let position = held(2_000, 100.0, 800_000.0);
        let result = step(&s, &position, Signal::Sell, 103.0, None, ts());

        assert_eq!(result.outcome, StepOutcome::SignalExit);
        assert_eq!(result.events.len(), 1);
        assert_eq!(
            result.events[0].kind,
            TradeKind::ExecutedSell(ExitCause::Signal)
        );
        assert_eq!(result.events[0].shares, 2_000);
        assert_relative_eq!(result.events[0].realized_profit.unwrap(), 6_000.0);
    }

    #[test]
    fn sell_signal_with_no_position_appends_nothing() {
        let flat = Position::new(1_000_000.0);
        let result = step(&Strategy::crossover("2330.TW"), &flat, Signal::Sell, 100.0, None, ts());
        assert_eq!(result.outcome, StepOutcome::SellIgnored);
        assert!(result.events.is_empty());
    }

    #[test]
    fn hold_appends_marker_only() {
        let flat = Position::new(1_000_000.0);
        let result = step(&strategy(), &flat, Signal::Hold, 100.0, None, ts());
        assert_eq!(result.outcome, StepOutcome::Held);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].kind, TradeKind::HoldMarker);
    }

    #[test]
    fn at_most_one_ledger_affecting_action_per_step() {
        // Forced exit while a Buy signal fires: exactly one executed event.
        let position = held(1_000, 100.0, 900_000.0);
        let result = step(&strategy(), &position, Signal::Buy, 150.0, None, ts());
        let executed = result
            .events
            .iter()
            .filter(|e| e.kind.is_executed())
            .count();
        assert_eq!(executed, 1);
    }

    #[test]
    fn trend_reference_only_for_trend_template() {
        let snap = IndicatorSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            close: 100.0,
            ma_short: Some(98.0),
            ma_medium: Some(95.0),
            ma_long: Some(90.0),
            ma_long_lagged: Some(88.0),
            rolling_high: Some(105.0),
            rolling_low: Some(80.0),
        };
        assert_eq!(trend_reference(&strategy(), &snap), Some(98.0));
        assert_eq!(trend_reference(&Strategy::crossover("X"), &snap), None);
    }
}
