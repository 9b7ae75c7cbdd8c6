//! One live decision cycle over the ports.
//!
//! Fetch bars, classify the latest bar, fold the persistent ledger, run one
//! engine step, append the produced events, and upsert the day's valuation.
//! Data failures surface before any ledger mutation.

use crate::domain::engine::{self, StepOutcome};
use crate::domain::error::TradewindError;
use crate::domain::indicator;
use crate::domain::ledger::{PerformanceRecord, Position};
use crate::domain::signal::{self, Signal};
use crate::domain::strategy::Strategy;
use crate::ports::data_port::DataPort;
use crate::ports::ledger_port::LedgerPort;
use chrono::{Duration, NaiveDateTime};

/// Outcome of one live cycle, as returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signal: Signal,
    pub outcome: StepOutcome,
    /// Latest close, the price every action this cycle used.
    pub price: f64,
    /// Position after applying this cycle's events.
    pub position: Position,
    pub total_asset: f64,
}

/// Runs one evaluation as of `as_of`: appended events carry that timestamp
/// and the performance record its date. The caller owns the clock; the core
/// stays deterministic.
pub fn evaluate(
    data: &dyn DataPort,
    ledger: &dyn LedgerPort,
    strategy: &Strategy,
    as_of: NaiveDateTime,
) -> Result<Evaluation, TradewindError> {
    let fetch_start = as_of.date() - Duration::days(strategy.warmup_days);
    let bars = data.fetch_ohlcv(&strategy.instrument, fetch_start, as_of.date())?;

    if bars.is_empty() {
        return Err(TradewindError::NoData {
            instrument: strategy.instrument.clone(),
        });
    }
    if bars.len() < strategy.min_bars() {
        return Err(TradewindError::InsufficientData {
            instrument: strategy.instrument.clone(),
            bars: bars.len(),
            minimum: strategy.min_bars(),
        });
    }

    let snapshots = indicator::compute(&bars, &strategy.indicators);
    let last = snapshots.len() - 1;
    let signal = signal::classify(strategy.variant, &snapshots, last);
    let price = snapshots[last].close;

    let history = ledger.read_events(&strategy.instrument)?;
    let mut position = Position::from_events(strategy.initial_cash, &history);

    let result = engine::step(
        strategy,
        &position,
        signal,
        price,
        engine::trend_reference(strategy, &snapshots[last]),
        as_of,
    );

    for event in &result.events {
        ledger.append_event(event)?;
        position.apply(event);
    }

    let total_asset = position.total_asset(price);
    ledger.upsert_performance(&PerformanceRecord {
        date: as_of.date(),
        instrument: strategy.instrument.clone(),
        asset_value: total_asset,
    })?;

    Ok(Evaluation {
        signal,
        outcome: result.outcome,
        price,
        position,
        total_asset,
    })
}
