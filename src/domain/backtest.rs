//! Backtest driver.
//!
//! Replays the decision engine over a historical bar window against a fresh
//! in-memory position, never the live ledger. Indicators and signals are
//! computed over the full extended series (warmup included) before the
//! window truncation, so the first window bar sees fully warmed features.

use crate::domain::engine::{self, RejectReason, StepOutcome};
use crate::domain::error::TradewindError;
use crate::domain::indicator;
use crate::domain::ledger::{Position, TradeEvent, TradeKind};
use crate::domain::signal;
use crate::domain::strategy::Strategy;
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate, NaiveTime};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: f64,
}

/// Trade log and daily valuation for one backtest window.
///
/// The log holds buy-signal markers and executed events; per-bar hold
/// markers are a live-audit artifact and are not accumulated here.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trade_log: Vec<TradeEvent>,
    pub daily_asset_values: Vec<(NaiveDate, f64)>,
}

impl BacktestResult {
    /// Asset value at the last bar of the window.
    pub fn final_asset(&self) -> Option<f64> {
        self.daily_asset_values.last().map(|&(_, value)| value)
    }

    pub fn total_return_pct(&self, initial_cash: f64) -> Option<f64> {
        self.final_asset()
            .map(|final_asset| (final_asset - initial_cash) / initial_cash * 100.0)
    }

    pub fn executed_trades(&self) -> usize {
        self.trade_log
            .iter()
            .filter(|e| e.kind.is_executed())
            .count()
    }
}

/// Runs one deterministic backtest. Pure function of bars + strategy +
/// config: replay timestamps are the bar date at midnight, so identical
/// inputs produce identical output.
pub fn run_backtest(
    data: &dyn DataPort,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, TradewindError> {
    let fetch_start = config.start_date - Duration::days(strategy.warmup_days);
    let bars = data.fetch_ohlcv(&strategy.instrument, fetch_start, config.end_date)?;

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
    let signals = signal::classify_series(strategy.variant, &snapshots);

    let window: Vec<usize> = (0..snapshots.len())
        .filter(|&i| snapshots[i].date >= config.start_date && snapshots[i].date <= config.end_date)
        .collect();
    if window.is_empty() {
        return Err(TradewindError::NoData {
            instrument: strategy.instrument.clone(),
        });
    }

    let mut position = Position::new(config.initial_cash);
    let mut trade_log = Vec::new();
    let mut daily_asset_values = Vec::with_capacity(window.len());
    // First cash-rejected buy, kept for the insufficient-funds report.
    let mut cash_rejection: Option<(f64, f64)> = None;

    for i in window {
        let snap = &snapshots[i];
        let price = snap.close;
        let timestamp = snap.date.and_time(NaiveTime::MIN);

        let result = engine::step(
            strategy,
            &position,
            signals[i],
            price,
            engine::trend_reference(strategy, snap),
            timestamp,
        );

        if result.outcome == StepOutcome::BuyRejected(RejectReason::InsufficientCash)
            && cash_rejection.is_none()
        {
            cash_rejection = Some((price, position.cash));
        }

        for event in result.events {
            position.apply(&event);
            if event.kind != TradeKind::HoldMarker {
                trade_log.push(event);
            }
        }

        daily_asset_values.push((snap.date, position.total_asset(price)));
    }

    // Buy signals fired but cash alone kept every one of them from
    // executing: report it instead of an empty "successful" run.
    if let Some((price, cash)) = cash_rejection {
        if !trade_log.iter().any(|e| e.kind.is_executed()) {
            return Err(TradewindError::InsufficientFunds {
                instrument: strategy.instrument.clone(),
                price,
                lot_size: strategy.lot_size,
                cash,
            });
        }
    }

    Ok(BacktestResult {
        trade_log,
        daily_asset_values,
    })
}
