//! Event-sourced trade ledger.
//!
//! The append-only TradeEvent log is the sole source of truth: current
//! holdings are a pure fold over the ordered log, never stored as mutable
//! primary state. Markers (buy-signal, hold) live in the log for audit but
//! do not affect the fold.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Why an executed sell happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    /// Classifier Sell (crossover deployments only).
    Signal,
    StopLoss,
    TakeProfit,
    /// Protective exit: price under the trend reference average while the
    /// position was still profitable.
    Trend,
}

impl fmt::Display for ExitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitCause::Signal => "signal exit",
            ExitCause::StopLoss => "stop-loss",
            ExitCause::TakeProfit => "take-profit",
            ExitCause::Trend => "trend exit",
        };
        write!(f, "{label}")
    }
}

/// Closed set of ledger event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    /// Audit marker: a Buy signal fired (whether or not a buy executed).
    BuySignal,
    /// Audit marker: nothing to do this step.
    HoldMarker,
    ExecutedBuy,
    ExecutedSell(ExitCause),
}

impl TradeKind {
    /// True for the kinds that move cash and shares in the fold.
    pub fn is_executed(&self) -> bool {
        matches!(self, TradeKind::ExecutedBuy | TradeKind::ExecutedSell(_))
    }

    /// Stable tag used by persistence adapters. Must round-trip through
    /// [`TradeKind::parse`] unchanged.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::BuySignal => "buy_signal",
            TradeKind::HoldMarker => "hold",
            TradeKind::ExecutedBuy => "executed_buy",
            TradeKind::ExecutedSell(ExitCause::Signal) => "sell_signal",
            TradeKind::ExecutedSell(ExitCause::StopLoss) => "sell_stop_loss",
            TradeKind::ExecutedSell(ExitCause::TakeProfit) => "sell_take_profit",
            TradeKind::ExecutedSell(ExitCause::Trend) => "sell_trend",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "buy_signal" => Some(TradeKind::BuySignal),
            "hold" => Some(TradeKind::HoldMarker),
            "executed_buy" => Some(TradeKind::ExecutedBuy),
            "sell_signal" => Some(TradeKind::ExecutedSell(ExitCause::Signal)),
            "sell_stop_loss" => Some(TradeKind::ExecutedSell(ExitCause::StopLoss)),
            "sell_take_profit" => Some(TradeKind::ExecutedSell(ExitCause::TakeProfit)),
            "sell_trend" => Some(TradeKind::ExecutedSell(ExitCause::Trend)),
            _ => None,
        }
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::BuySignal => write!(f, "buy signal"),
            TradeKind::HoldMarker => write!(f, "hold"),
            TradeKind::ExecutedBuy => write!(f, "executed buy"),
            TradeKind::ExecutedSell(cause) => write!(f, "executed sell ({cause})"),
        }
    }
}

/// One immutable ledger entry. Ordering is by timestamp ascending, ties
/// broken by insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub timestamp: NaiveDateTime,
    pub instrument: String,
    pub kind: TradeKind,
    pub shares: i64,
    pub price: f64,
    pub total_value: f64,
    pub realized_profit: Option<f64>,
}

impl TradeEvent {
    /// Signal-only marker: zero shares, zero value, no realized profit.
    pub fn marker(
        timestamp: NaiveDateTime,
        instrument: &str,
        kind: TradeKind,
        price: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument: instrument.to_string(),
            kind,
            shares: 0,
            price,
            total_value: 0.0,
            realized_profit: None,
        }
    }

    pub fn executed_buy(
        timestamp: NaiveDateTime,
        instrument: &str,
        shares: i64,
        price: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument: instrument.to_string(),
            kind: TradeKind::ExecutedBuy,
            shares,
            price,
            total_value: shares as f64 * price,
            realized_profit: None,
        }
    }

    pub fn executed_sell(
        timestamp: NaiveDateTime,
        instrument: &str,
        cause: ExitCause,
        shares: i64,
        price: f64,
        realized_profit: f64,
    ) -> Self {
        Self {
            timestamp,
            instrument: instrument.to_string(),
            kind: TradeKind::ExecutedSell(cause),
            shares,
            price,
            total_value: shares as f64 * price,
            realized_profit: Some(realized_profit),
        }
    }
}

/// Close-of-day valuation for one (date, instrument); written via idempotent
/// upsert, later writes win.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub date: NaiveDate,
    pub instrument: String,
    pub asset_value: f64,
}

/// Holdings derived from the log. `avg_cost` is meaningful only while
/// `shares > 0` and resets to 0 whenever the position goes flat.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub cash: f64,
    pub shares: i64,
    pub avg_cost: f64,
}

impl Position {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            shares: 0,
            avg_cost: 0.0,
        }
    }

    /// Reconstructs holdings by folding the ordered event log.
    pub fn from_events(initial_cash: f64, events: &[TradeEvent]) -> Self {
        let mut position = Self::new(initial_cash);
        for event in events {
            position.apply(event);
        }
        position
    }

    /// Applies one event. Markers are no-ops; buys restate avg_cost as the
    /// volume-weighted entry price; sells return cash and reset avg_cost
    /// once the position is flat.
    pub fn apply(&mut self, event: &TradeEvent) {
        match event.kind {
            TradeKind::BuySignal | TradeKind::HoldMarker => {}
            TradeKind::ExecutedBuy => {
                let held_value = self.avg_cost * self.shares as f64;
                self.cash -= event.total_value;
                self.shares += event.shares;
                self.avg_cost = if self.shares > 0 {
                    (held_value + event.total_value) / self.shares as f64
                } else {
                    0.0
                };
            }
            TradeKind::ExecutedSell(_) => {
                self.cash += event.total_value;
                self.shares -= event.shares;
                if self.shares <= 0 {
                    self.shares = 0;
                    self.avg_cost = 0.0;
                }
            }
        }
    }

    pub fn is_flat(&self) -> bool {
        self.shares == 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    /// Cash plus holdings valued at `price`.
    pub fn total_asset(&self, price: f64) -> f64 {
        self.cash + self.market_value(price)
    }

    /// Profit that liquidating the whole position at `price` would realize.
    pub fn unrealized_profit(&self, price: f64) -> f64 {
        (price - self.avg_cost) * self.shares as f64
    }
}
