//! Edge-triggered signal classification.
//!
//! Both variants fire only on the transition *into* a qualifying state,
//! never while the state persists. An undefined indicator makes its
//! condition false; it can force Hold but never a trade signal.

use crate::domain::indicator::{IndicatorConfig, IndicatorSnapshot};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::Buy => "Buy",
            Signal::Sell => "Sell",
            Signal::Hold => "Hold",
        };
        write!(f, "{label}")
    }
}

/// Which classifier a deployment runs. The two are never merged: the trend
/// template never emits Sell (exits belong to the risk evaluator), while the
/// crossover emits Sell on the reverse cross and has no fixed take-profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalVariant {
    TrendTemplate,
    Crossover,
}

impl SignalVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalVariant::TrendTemplate => "trend_template",
            SignalVariant::Crossover => "crossover",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trend_template" => Some(SignalVariant::TrendTemplate),
            "crossover" => Some(SignalVariant::Crossover),
            _ => None,
        }
    }

    /// Minimum bar count for this variant to produce a defined decision:
    /// the slowest feature it reads, plus one bar for the edge comparison.
    pub fn min_bars(&self, config: &IndicatorConfig) -> usize {
        match self {
            SignalVariant::TrendTemplate => config.longest_window() + 1,
            SignalVariant::Crossover => config.medium_window.max(config.short_window) + 1,
        }
    }
}

impl fmt::Display for SignalVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All trend-template conditions on a single snapshot. Undefined indicators
/// fail the test.
fn trend_qualifies(snap: &IndicatorSnapshot) -> bool {
    let (
        Some(short),
        Some(medium),
        Some(long),
        Some(long_lagged),
        Some(rolling_high),
        Some(rolling_low),
    ) = (
        snap.ma_short,
        snap.ma_medium,
        snap.ma_long,
        snap.ma_long_lagged,
        snap.rolling_high,
        snap.rolling_low,
    )
    else {
        return false;
    };

    let close = snap.close;
    close > medium
        && close > long
        && medium > long
        && long > long_lagged
        && short > medium
        && close > rolling_low * 1.25
        && close > rolling_high * 0.75
}

/// Classifies the bar at `index`. The first bar can never fire: with no
/// predecessor there is no edge to detect.
///
/// Panics if `index` is out of bounds — callers iterate the snapshot slice
/// they computed.
pub fn classify(variant: SignalVariant, snapshots: &[IndicatorSnapshot], index: usize) -> Signal {
    assert!(index < snapshots.len(), "snapshot index out of bounds");
    if index == 0 {
        return Signal::Hold;
    }

    match variant {
        SignalVariant::TrendTemplate => {
            if trend_qualifies(&snapshots[index]) && !trend_qualifies(&snapshots[index - 1]) {
                Signal::Buy
            } else {
                Signal::Hold
            }
        }
        SignalVariant::Crossover => {
            let prev = &snapshots[index - 1];
            let cur = &snapshots[index];
            match (prev.ma_short, prev.ma_medium, cur.ma_short, cur.ma_medium) {
                (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) => {
                    if prev_fast < prev_slow && fast > slow {
                        Signal::Buy
                    } else if prev_fast > prev_slow && fast < slow {
                        Signal::Sell
                    } else {
                        Signal::Hold
                    }
                }
                _ => Signal::Hold,
            }
        }
    }
}

/// Classifies every bar of the series, index-aligned with the snapshots.
pub fn classify_series(variant: SignalVariant, snapshots: &[IndicatorSnapshot]) -> Vec<Signal> {
    (0..snapshots.len())
        .map(|i| classify(variant, snapshots, i))
        .collect()
}
