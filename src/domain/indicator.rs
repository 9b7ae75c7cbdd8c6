//! Rolling indicator derivation.
//!
//! Every feature is causal: the value attached to a bar is computed from
//! that bar and earlier bars only. A feature needing N trailing bars is
//! `None` until N bars exist, and a lagged feature is additionally `None`
//! until its source has a value K bars back. Consumers must treat `None` as
//! "insufficient data", never as a satisfied condition.

use crate::domain::bar::Bar;
use chrono::NaiveDate;
use std::collections::VecDeque;

/// Window lengths for the derived features, all measured in bars.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub short_window: usize,
    pub medium_window: usize,
    pub long_window: usize,
    /// Offset for the lagged long average, used to test trend slope.
    pub lag: usize,
    /// Trailing window for the rolling max of high and min of low.
    pub extrema_window: usize,
}

impl IndicatorConfig {
    /// 50/150/200-bar averages, 20-bar lag, 252-bar (~52 week) extrema.
    pub fn trend_template() -> Self {
        Self {
            short_window: 50,
            medium_window: 150,
            long_window: 200,
            lag: 20,
            extrema_window: 252,
        }
    }

    /// 5/20-bar averages for the fast/slow crossover pair. The long and
    /// extrema features keep their trend defaults; the crossover classifier
    /// never reads them.
    pub fn crossover() -> Self {
        Self {
            short_window: 5,
            medium_window: 20,
            ..Self::trend_template()
        }
    }

    /// Longest lookback any feature of this configuration needs.
    pub fn longest_window(&self) -> usize {
        (self.long_window + self.lag)
            .max(self.extrema_window)
            .max(self.medium_window)
            .max(self.short_window)
    }
}

/// Per-bar indicator state. Field values are `None` until their window fills.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub ma_short: Option<f64>,
    pub ma_medium: Option<f64>,
    pub ma_long: Option<f64>,
    pub ma_long_lagged: Option<f64>,
    pub rolling_high: Option<f64>,
    pub rolling_low: Option<f64>,
}

/// Derives one snapshot per bar. Input bars must be ordered ascending.
pub fn compute(bars: &[Bar], config: &IndicatorConfig) -> Vec<IndicatorSnapshot> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let ma_short = rolling_mean(&closes, config.short_window);
    let ma_medium = rolling_mean(&closes, config.medium_window);
    let ma_long = rolling_mean(&closes, config.long_window);
    let ma_long_lagged = lag_series(&ma_long, config.lag);
    let rolling_high = rolling_extremum(&highs, config.extrema_window, Extremum::Max);
    let rolling_low = rolling_extremum(&lows, config.extrema_window, Extremum::Min);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| IndicatorSnapshot {
            date: bar.date,
            close: bar.close,
            ma_short: ma_short[i],
            ma_medium: ma_medium[i],
            ma_long: ma_long[i],
            ma_long_lagged: ma_long_lagged[i],
            rolling_high: rolling_high[i],
            rolling_low: rolling_low[i],
        })
        .collect()
}

/// O(n) sliding-sum mean over a trailing window. First (window-1) values are
/// `None`; a zero window yields all `None`.
fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Value from `lag` positions earlier, `None` while no such position exists
/// or the source value there was itself undefined.
fn lag_series(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i < lag { None } else { values[i - lag] })
        .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum Extremum {
    Max,
    Min,
}

/// O(n) rolling max/min via monotonic deque of candidate indices.
fn rolling_extremum(values: &[f64], window: usize, kind: Extremum) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let dominates = |a: f64, b: f64| match kind {
        Extremum::Max => a >= b,
        Extremum::Min => a <= b,
    };

    let mut out = Vec::with_capacity(values.len());
    let mut deque: VecDeque<usize> = VecDeque::new();
    for (i, &v) in values.iter().enumerate() {
        while deque.back().is_some_and(|&j| dominates(v, values[j])) {
            deque.pop_back();
        }
        deque.push_back(i);
        if deque.front().is_some_and(|&j| i >= j + window) {
            deque.pop_front();
        }
        if i + 1 >= window {
            out.push(deque.front().map(|&j| values[j]));
        } else {
            out.push(None);
        }
    }
    out
}
