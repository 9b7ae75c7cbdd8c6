//! Daily OHLCV bar.
//!
//! Bars carry no instrument identity: providers are keyed by instrument at
//! the port boundary and must hand the core one normalized schema regardless
//! of where the data came from.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// True when the series is strictly ascending by date with no duplicates.
    pub fn is_ordered(bars: &[Bar]) -> bool {
        bars.windows(2).all(|w| w[0].date < w[1].date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> Bar {
        Bar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 50_000,
        }
    }

    #[test]
    fn ordered_series_passes() {
        let bars = vec![
            bar("2024-01-15", 100.0),
            bar("2024-01-16", 101.0),
            bar("2024-01-17", 99.5),
        ];
        assert!(Bar::is_ordered(&bars));
    }

    #[test]
    fn duplicate_date_fails() {
        let bars = vec![bar("2024-01-15", 100.0), bar("2024-01-15", 101.0)];
        assert!(!Bar::is_ordered(&bars));
    }

    #[test]
    fn descending_fails() {
        let bars = vec![bar("2024-01-16", 100.0), bar("2024-01-15", 101.0)];
        assert!(!Bar::is_ordered(&bars));
    }

    #[test]
    fn empty_and_singleton_are_ordered() {
        assert!(Bar::is_ordered(&[]));
        assert!(Bar::is_ordered(&[bar("2024-01-15", 100.0)]));
    }
}
