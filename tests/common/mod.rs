#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use tradewind::domain::backtest::BacktestConfig;
pub use tradewind::domain::bar::Bar;
use tradewind::domain::error::TradewindError;
use tradewind::domain::ledger::{PerformanceRecord, TradeEvent};
use tradewind::domain::strategy::Strategy;
use tradewind::ports::data_port::DataPort;
use tradewind::ports::ledger_port::LedgerPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradewindError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(TradewindError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory ledger with the same ordering contract as the persistent
/// adapters: timestamp ascending, ties by insertion order.
pub struct MemoryLedger {
    events: RefCell<Vec<TradeEvent>>,
    performance: RefCell<BTreeMap<(String, NaiveDate), f64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            performance: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }
}

impl LedgerPort for MemoryLedger {
    fn append_event(&self, event: &TradeEvent) -> Result<(), TradewindError> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }

    fn read_events(&self, instrument: &str) -> Result<Vec<TradeEvent>, TradewindError> {
        let mut events: Vec<TradeEvent> = self
            .events
            .borrow()
            .iter()
            .filter(|e| e.instrument == instrument)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    fn upsert_performance(&self, record: &PerformanceRecord) -> Result<(), TradewindError> {
        self.performance
            .borrow_mut()
            .insert((record.instrument.clone(), record.date), record.asset_value);
        Ok(())
    }

    fn read_performance(
        &self,
        instrument: &str,
    ) -> Result<Vec<PerformanceRecord>, TradewindError> {
        Ok(self
            .performance
            .borrow()
            .iter()
            .filter(|((inst, _), _)| inst == instrument)
            .map(|((inst, date), value)| PerformanceRecord {
                date: *date,
                instrument: inst.clone(),
                asset_value: *value,
            })
            .collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> Bar {
    Bar {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 50_000,
    }
}

/// Consecutive daily bars with the given closes, starting at `start_date`.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<Bar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: start + chrono::Duration::days(i as i64),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 50_000,
        })
        .collect()
}

/// Consecutive daily bars rising one unit per day from `start_price`.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(start_date, &closes)
}

/// Crossover strategy with tiny 2/3 windows so scenarios fit in a handful of
/// bars: 15% stop, 30% take-profit, one lot of 1000, cap 3000.
pub fn fast_crossover_strategy(instrument: &str) -> Strategy {
    let mut strategy = Strategy::crossover(instrument);
    strategy.indicators.short_window = 2;
    strategy.indicators.medium_window = 3;
    strategy.stop_loss_pct = 0.15;
    strategy.take_profit_pct = Some(0.30);
    strategy.warmup_days = 30;
    strategy
}

pub fn sample_backtest_config() -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        initial_cash: 1_000_000.0,
    }
}
