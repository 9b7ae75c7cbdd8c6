//! CSV file data adapter.
//!
//! One file per instrument, `{csv_dir}/{instrument}.csv`, header
//! `date,open,high,low,close,volume` with `%Y-%m-%d` dates. Whatever the
//! upstream exporter was, rows must already be in this normalized schema;
//! the core never learns where the bars came from.

use crate::domain::bar::Bar;
use crate::domain::error::TradewindError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug)]
pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Reads `[data] csv_dir` from config.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradewindError> {
        let dir = config
            .get_string("data", "csv_dir")
            .ok_or_else(|| TradewindError::ConfigMissing {
                section: "data".into(),
                key: "csv_dir".into(),
            })?;
        Ok(Self::new(PathBuf::from(dir)))
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{instrument}.csv"))
    }
}

fn parse_column<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T, TradewindError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| TradewindError::Database {
        reason: format!("missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| TradewindError::Database {
        reason: format!("invalid {name} value '{raw}': {e}"),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradewindError> {
        let path = self.csv_path(instrument);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            // No file for the instrument is "no bars", not an I/O fault.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TradewindError::NoData {
                    instrument: instrument.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TradewindError::Database {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| TradewindError::Database {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                TradewindError::Database {
                    reason: format!("invalid date '{date_str}': {e}"),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(Bar {
                date,
                open: parse_column(&record, 1, "open")?,
                high: parse_column(&record, 2, "high")?,
                low: parse_column(&record, 3, "low")?,
                close: parse_column(&record, 4, "close")?,
                volume: parse_column(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}
