//! SQLite ledger adapter (default backend, feature `sqlite`).
//!
//! Stores the append-only trade log and the daily performance table. Events
//! are never updated or deleted; read-back orders by timestamp with the
//! rowid breaking ties, which preserves insertion order within a timestamp.

use crate::domain::error::TradewindError;
use crate::domain::ledger::{PerformanceRecord, TradeEvent, TradeKind};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug)]
pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    /// Reads `[sqlite] path` (required) and `[sqlite] pool_size` (default 4,
    /// must be at least 1).
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradewindError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TradewindError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        let pool_size = match config.get_int("sqlite", "pool_size")? {
            None => 4,
            Some(n) if n >= 1 => n as u32,
            Some(n) => {
                return Err(TradewindError::ConfigInvalid {
                    section: "sqlite".into(),
                    key: "pool_size".into(),
                    reason: format!("'{n}' is not a positive pool size"),
                });
            }
        };

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| TradewindError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database, used by tests.
    pub fn in_memory() -> Result<Self, TradewindError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TradewindError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), TradewindError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                instrument TEXT NOT NULL,
                kind TEXT NOT NULL,
                shares INTEGER NOT NULL,
                price REAL NOT NULL,
                total_value REAL NOT NULL,
                realized_profit REAL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_instrument ON trades(instrument);
            CREATE TABLE IF NOT EXISTS daily_performance (
                date TEXT NOT NULL,
                instrument TEXT NOT NULL,
                total_asset REAL NOT NULL,
                PRIMARY KEY (date, instrument)
            );",
        )
        .map_err(|e: rusqlite::Error| TradewindError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn connection(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, TradewindError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| TradewindError::Database {
                reason: e.to_string(),
            })
    }
}

fn query_error(e: rusqlite::Error) -> TradewindError {
    TradewindError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl LedgerPort for SqliteAdapter {
    fn append_event(&self, event: &TradeEvent) -> Result<(), TradewindError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO trades (timestamp, instrument, kind, shares, price, total_value, realized_profit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                event.instrument,
                event.kind.as_str(),
                event.shares,
                event.price,
                event.total_value,
                event.realized_profit,
            ],
        )
        .map_err(query_error)?;
        Ok(())
    }

    fn read_events(&self, instrument: &str) -> Result<Vec<TradeEvent>, TradewindError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, kind, shares, price, total_value, realized_profit
                 FROM trades WHERE instrument = ?1
                 ORDER BY timestamp ASC, id ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![instrument], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            })
            .map_err(query_error)?;

        let mut events = Vec::new();
        for row in rows {
            let (ts, tag, shares, price, total_value, realized_profit) =
                row.map_err(query_error)?;
            let timestamp = NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).map_err(|e| {
                TradewindError::DatabaseQuery {
                    reason: format!("invalid timestamp '{ts}': {e}"),
                }
            })?;
            // An unknown tag means schema drift; fail loudly.
            let kind = TradeKind::parse(&tag).ok_or_else(|| TradewindError::DatabaseQuery {
                reason: format!("unknown trade kind tag '{tag}'"),
            })?;
            events.push(TradeEvent {
                timestamp,
                instrument: instrument.to_string(),
                kind,
                shares,
                price,
                total_value,
                realized_profit,
            });
        }

        Ok(events)
    }

    fn upsert_performance(&self, record: &PerformanceRecord) -> Result<(), TradewindError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO daily_performance (date, instrument, total_asset)
             VALUES (?1, ?2, ?3)",
            params![
                record.date.format(DATE_FORMAT).to_string(),
                record.instrument,
                record.asset_value,
            ],
        )
        .map_err(query_error)?;
        Ok(())
    }

    fn read_performance(
        &self,
        instrument: &str,
    ) -> Result<Vec<PerformanceRecord>, TradewindError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, total_asset FROM daily_performance
                 WHERE instrument = ?1 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![instrument], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })
            .map_err(query_error)?;

        let mut records = Vec::new();
        for row in rows {
            let (date_str, asset_value) = row.map_err(query_error)?;
            let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                TradewindError::DatabaseQuery {
                    reason: format!("invalid date '{date_str}': {e}"),
                }
            })?;
            records.push(PerformanceRecord {
                date,
                instrument: instrument.to_string(),
                asset_value,
            });
        }

        Ok(records)
    }
}
