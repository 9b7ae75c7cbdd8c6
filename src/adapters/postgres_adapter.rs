//! PostgreSQL ledger adapter (feature `postgres`).
//!
//! Same contract as the SQLite backend; the performance upsert uses
//! `ON CONFLICT (date, instrument) DO UPDATE`.

use crate::domain::error::TradewindError;
use crate::domain::ledger::{PerformanceRecord, TradeEvent, TradeKind};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use chrono::{NaiveDate, NaiveDateTime};
use postgres::{Client, NoTls};
use std::cell::RefCell;

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

impl PostgresAdapter {
    /// Tries `[postgres] connection_string`, falling back to
    /// `[database] conninfo`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradewindError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| TradewindError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let client =
            Client::connect(&connection_string, NoTls).map_err(|e| TradewindError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: RefCell::new(client),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), TradewindError> {
        self.client
            .borrow_mut()
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS trades (
                    id BIGSERIAL PRIMARY KEY,
                    timestamp TIMESTAMP NOT NULL,
                    instrument TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    shares BIGINT NOT NULL,
                    price DOUBLE PRECISION NOT NULL,
                    total_value DOUBLE PRECISION NOT NULL,
                    realized_profit DOUBLE PRECISION
                );
                CREATE INDEX IF NOT EXISTS idx_trades_instrument ON trades(instrument);
                CREATE TABLE IF NOT EXISTS daily_performance (
                    date DATE NOT NULL,
                    instrument TEXT NOT NULL,
                    total_asset DOUBLE PRECISION NOT NULL,
                    PRIMARY KEY (date, instrument)
                );",
            )
            .map_err(|e| TradewindError::DatabaseQuery {
                reason: e.to_string(),
            })
    }
}

fn query_error(e: postgres::Error) -> TradewindError {
    TradewindError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl LedgerPort for PostgresAdapter {
    fn append_event(&self, event: &TradeEvent) -> Result<(), TradewindError> {
        self.client
            .borrow_mut()
            .execute(
                "INSERT INTO trades (timestamp, instrument, kind, shares, price, total_value, realized_profit)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &event.timestamp,
                    &event.instrument,
                    &event.kind.as_str(),
                    &event.shares,
                    &event.price,
                    &event.total_value,
                    &event.realized_profit,
                ],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn read_events(&self, instrument: &str) -> Result<Vec<TradeEvent>, TradewindError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT timestamp, kind, shares, price, total_value, realized_profit
                 FROM trades WHERE instrument = $1
                 ORDER BY timestamp ASC, id ASC",
                &[&instrument],
            )
            .map_err(query_error)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: NaiveDateTime = row.get(0);
            let tag: String = row.get(1);
            let kind = TradeKind::parse(&tag).ok_or_else(|| TradewindError::DatabaseQuery {
                reason: format!("unknown trade kind tag '{tag}'"),
            })?;
            events.push(TradeEvent {
                timestamp,
                instrument: instrument.to_string(),
                kind,
                shares: row.get(2),
                price: row.get(3),
                total_value: row.get(4),
                realized_profit: row.get(5),
            });
        }

        Ok(events)
    }

    fn upsert_performance(&self, record: &PerformanceRecord) -> Result<(), TradewindError> {
        self.client
            .borrow_mut()
            .execute(
                "INSERT INTO daily_performance (date, instrument, total_asset)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (date, instrument) DO UPDATE SET total_asset = EXCLUDED.total_asset",
                &[&record.date, &record.instrument, &record.asset_value],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn read_performance(
        &self,
        instrument: &str,
    ) -> Result<Vec<PerformanceRecord>, TradewindError> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT date, total_asset FROM daily_performance
                 WHERE instrument = $1 ORDER BY date ASC",
                &[&instrument],
            )
            .map_err(query_error)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let date: NaiveDate = row.get(0);
                PerformanceRecord {
                    date,
                    instrument: instrument.to_string(),
                    asset_value: row.get(1),
                }
            })
            .collect())
    }
}
