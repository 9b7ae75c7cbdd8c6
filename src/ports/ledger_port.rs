//! Trade ledger persistence port.
//!
//! Carries the append-only log contract: events are appended one at a time
//! (atomic per event), never mutated or deleted, and read back in full so
//! callers fold the complete ordered log instead of caching ledger state.

use crate::domain::error::TradewindError;
use crate::domain::ledger::{PerformanceRecord, TradeEvent};

pub trait LedgerPort {
    fn append_event(&self, event: &TradeEvent) -> Result<(), TradewindError>;

    /// Full event log for one instrument, ordered by timestamp ascending,
    /// ties broken by insertion order.
    fn read_events(&self, instrument: &str) -> Result<Vec<TradeEvent>, TradewindError>;

    /// Idempotent close-of-day valuation write; later writes for the same
    /// (date, instrument) win.
    fn upsert_performance(&self, record: &PerformanceRecord) -> Result<(), TradewindError>;

    /// Performance series for one instrument, ordered by date ascending.
    fn read_performance(&self, instrument: &str)
        -> Result<Vec<PerformanceRecord>, TradewindError>;
}
