//! Bar series access port.

use crate::domain::bar::Bar;
use crate::domain::error::TradewindError;
use chrono::NaiveDate;

/// Supplies ordered daily bars for one instrument, normalized to a single
/// schema regardless of where the data came from.
pub trait DataPort {
    /// Bars for `[start_date, end_date]` inclusive, ascending by date.
    fn fetch_ohlcv(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradewindError>;
}
