//! Configuration access port.
//!
//! Typed getters distinguish an absent key (`Ok(None)`) from an unparseable
//! value (`ConfigInvalid`), so layered per-instrument defaults never swallow
//! a typo silently.

use crate::domain::error::TradewindError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, TradewindError>;
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, TradewindError>;
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, TradewindError>;
}
