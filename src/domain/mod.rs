//! Core domain types and logic.

pub mod bar;
pub mod indicator;
pub mod signal;
pub mod ledger;
pub mod risk;
pub mod engine;
pub mod strategy;
pub mod evaluation;
pub mod backtest;
pub mod error;
