//! Per-instrument strategy configuration.
//!
//! All sizing, capacity, and risk knobs live here as one explicit value
//! handed to the engine and drivers. Keys are read from the `[strategy]`
//! INI section; a section named after the instrument overrides any key for
//! that instrument alone.

use crate::domain::error::TradewindError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::risk::RiskParams;
use crate::domain::signal::SignalVariant;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_INITIAL_CASH: f64 = 1_000_000.0;
pub const DEFAULT_LOT_SIZE: i64 = 1_000;
pub const DEFAULT_MAX_POSITION: i64 = 3_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub instrument: String,
    pub variant: SignalVariant,
    pub initial_cash: f64,
    /// Shares bought per executed buy.
    pub lot_size: i64,
    /// Hard cap on held shares; a buy that would exceed it is rejected.
    pub max_position: i64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: Option<f64>,
    pub indicators: IndicatorConfig,
    /// Calendar days of extra history fetched before an evaluation or a
    /// backtest start so the slowest indicator can warm up.
    pub warmup_days: i64,
}

impl Strategy {
    /// Trend-template deployment defaults: 15% stop, 30% fixed take-profit,
    /// 50/150/200 windows, two years of warmup.
    pub fn trend_template(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            variant: SignalVariant::TrendTemplate,
            initial_cash: DEFAULT_INITIAL_CASH,
            lot_size: DEFAULT_LOT_SIZE,
            max_position: DEFAULT_MAX_POSITION,
            stop_loss_pct: 0.15,
            take_profit_pct: Some(0.30),
            indicators: IndicatorConfig::trend_template(),
            warmup_days: 730,
        }
    }

    /// Crossover deployment defaults: tight 2% stop, no fixed take-profit,
    /// 5/20 fast pair, 90 days of warmup.
    pub fn crossover(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            variant: SignalVariant::Crossover,
            initial_cash: DEFAULT_INITIAL_CASH,
            lot_size: DEFAULT_LOT_SIZE,
            max_position: DEFAULT_MAX_POSITION,
            stop_loss_pct: 0.02,
            take_profit_pct: None,
            indicators: IndicatorConfig::crossover(),
            warmup_days: 90,
        }
    }

    pub fn risk_params(&self) -> RiskParams {
        RiskParams {
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
        }
    }

    /// Minimum bar count for the active variant to produce a defined
    /// decision.
    pub fn min_bars(&self) -> usize {
        self.variant.min_bars(&self.indicators)
    }

    /// Builds a strategy from config. The instrument comes from the CLI
    /// override when given, else `[strategy] instrument`; every other key
    /// starts from the variant defaults, then `[strategy]`, then the
    /// instrument's own section.
    pub fn from_config(
        config: &dyn ConfigPort,
        instrument_override: Option<&str>,
    ) -> Result<Self, TradewindError> {
        let instrument = instrument_override
            .map(str::to_string)
            .or_else(|| config.get_string("strategy", "instrument"))
            .ok_or_else(|| TradewindError::ConfigMissing {
                section: "strategy".into(),
                key: "instrument".into(),
            })?;

        let variant = match lookup_string(config, &instrument, "signal_variant") {
            Some(value) => {
                SignalVariant::parse(&value).ok_or_else(|| TradewindError::ConfigInvalid {
                    section: "strategy".into(),
                    key: "signal_variant".into(),
                    reason: format!(
                        "unknown variant '{value}', expected trend_template or crossover"
                    ),
                })?
            }
            None => SignalVariant::TrendTemplate,
        };

        let mut strategy = match variant {
            SignalVariant::TrendTemplate => Self::trend_template(&instrument),
            SignalVariant::Crossover => Self::crossover(&instrument),
        };

        if let Some(value) = lookup_double(config, &instrument, "initial_cash")? {
            strategy.initial_cash = value;
        }
        if let Some(value) = lookup_int(config, &instrument, "lot_size")? {
            strategy.lot_size = value;
        }
        if let Some(value) = lookup_int(config, &instrument, "max_position")? {
            strategy.max_position = value;
        }
        if let Some(value) = lookup_double(config, &instrument, "stop_loss_pct")? {
            strategy.stop_loss_pct = value;
        }
        if let Some(value) = lookup_double(config, &instrument, "take_profit_pct")? {
            strategy.take_profit_pct = Some(value);
        }
        if let Some(value) = lookup_int(config, &instrument, "short_window")? {
            strategy.indicators.short_window = value.max(0) as usize;
        }
        if let Some(value) = lookup_int(config, &instrument, "medium_window")? {
            strategy.indicators.medium_window = value.max(0) as usize;
        }
        if let Some(value) = lookup_int(config, &instrument, "long_window")? {
            strategy.indicators.long_window = value.max(0) as usize;
        }
        if let Some(value) = lookup_int(config, &instrument, "lag")? {
            strategy.indicators.lag = value.max(0) as usize;
        }
        if let Some(value) = lookup_int(config, &instrument, "extrema_window")? {
            strategy.indicators.extrema_window = value.max(0) as usize;
        }
        if let Some(value) = lookup_int(config, &instrument, "warmup_days")? {
            strategy.warmup_days = value;
        }

        strategy.validate()?;
        Ok(strategy)
    }

    pub fn validate(&self) -> Result<(), TradewindError> {
        if self.instrument.trim().is_empty() {
            return Err(invalid("instrument", "instrument must not be empty"));
        }
        if self.initial_cash <= 0.0 {
            return Err(invalid("initial_cash", "initial_cash must be positive"));
        }
        if self.lot_size < 1 {
            return Err(invalid("lot_size", "lot_size must be at least 1"));
        }
        if self.max_position < self.lot_size {
            return Err(invalid(
                "max_position",
                "max_position must hold at least one lot",
            ));
        }
        if self.stop_loss_pct <= 0.0 || self.stop_loss_pct >= 1.0 {
            return Err(invalid(
                "stop_loss_pct",
                "stop_loss_pct must be between 0 and 1",
            ));
        }
        if let Some(take_profit_pct) = self.take_profit_pct {
            if take_profit_pct <= 0.0 || take_profit_pct >= 1.0 {
                return Err(invalid(
                    "take_profit_pct",
                    "take_profit_pct must be between 0 and 1",
                ));
            }
        }
        let ind = &self.indicators;
        if ind.short_window == 0
            || ind.medium_window == 0
            || ind.long_window == 0
            || ind.extrema_window == 0
        {
            return Err(invalid(
                "short_window",
                "indicator windows must be at least 1",
            ));
        }
        if ind.short_window >= ind.medium_window {
            return Err(invalid(
                "short_window",
                "short_window must be shorter than medium_window",
            ));
        }
        if ind.lag == 0 {
            return Err(invalid("lag", "lag must be at least 1"));
        }
        if self.warmup_days < 1 {
            return Err(invalid("warmup_days", "warmup_days must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> TradewindError {
    TradewindError::ConfigInvalid {
        section: "strategy".into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn lookup_string(config: &dyn ConfigPort, instrument: &str, key: &str) -> Option<String> {
    config
        .get_string(instrument, key)
        .or_else(|| config.get_string("strategy", key))
}

fn lookup_double(
    config: &dyn ConfigPort,
    instrument: &str,
    key: &str,
) -> Result<Option<f64>, TradewindError> {
    match config.get_double(instrument, key)? {
        Some(value) => Ok(Some(value)),
        None => config.get_double("strategy", key),
    }
}

fn lookup_int(
    config: &dyn ConfigPort,
    instrument: &str,
    key: &str,
) -> Result<Option<i64>, TradewindError> {
    match config.get_int(instrument, key)? {
        Some(value) => Ok(Some(value)),
        None => config.get_int("strategy", key),
    }
}
