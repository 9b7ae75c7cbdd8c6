//! Domain error types.

/// Top-level error type for tradewind.
#[derive(Debug, thiserror::Error)]
pub enum TradewindError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no bars for {instrument}")]
    NoData { instrument: String },

    #[error("insufficient data for {instrument}: have {bars} bars, need {minimum}")]
    InsufficientData {
        instrument: String,
        bars: usize,
        minimum: usize,
    },

    #[error(
        "insufficient funds for {instrument}: one lot of {lot_size} at {price:.2} \
         needs more than the {cash:.2} available, and no trade was ever executed"
    )]
    InsufficientFunds {
        instrument: String,
        price: f64,
        lot_size: i64,
        cash: f64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradewindError> for std::process::ExitCode {
    fn from(err: &TradewindError) -> Self {
        let code: u8 = match err {
            TradewindError::Io(_) => 1,
            TradewindError::ConfigParse { .. }
            | TradewindError::ConfigMissing { .. }
            | TradewindError::ConfigInvalid { .. } => 2,
            TradewindError::Database { .. } | TradewindError::DatabaseQuery { .. } => 3,
            TradewindError::InsufficientFunds { .. } => 4,
            TradewindError::NoData { .. } | TradewindError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
