//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config loading from real INI files on disk
//! - Backtest window resolution (CLI args over [backtest] keys)
//! - `--as-of` parsing
//! - Strategy construction through the config port
//! - Ledger construction against a temporary SQLite file
//! - A full backtest through the CSV adapter

mod common;

use chrono::NaiveDate;
use common::*;
use std::io::Write;
use std::path::PathBuf;
use tradewind::adapters::csv_adapter::CsvAdapter;
use tradewind::adapters::file_config_adapter::FileConfigAdapter;
use tradewind::cli;
use tradewind::domain::backtest::run_backtest;
use tradewind::domain::error::TradewindError;
use tradewind::domain::signal::SignalVariant;
use tradewind::domain::strategy::Strategy;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[data]
csv_dir = /tmp/bars

[sqlite]
path = /tmp/tradewind.db

[backtest]
start_date = 2023-01-01
end_date = 2024-12-31
initial_cash = 500000

[strategy]
instrument = 2330.TW
signal_variant = crossover
lot_size = 500
"#;

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_file_from_disk() {
        let file = write_temp_ini(VALID_INI);
        let config = cli::load_config(&PathBuf::from(file.path())).unwrap();
        let strategy = Strategy::from_config(&config, None).unwrap();
        assert_eq!(strategy.instrument, "2330.TW");
        assert_eq!(strategy.variant, SignalVariant::Crossover);
        assert_eq!(strategy.lot_size, 500);
    }

    #[test]
    fn load_config_missing_file_fails() {
        let err = cli::load_config(&PathBuf::from("/nonexistent/config.ini")).unwrap_err();
        assert!(matches!(err, TradewindError::ConfigParse { .. }));
    }
}

mod backtest_window {
    use super::*;

    #[test]
    fn window_from_config_section() {
        let config = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let strategy = Strategy::from_config(&config, None).unwrap();
        let bt = cli::build_backtest_config(&config, &strategy, None, None, None).unwrap();

        assert_eq!(bt.start_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(bt.end_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(bt.initial_cash, 500_000.0);
    }

    #[test]
    fn cli_args_override_config_window() {
        let config = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let strategy = Strategy::from_config(&config, None).unwrap();
        let bt = cli::build_backtest_config(
            &config,
            &strategy,
            Some("2024-03-01"),
            Some("2024-06-30"),
            Some(250_000.0),
        )
        .unwrap();

        assert_eq!(bt.start_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(bt.end_date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(bt.initial_cash, 250_000.0);
    }

    #[test]
    fn initial_cash_falls_back_to_strategy() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-06-30\n\
                   [strategy]\ninstrument = X\ninitial_cash = 750000\n";
        let config = FileConfigAdapter::from_string(ini).unwrap();
        let strategy = Strategy::from_config(&config, None).unwrap();
        let bt = cli::build_backtest_config(&config, &strategy, None, None, None).unwrap();
        assert_eq!(bt.initial_cash, 750_000.0);
    }

    #[test]
    fn missing_start_date_fails() {
        let config = FileConfigAdapter::from_string("[backtest]\nend_date = 2024-12-31\n").unwrap();
        let strategy = Strategy::crossover("X");
        let err = cli::build_backtest_config(&config, &strategy, None, None, None).unwrap_err();
        assert!(matches!(
            err,
            TradewindError::ConfigMissing { key, .. } if key == "start_date"
        ));
    }

    #[test]
    fn bad_date_format_fails() {
        let config = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        let strategy = Strategy::crossover("X");
        let err = cli::build_backtest_config(
            &config,
            &strategy,
            Some("2024/01/01"),
            Some("2024-12-31"),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TradewindError::ConfigInvalid { key, .. } if key == "start_date"
        ));
    }

    #[test]
    fn inverted_window_fails() {
        let config = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        let strategy = Strategy::crossover("X");
        let err = cli::build_backtest_config(
            &config,
            &strategy,
            Some("2024-12-31"),
            Some("2024-01-01"),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TradewindError::ConfigInvalid { key, .. } if key == "end_date"
        ));
    }
}

mod as_of_parsing {
    use super::*;

    #[test]
    fn explicit_timestamp_parses() {
        let parsed = cli::parse_as_of(Some("2024-01-15T13:30:00")).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn garbage_timestamp_fails() {
        let err = cli::parse_as_of(Some("yesterday")).unwrap_err();
        assert!(matches!(
            err,
            TradewindError::ConfigInvalid { key, .. } if key == "as_of"
        ));
    }

    #[test]
    fn absent_timestamp_defaults_to_now() {
        assert!(cli::parse_as_of(None).is_ok());
    }
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
mod ledger_building {
    use super::*;
    use tradewind::domain::ledger::{TradeEvent, TradeKind};
    use tradewind::ports::ledger_port::LedgerPort;

    #[test]
    fn build_ledger_creates_sqlite_file_and_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("ledger.db");
        let ini = format!("[sqlite]\npath = {}\n", db_path.display());
        let config = FileConfigAdapter::from_string(&ini).unwrap();

        let ledger = cli::build_ledger(&config).unwrap();

        let event = TradeEvent::marker(
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(13, 30, 0)
                .unwrap(),
            "2330.TW",
            TradeKind::BuySignal,
            600.0,
        );
        ledger.append_event(&event).unwrap();

        assert!(db_path.exists());
        let events = ledger.read_events("2330.TW").unwrap();
        assert_eq!(events, vec![event]);
    }

    #[test]
    fn build_ledger_without_sqlite_section_fails() {
        let config = FileConfigAdapter::from_string("[strategy]\ninstrument = X\n").unwrap();
        // Box<dyn LedgerPort> has no Debug, so take the Err arm directly.
        let err = cli::build_ledger(&config).err().unwrap();
        assert!(matches!(
            err,
            TradewindError::ConfigMissing { section, .. } if section == "sqlite"
        ));
    }
}

mod csv_pipeline {
    use super::*;

    /// Writes the golden-cross series as a CSV file and a config pointing at
    /// it, then runs the backtest exactly as the command would.
    #[test]
    fn backtest_through_csv_adapter() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut csv = String::from("date,open,high,low,close,volume\n");
        for bar in bars_from_closes(
            "2023-12-28",
            &[115.0, 110.0, 60.0, 30.0, 100.0, 105.0, 98.0, 150.0],
        ) {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
            ));
        }
        std::fs::write(dir.path().join("2330.TW.csv"), csv).unwrap();

        let ini = format!(
            "[data]\ncsv_dir = {}\n\n[backtest]\nstart_date = 2024-01-01\nend_date = 2024-01-04\n",
            dir.path().display()
        );
        let config = FileConfigAdapter::from_string(&ini).unwrap();

        let strategy = fast_crossover_strategy("2330.TW");
        let bt = cli::build_backtest_config(&config, &strategy, None, None, None).unwrap();
        let data = CsvAdapter::from_config(&config).unwrap();

        let result = run_backtest(&data, &strategy, &bt).unwrap();
        assert_eq!(result.executed_trades(), 2);
        assert_eq!(result.final_asset(), Some(1_050_000.0));
    }
}
