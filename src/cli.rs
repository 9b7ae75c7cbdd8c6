//! CLI definition and dispatch.
//!
//! Progress goes to stderr as numbered stages; results go to stdout. Errors
//! map to process exit codes through `From<&TradewindError> for ExitCode`.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self, BacktestConfig};
use crate::domain::error::TradewindError;
use crate::domain::evaluation;
use crate::domain::ledger::TradeEvent;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

#[derive(Parser, Debug)]
#[command(name = "tradewind", about = "Single-instrument daily trading decision engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one live decision cycle
    Evaluate {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
        /// Override [strategy] instrument
        #[arg(short, long)]
        instrument: Option<String>,
        /// Evaluation time, YYYY-MM-DDTHH:MM:SS (default: now)
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Replay the decision engine over a historical window
    Backtest {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
        #[arg(short, long)]
        instrument: Option<String>,
        /// Window start, YYYY-MM-DD (default: [backtest] start_date)
        #[arg(long)]
        start: Option<String>,
        /// Window end, YYYY-MM-DD (default: [backtest] end_date)
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        initial_cash: Option<f64>,
    },
    /// Print the persisted trade log
    History {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
        #[arg(short, long)]
        instrument: Option<String>,
        /// Show only the most recent N events
        #[arg(long)]
        limit: Option<usize>,
        /// Also print the daily performance series
        #[arg(long)]
        performance: bool,
    },
    /// Load and validate configuration without touching data or ledger
    Validate {
        #[arg(short, long, default_value = "config.ini")]
        config: PathBuf,
        #[arg(short, long)]
        instrument: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Evaluate {
            config,
            instrument,
            as_of,
        } => run_evaluate(&config, instrument.as_deref(), as_of.as_deref()),
        Command::Backtest {
            config,
            instrument,
            start,
            end,
            initial_cash,
        } => run_backtest(
            &config,
            instrument.as_deref(),
            start.as_deref(),
            end.as_deref(),
            initial_cash,
        ),
        Command::History {
            config,
            instrument,
            limit,
            performance,
        } => run_history(&config, instrument.as_deref(), limit, performance),
        Command::Validate { config, instrument } => run_validate(&config, instrument.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, TradewindError> {
    FileConfigAdapter::from_file(path).map_err(|e| TradewindError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `--as-of` value, or the current local time when absent.
pub fn parse_as_of(raw: Option<&str>) -> Result<NaiveDateTime, TradewindError> {
    match raw {
        Some(raw) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map_err(|_| {
            TradewindError::ConfigInvalid {
                section: "cli".into(),
                key: "as_of".into(),
                reason: format!("'{raw}' is not YYYY-MM-DDTHH:MM:SS"),
            }
        }),
        None => Ok(Local::now().naive_local()),
    }
}

fn parse_window_date(key: &str, raw: &str) -> Result<NaiveDate, TradewindError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| TradewindError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: format!("'{raw}' is not YYYY-MM-DD"),
    })
}

/// Backtest window from CLI args with `[backtest]` section fallback; initial
/// cash falls back further to the strategy's own.
pub fn build_backtest_config(
    config: &dyn ConfigPort,
    strategy: &Strategy,
    start: Option<&str>,
    end: Option<&str>,
    initial_cash: Option<f64>,
) -> Result<BacktestConfig, TradewindError> {
    let start_raw = start
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "start_date"))
        .ok_or_else(|| TradewindError::ConfigMissing {
            section: "backtest".into(),
            key: "start_date".into(),
        })?;
    let end_raw = end
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "end_date"))
        .ok_or_else(|| TradewindError::ConfigMissing {
            section: "backtest".into(),
            key: "end_date".into(),
        })?;

    let start_date = parse_window_date("start_date", &start_raw)?;
    let end_date = parse_window_date("end_date", &end_raw)?;
    if end_date < start_date {
        return Err(TradewindError::ConfigInvalid {
            section: "backtest".into(),
            key: "end_date".into(),
            reason: "end_date is before start_date".into(),
        });
    }

    let initial_cash = match initial_cash {
        Some(cash) => cash,
        None => config
            .get_double("backtest", "initial_cash")?
            .unwrap_or(strategy.initial_cash),
    };

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_cash,
    })
}

/// Opens the configured ledger backend and ensures its schema exists.
pub fn build_ledger(config: &dyn ConfigPort) -> Result<Box<dyn LedgerPort>, TradewindError> {
    #[cfg(feature = "postgres")]
    {
        use crate::adapters::postgres_adapter::PostgresAdapter;

        let adapter = PostgresAdapter::from_config(config)?;
        adapter.initialize_schema()?;
        Ok(Box::new(adapter))
    }

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let adapter = SqliteAdapter::from_config(config)?;
        adapter.initialize_schema()?;
        Ok(Box::new(adapter))
    }

    #[cfg(not(any(feature = "sqlite", feature = "postgres")))]
    {
        let _ = config;
        Err(TradewindError::Database {
            reason: "no ledger backend enabled (build with the sqlite or postgres feature)".into(),
        })
    }
}

fn fail(e: &TradewindError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

fn print_event(event: &TradeEvent) {
    match event.realized_profit {
        Some(profit) => println!(
            "{}  {:<28} {:>6} @ {:>10.2}  total {:>14.2}  pnl {:>12.2}",
            event.timestamp, event.kind, event.shares, event.price, event.total_value, profit,
        ),
        None => println!(
            "{}  {:<28} {:>6} @ {:>10.2}  total {:>14.2}",
            event.timestamp, event.kind, event.shares, event.price, event.total_value,
        ),
    }
}

fn run_evaluate(config_path: &PathBuf, instrument: Option<&str>, as_of: Option<&str>) -> ExitCode {
    eprintln!("[1/4] Loading configuration from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let strategy = match Strategy::from_config(&config, instrument) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let as_of = match parse_as_of(as_of) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    eprintln!("[2/4] Opening bar source and ledger");
    let data = match CsvAdapter::from_config(&config) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let ledger = match build_ledger(&config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "[3/4] Evaluating {} ({}) as of {}",
        strategy.instrument, strategy.variant, as_of
    );
    let evaluation = match evaluation::evaluate(&data, ledger.as_ref(), &strategy, as_of) {
        Ok(e) => e,
        Err(e) => return fail(&e),
    };

    eprintln!("[4/4] Performance record written");

    println!("instrument:  {}", strategy.instrument);
    println!("signal:      {}", evaluation.signal);
    println!("action:      {}", evaluation.outcome);
    println!("close:       {:.2}", evaluation.price);
    println!(
        "position:    {} shares @ avg cost {:.2}",
        evaluation.position.shares, evaluation.position.avg_cost
    );
    println!("cash:        {:.2}", evaluation.position.cash);
    println!("total asset: {:.2}", evaluation.total_asset);
    ExitCode::SUCCESS
}

fn run_backtest(
    config_path: &PathBuf,
    instrument: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    initial_cash: Option<f64>,
) -> ExitCode {
    eprintln!("[1/4] Loading configuration from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let strategy = match Strategy::from_config(&config, instrument) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let bt_config = match build_backtest_config(&config, &strategy, start, end, initial_cash) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    eprintln!("[2/4] Opening bar source");
    let data = match CsvAdapter::from_config(&config) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "[3/4] Replaying {} ({}) from {} to {}",
        strategy.instrument, strategy.variant, bt_config.start_date, bt_config.end_date
    );
    let result = match backtest::run_backtest(&data, &strategy, &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    eprintln!("[4/4] Done: {} days replayed", result.daily_asset_values.len());

    for event in &result.trade_log {
        print_event(event);
    }

    println!();
    if let Some(final_asset) = result.final_asset() {
        println!("final asset:     {:.2}", final_asset);
    }
    if let Some(total_return) = result.total_return_pct(bt_config.initial_cash) {
        println!("total return:    {:.2}%", total_return);
    }
    println!("executed trades: {}", result.executed_trades());
    ExitCode::SUCCESS
}

fn run_history(
    config_path: &PathBuf,
    instrument: Option<&str>,
    limit: Option<usize>,
    performance: bool,
) -> ExitCode {
    eprintln!("[1/3] Loading configuration from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let strategy = match Strategy::from_config(&config, instrument) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!("[2/3] Opening ledger");
    let ledger = match build_ledger(&config) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    eprintln!("[3/3] Reading history for {}", strategy.instrument);
    let events = match ledger.read_events(&strategy.instrument) {
        Ok(events) => events,
        Err(e) => return fail(&e),
    };

    let skip = limit.map_or(0, |n| events.len().saturating_sub(n));
    for event in &events[skip..] {
        print_event(event);
    }
    if events.is_empty() {
        eprintln!("no events recorded for {}", strategy.instrument);
    }

    if performance {
        let records = match ledger.read_performance(&strategy.instrument) {
            Ok(r) => r,
            Err(e) => return fail(&e),
        };
        println!();
        for record in &records {
            println!("{}  {:>14.2}", record.date, record.asset_value);
        }
    }

    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf, instrument: Option<&str>) -> ExitCode {
    eprintln!("[1/2] Loading configuration from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    eprintln!("[2/2] Validating strategy");
    let strategy = match Strategy::from_config(&config, instrument) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    println!("instrument:      {}", strategy.instrument);
    println!("signal variant:  {}", strategy.variant);
    println!("initial cash:    {:.2}", strategy.initial_cash);
    println!("lot size:        {}", strategy.lot_size);
    println!("max position:    {}", strategy.max_position);
    println!("stop loss:       {:.1}%", strategy.stop_loss_pct * 100.0);
    match strategy.take_profit_pct {
        Some(pct) => println!("take profit:     {:.1}%", pct * 100.0),
        None => println!("take profit:     none"),
    }
    println!(
        "windows:         {}/{}/{} (lag {}, extrema {})",
        strategy.indicators.short_window,
        strategy.indicators.medium_window,
        strategy.indicators.long_window,
        strategy.indicators.lag,
        strategy.indicators.extrema_window,
    );
    println!("warmup days:     {}", strategy.warmup_days);
    println!();
    println!("configuration is valid");
    ExitCode::SUCCESS
}
