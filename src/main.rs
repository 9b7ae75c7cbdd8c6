use clap::Parser;
use tradewind::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
