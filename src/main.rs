//! apicase - spreadsheet-driven HTTP contract test runner
//!
//! Reads test cases from a workbook, replays them against a service and
//! writes a PASS/FAIL verdict back for every case.

use apicase::{cli, commands};
use clap::Parser;
use commands::Commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apicase", about = "Spreadsheet-driven HTTP contract tests")]
#[command(version, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/apicase/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging and decoding details per case
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli::dispatch(cli.command, cli.config.as_deref(), cli.verbose).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(if e.is_run_level() { 2 } else { 1 });
        }
    }
}
