//! CLI command handling
//!
//! Builds the effective configuration for a command, installs logging and
//! runs it. Returns the process exit code.

use colored::Colorize;
use std::path::Path;
use std::time::Duration;

use crate::artifact::CaseSource;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, paths, Result};
use crate::http::HttpTransport;
use crate::resolve::EndpointResolver;
use crate::runner::{reset_fixtures, run_suite, RunOptions};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config_file: Option<&Path>, verbose: bool) -> Result<i32> {
    let mut config = Config::load(config_file)?;
    config.apply(command.settings().clone().into());

    match command {
        Commands::Run {
            filter, no_reset, ..
        } => {
            let _guard = logging::init_run(&config.report.dir, verbose).map(|(path, guard)| {
                tracing::debug!(log = %path.display(), "Writing run log");
                guard
            });

            if paths::running_in_container(&config.target.container_marker) {
                tracing::info!(
                    host = %config.target.container_host,
                    "Container detected, loopback URLs are redirected"
                );
            }

            let options = RunOptions {
                filter,
                reset: !no_reset,
                verbose,
            };
            let summary = run_suite(&config, &options).await?;
            Ok(summary.exit_code())
        }

        Commands::List { .. } => {
            logging::init_cli(verbose);

            let cases = CaseSource::new(&config.artifact.source, &config.artifact.sheet).load()?;
            let endpoint = EndpointResolver::from_config(&config.target);

            println!(
                "{} {} ({} cases)",
                "Cases in".cyan(),
                config.artifact.source.display(),
                cases.len()
            );
            for case in &cases {
                let row = match case.writeback_row(config.artifact.row_source) {
                    Ok(Some(row)) => row.to_string(),
                    Ok(None) => "-".to_string(),
                    Err(_) => "?".to_string(),
                };
                let id = if case.is_blank_id() {
                    "(blank)".dimmed().to_string()
                } else {
                    case.id.clone()
                };
                println!(
                    "  {:>4}  {:<24} {:<6} {}",
                    row,
                    id,
                    case.method.trim(),
                    endpoint.resolve(&case.url)
                );
            }
            Ok(0)
        }

        Commands::Reset { .. } => {
            logging::init_cli(verbose);

            let endpoint = EndpointResolver::from_config(&config.target);
            let transport =
                HttpTransport::new(Duration::from_secs(config.target.reset_timeout_secs))?;
            if reset_fixtures(&transport, &endpoint, &config).await {
                println!("{} Fixtures reset", "✓".green());
                Ok(0)
            } else {
                println!("{} Fixture reset failed", "✗".red());
                Ok(1)
            }
        }
    }
}
