//! Suite orchestration
//!
//! Loads every case from the template artifact, optionally resets the target
//! fixtures, runs the cases one after another against a single verdict
//! workbook and writes the run report.

use chrono::Local;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use super::case::{CaseResult, CaseRunner};
use super::report::{newest_report, write_report, Counts, RunReport};
use super::reset::reset_fixtures;
use crate::artifact::{CaseSource, VerdictWriter};
use crate::case::TestCase;
use crate::common::config::Config;
use crate::common::Result;
use crate::http::{HttpTransport, RequestDispatcher, Transport};
use crate::resolve::EndpointResolver;

/// Per-run switches
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Only run cases whose ID contains this substring
    pub filter: Option<String>,
    /// Call the reset endpoint before the first case
    pub reset: bool,
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filter: None,
            reset: true,
            verbose: false,
        }
    }
}

/// Outcome of a whole run
#[derive(Debug)]
pub struct RunSummary {
    pub counts: Counts,
    pub artifact: PathBuf,
    pub report: PathBuf,
    pub results: Vec<CaseResult>,
}

impl RunSummary {
    /// 0 when every case passed or was skipped, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.counts.all_passed() {
            0
        } else {
            1
        }
    }
}

/// Run the suite against the real network
pub async fn run_suite(config: &Config, options: &RunOptions) -> Result<RunSummary> {
    let endpoint = EndpointResolver::from_config(&config.target);

    if options.reset {
        let reset = HttpTransport::new(Duration::from_secs(config.target.reset_timeout_secs))?;
        reset_fixtures(&reset, &endpoint, config).await;
    }

    let transport = HttpTransport::new(Duration::from_secs(config.target.timeout_secs))?;
    execute(config, options, endpoint, Box::new(transport)).await
}

/// Run the suite over an arbitrary transport
pub async fn execute(
    config: &Config,
    options: &RunOptions,
    endpoint: EndpointResolver,
    transport: Box<dyn Transport>,
) -> Result<RunSummary> {
    let started_at = Local::now();

    let source = CaseSource::new(&config.artifact.source, &config.artifact.sheet);
    let cases = select(source.load()?, options.filter.as_deref());
    tracing::info!(
        source = %source.path().display(),
        cases = cases.len(),
        "Loaded test cases"
    );

    let target = config.target_artifact();
    let mut writer =
        VerdictWriter::from_config(&config.artifact, &target, config.report.tester.clone());
    writer.ensure_initialized()?;

    let mut runner = CaseRunner::new(
        endpoint,
        RequestDispatcher::new(transport),
        writer,
        config.artifact.row_source,
    )
    .verbose(options.verbose);

    println!(
        "\n{} {}",
        "Running Suite:".blue().bold(),
        config.report.title.white().bold()
    );
    if !config.report.description.is_empty() {
        println!("  {}", config.report.description.dimmed());
    }

    let mut results = Vec::with_capacity(cases.len());
    for case in &cases {
        results.push(runner.run(case).await);
    }

    let counts = Counts::tally(&results);
    print_summary(&counts);

    let finished_at = Local::now();
    let report = RunReport {
        title: &config.report.title,
        description: &config.report.description,
        tester: config.report.tester.as_deref(),
        started_at,
        finished_at,
        duration_ms: (finished_at - started_at).num_milliseconds(),
        artifact: &target,
        counts,
        cases: &results,
    };
    let written = write_report(&config.report.dir, &report)?;
    let report = newest_report(&config.report.dir)?.unwrap_or(written);

    println!("  Verdicts: {}", target.display().to_string().dimmed());
    println!("  Report:   {}", report.display().to_string().dimmed());

    Ok(RunSummary {
        counts,
        artifact: target,
        report,
        results,
    })
}

/// Keep cases whose ID contains `filter`
fn select(mut cases: Vec<TestCase>, filter: Option<&str>) -> Vec<TestCase> {
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        cases.retain(|case| case.id.contains(filter));
        if cases.is_empty() {
            tracing::warn!(filter, "No case matches the filter");
        }
    }
    cases
}

fn print_summary(counts: &Counts) {
    println!();
    let line = format!(
        "{} passed, {} failed, {} errored, {} skipped ({} total)",
        counts.passed, counts.failed, counts.errored, counts.skipped, counts.total
    );
    if counts.all_passed() {
        println!("{} {}", "✓".green().bold(), line.green().bold());
    } else {
        println!("{} {}", "✗".red().bold(), line.red().bold());
    }
}
