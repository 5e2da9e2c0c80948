//! Single-case execution
//!
//! One case moves through
//! `Pending → Dispatched → {Parsed | TransportFailed} → Compared →
//! VerdictWritten → {AssertedPass | AssertedFail}`.
//! The written verdict and the assertion come from the same comparison, so
//! they cannot disagree.

use std::time::Instant;

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::artifact::{Verdict, VerdictWriter};
use crate::case::TestCase;
use crate::common::config::RowSource;
use crate::common::{Error, Result};
use crate::http::{
    normalize, ActualOutcome, Comparison, DispatchOutcome, Expectation, RawResponse,
    RequestDispatcher, ResolvedCase,
};
use crate::resolve::EndpointResolver;

/// Lifecycle states of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Pending,
    Dispatched,
    Parsed,
    TransportFailed,
    Compared,
    VerdictWritten,
    AssertedPass,
    AssertedFail,
    /// Blank identifier
    Skipped,
    /// Declaration or parse error
    Errored,
}

/// Final classification of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Errored,
    Skipped,
}

/// Everything observed while running one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub id: String,
    pub use_case: String,
    /// Sheet row that received the verdict
    pub row: Option<u32>,
    pub status: CaseStatus,
    pub states: Vec<CaseState>,
    pub verdict: Option<Verdict>,
    pub resolved: Option<ResolvedCase>,
    pub expected: Option<Expectation>,
    pub actual: Option<ActualOutcome>,
    pub comparison: Option<Comparison>,
    pub http_status: Option<u16>,
    pub response_body: Option<String>,
    pub failure: Option<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl CaseResult {
    fn new(case: &TestCase) -> Self {
        Self {
            id: case.id.clone(),
            use_case: case.use_case.clone(),
            row: None,
            status: CaseStatus::Errored,
            states: vec![CaseState::Pending],
            verdict: None,
            resolved: None,
            expected: None,
            actual: None,
            comparison: None,
            http_status: None,
            response_body: None,
            failure: None,
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    fn enter(&mut self, state: CaseState) {
        tracing::debug!(case = %self.id, ?state, "Case state");
        self.states.push(state);
    }

    pub fn state(&self) -> CaseState {
        self.states.last().copied().unwrap_or(CaseState::Pending)
    }

    /// The case's assertion: `Ok` for passed or skipped cases
    pub fn assertion(&self) -> Result<()> {
        match self.status {
            CaseStatus::Passed | CaseStatus::Skipped => Ok(()),
            CaseStatus::Failed | CaseStatus::Errored => Err(Error::TestAssertion(
                self.failure
                    .clone()
                    .unwrap_or_else(|| format!("case '{}' failed", self.id)),
            )),
        }
    }
}

/// Runs cases end-to-end and persists their verdicts
pub struct CaseRunner {
    endpoint: EndpointResolver,
    dispatcher: RequestDispatcher,
    writer: VerdictWriter,
    row_source: RowSource,
    verbose: bool,
}

impl CaseRunner {
    pub fn new(
        endpoint: EndpointResolver,
        dispatcher: RequestDispatcher,
        writer: VerdictWriter,
        row_source: RowSource,
    ) -> Self {
        Self {
            endpoint,
            dispatcher,
            writer,
            row_source,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run one case to completion
    ///
    /// Never returns an error: every problem is contained in the result.
    pub async fn run(&mut self, case: &TestCase) -> CaseResult {
        let started = Instant::now();
        let mut result = CaseResult::new(case);
        self.execute(case, &mut result).await;
        result.duration_ms = started.elapsed().as_millis() as u64;
        result
    }

    async fn execute(&mut self, case: &TestCase, result: &mut CaseResult) {
        let row = match case.writeback_row(self.row_source) {
            Ok(Some(row)) => row,
            Ok(None) => {
                println!(
                    "  {} Row {}: empty ID, skipped",
                    "-".yellow(),
                    case.sheet_row
                );
                result.status = CaseStatus::Skipped;
                result.enter(CaseState::Skipped);
                return;
            }
            Err(e) => return self.fail_errored(result, None, e),
        };
        result.row = Some(row);

        println!(
            "\n{} {}",
            "Running case:".blue().bold(),
            case.id.white().bold()
        );
        if !case.use_case.is_empty() {
            println!("  UseCase: {}", case.use_case.dimmed());
        }

        // Pending -> Dispatched
        let resolved = ResolvedCase::resolve(case, &self.endpoint);
        print_request(case, &resolved, self.verbose);
        result.warnings.extend(resolved.warnings.iter().cloned());
        result.resolved = Some(resolved.clone());

        let outcome = match self.dispatcher.dispatch(case, &resolved).await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail_errored(result, Some(row), e),
        };
        result.enter(CaseState::Dispatched);

        let response = match outcome {
            DispatchOutcome::Response(response) => response,
            DispatchOutcome::NoResponse { reason } => {
                // Dispatched -> TransportFailed
                println!("  {} {}", "No response:".red(), reason);
                result.enter(CaseState::TransportFailed);
                result.failure = Some(format!("No response from {}: {}", resolved.url, reason));
                self.finish(result, row, Verdict::Fail);
                return;
            }
        };
        print_response(&response);
        result.http_status = Some(response.status);
        result.response_body = Some(response.body.clone());

        let expected = match expectation(case) {
            Ok(expected) => expected,
            Err(e) => return self.fail_errored(result, Some(row), e),
        };
        result.expected = Some(expected.clone());

        // Dispatched -> Parsed
        let actual = match normalize(&response, &expected) {
            Ok(actual) => actual,
            Err(e) => return self.fail_errored(result, Some(row), e),
        };
        if actual.remapped {
            println!(
                "  {} HTTP {} validation rejection mapped to {} / {}",
                "note:".cyan(),
                actual.http_status,
                expected.status,
                expected.message.as_deref().unwrap_or_default()
            );
        }
        result.enter(CaseState::Parsed);

        // Parsed -> Compared
        let comparison = actual.compare(&expected);
        result.enter(CaseState::Compared);
        if !comparison.passed() {
            result.failure = Some(mismatch_message(&actual, &expected, &comparison, &response));
        }
        result.comparison = Some(comparison);
        result.actual = Some(actual);

        self.finish(result, row, Verdict::from_passed(comparison.passed()));
    }

    /// Write the verdict and settle the terminal state
    fn finish(&mut self, result: &mut CaseResult, row: u32, verdict: Verdict) {
        let written = self.write_verdict(result, row, verdict);

        result.status = match (written, verdict) {
            (true, Verdict::Pass) => CaseStatus::Passed,
            (true, Verdict::Fail) => CaseStatus::Failed,
            (false, _) => CaseStatus::Errored,
        };
        result.enter(if result.status == CaseStatus::Passed {
            CaseState::AssertedPass
        } else {
            CaseState::AssertedFail
        });

        let marker = match verdict {
            Verdict::Pass => verdict.as_str().green().bold(),
            Verdict::Fail => verdict.as_str().red().bold(),
        };
        println!("  Test result: {} ----> {}", result.id, marker);
        if let Some(failure) = &result.failure {
            println!("  {} {}", "✗".red(), failure);
        }
    }

    /// Declaration or parse error: the case fails, FAIL is written if the row is known
    fn fail_errored(&mut self, result: &mut CaseResult, row: Option<u32>, error: Error) {
        println!("  {} {}: {}", "✗".red(), result.id, error);
        result.failure = Some(error.to_string());
        result.status = CaseStatus::Errored;
        result.enter(CaseState::Errored);
        if let Some(row) = row {
            self.write_verdict(result, row, Verdict::Fail);
        }
    }

    /// Persist a verdict; a write failure is recorded on the case, never raised
    fn write_verdict(&mut self, result: &mut CaseResult, row: u32, verdict: Verdict) -> bool {
        match self.writer.write(row, verdict) {
            Ok(()) => {
                result.verdict = Some(verdict);
                result.enter(CaseState::VerdictWritten);
                true
            }
            Err(e) => {
                tracing::error!(case = %result.id, row, error = %e, "Failed to write verdict");
                let failure = match result.failure.take() {
                    Some(previous) => format!("{previous}; verdict not written: {e}"),
                    None => format!("verdict not written: {e}"),
                };
                result.failure = Some(failure);
                false
            }
        }
    }
}

fn expectation(case: &TestCase) -> Result<Expectation> {
    Ok(Expectation {
        status: case.expected_status()?,
        message: case.expected_message_text(),
    })
}

fn mismatch_message(
    actual: &ActualOutcome,
    expected: &Expectation,
    comparison: &Comparison,
    response: &RawResponse,
) -> String {
    let mut parts = Vec::new();
    if !comparison.status_matches {
        parts.push(format!(
            "status: actual={} expected={}",
            actual.status_text().unwrap_or_else(|| "<none>".into()),
            expected.status
        ));
    }
    if !comparison.message_matches {
        parts.push(format!(
            "message: actual={:?} expected={:?}",
            actual.message_text().unwrap_or_default(),
            expected.message.clone().unwrap_or_default()
        ));
    }
    format!(
        "{} | HTTP={} | body={}",
        parts.join(", "),
        response.status,
        response.body
    )
}

fn print_request(case: &TestCase, resolved: &ResolvedCase, verbose: bool) {
    let show = |value: &Value| -> String {
        match value {
            Value::Null => "None".to_string(),
            other => other.to_string(),
        }
    };
    let show_map = |map: &Option<serde_json::Map<String, Value>>| -> String {
        map.as_ref()
            .map(|m| Value::Object(m.clone()).to_string())
            .unwrap_or_else(|| "None".to_string())
    };

    println!("  HTTP Method: {} | URL: {}", case.method, resolved.url);
    println!("  Query Params: {}", show_map(&resolved.params));
    if resolved.headers.is_some() {
        println!("  Headers: {}", show_map(&resolved.headers));
    }
    println!(
        "  Body Type: {} | Body: {}",
        if case.content_type.is_empty() {
            "None"
        } else {
            case.content_type.as_str()
        },
        show(&resolved.body)
    );
    for warning in &resolved.warnings {
        println!("  {} {}", "[WARN]".yellow(), warning);
    }

    if verbose {
        let names = ["params", "headers", "body"];
        for (name, strategy) in names.iter().zip(resolved.strategies.iter()) {
            if let Some(strategy) = strategy {
                println!("  {}", format!("{name} decoded as {}", strategy.name()).dimmed());
            }
        }
        if resolved.url != case.url.trim() {
            println!("  {}", format!("declared URL: {}", case.url).dimmed());
        }
    }
}

fn print_response(response: &RawResponse) {
    println!("  Response: HTTP {} {}", response.status, response.body);
}
