//! Machine-readable run report
//!
//! Rendering and notification live outside this crate; they consume the JSON
//! written here: `<dir>/<timestamp>result.json`, mirrored to `<dir>/latest.json`.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::case::{CaseResult, CaseStatus};
use crate::common::{Error, Result};

/// Suffix of timestamped report files
const REPORT_SUFFIX: &str = "result.json";
/// Stable entry point to the most recent report
pub const LATEST_REPORT: &str = "latest.json";

/// Case counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl Counts {
    pub fn tally(results: &[CaseResult]) -> Self {
        let mut counts = Counts {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.status {
                CaseStatus::Passed => counts.passed += 1,
                CaseStatus::Failed => counts.failed += 1,
                CaseStatus::Errored => counts.errored += 1,
                CaseStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Full report of one run
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub tester: Option<&'a str>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub duration_ms: i64,
    pub artifact: &'a Path,
    pub counts: Counts,
    pub cases: &'a [CaseResult],
}

/// Write the report and refresh `latest.json`; returns the timestamped path
pub fn write_report(dir: &Path, report: &RunReport<'_>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Report(format!("cannot create '{}': {e}", dir.display())))?;

    let name = format!(
        "{}{REPORT_SUFFIX}",
        report.started_at.format("%Y-%m-%d %H_%M_%S")
    );
    let path = dir.join(name);
    let json = serde_json::to_vec_pretty(report)
        .map_err(|e| Error::Report(format!("cannot serialize report: {e}")))?;
    std::fs::write(&path, json)
        .map_err(|e| Error::Report(format!("cannot write '{}': {e}", path.display())))?;

    let latest = dir.join(LATEST_REPORT);
    std::fs::copy(&path, &latest)
        .map_err(|e| Error::Report(format!("cannot write '{}': {e}", latest.display())))?;

    Ok(path)
}

/// Most recently modified timestamped report in a directory
pub fn newest_report(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::Report(format!("cannot list '{}': {e}", dir.display())))?;

    let mut reports: Vec<(std::time::SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(REPORT_SUFFIX))
        })
        .filter_map(|path| {
            let modified = path.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .collect();

    reports.sort();
    Ok(reports.pop().map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let counts = Counts {
            total: 3,
            passed: 2,
            skipped: 1,
            ..Default::default()
        };
        assert!(counts.all_passed());
        assert!(!Counts {
            errored: 1,
            ..counts
        }
        .all_passed());
    }

    #[test]
    fn test_write_report_and_find_newest() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local::now();
        let report = RunReport {
            title: "API Contract Test Report",
            description: "demo",
            tester: Some("qa-bot"),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            artifact: Path::new("report/excelReport/cases.xlsx"),
            counts: Counts::default(),
            cases: &[],
        };

        let path = write_report(dir.path(), &report).unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("result.json"));
        assert!(dir.path().join(LATEST_REPORT).exists());

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["tester"], "qa-bot");
        assert_eq!(written["counts"]["total"], 0);

        assert_eq!(newest_report(dir.path()).unwrap(), Some(path));
    }
}
