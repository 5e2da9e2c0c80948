//! End-to-end integration tests for the apicase CLI
//!
//! These tests verify the complete workflow by:
//! 1. Starting the demo-service binary on a free port
//! 2. Writing a case workbook
//! 3. Running apicase against the service
//! 4. Verifying exit codes, printed output and the written verdicts

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use apicase::artifact::read_marker;
use apicase::common::parse_listen_address;

const HEADERS: [&str; 12] = [
    "ID", "UseCase", "method", "url", "params", "headers", "body", "type", "status_code", "msg",
    "result", "tester",
];

/// One case row, in header order up to `msg`
type Row = [&'static str; 10];

const QUERY_BY_EID: Row = [
    "event_query_001",
    "query event by eid",
    "GET",
    "http://127.0.0.1:8000/api/get_event_list/",
    "eid=1",
    "",
    "",
    "",
    "200",
    "success",
];
const QUERY_WITHOUT_FILTERS: Row = [
    "event_query_002",
    "eid and name both empty",
    "GET",
    "http://127.0.0.1:8000/api/get_event_list/",
    r#"{"eid": "", "name": ""}"#,
    "",
    "",
    "",
    "10021",
    "parameter error",
];
const ADD_DUPLICATE_EID: Row = [
    "event_add_003",
    "event id already exists",
    "POST",
    "http://127.0.0.1:8000/api/add_event/",
    "",
    "",
    "{'eid': '3', 'name': 'new launch', 'limit': 2000, 'address': 'Shenzhen', 'start_time': '2018-12-10 12:00:00'}",
    "data",
    "10022",
    "event id already exists",
];
const ADD_MISSING_FIELD: Row = [
    "event_add_004",
    "eid missing from form",
    "POST",
    "http://127.0.0.1:8000/api/add_event/",
    "",
    "",
    "name=launch&limit=100&address=Beijing&start_time=2024-01-01 10:00:00",
    "data",
    "10021",
    "parameter error",
];
const ADD_NEW_EVENT: Row = [
    "event_add_005",
    "add event",
    "POST",
    "http://127.0.0.1:8000/api/add_event/",
    "",
    "",
    r#"{"eid": "99", "name": "fresh launch", "limit": "100", "address": "Beijing", "start_time": "2024-05-01 09:30:00"}"#,
    "data",
    "200",
    "add event success",
];
const GUEST_BLANK_PHONE: Row = [
    "guest_query_006",
    "blank phone is ignored",
    "GET",
    "http://127.0.0.1:8000/api/get_guest_list/",
    "eid=1&phone=",
    "",
    "",
    "",
    "200.0",
    "success",
];
const ADD_WRONG_EXPECTATION: Row = [
    "event_add_002",
    "existing eid reported as duplicate name",
    "POST",
    "http://127.0.0.1:8000/api/add_event/",
    "",
    "",
    r#"{"eid": "3", "name": "another", "limit": "1", "address": "x", "start_time": "2024-01-01 10:00:00"}"#,
    "data",
    "10023",
    "event name already exists",
];

/// Test context with a running demo service and an isolated directory
struct TestContext {
    _temp: tempfile::TempDir,
    root: PathBuf,
    service: Child,
    base_url: String,
}

impl TestContext {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp.path().to_path_buf();
        std::fs::create_dir_all(root.join("config")).expect("Failed to create config dir");

        let mut service = Command::new(env!("CARGO_BIN_EXE_demo-service"))
            .args(["--port", "0"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start demo-service");

        let stdout = service.stdout.take().expect("demo-service stdout");
        let mut line = String::new();
        BufReader::new(stdout)
            .read_line(&mut line)
            .expect("Failed to read demo-service output");
        let addr = parse_listen_address(&line)
            .unwrap_or_else(|| panic!("Unexpected demo-service output: {line:?}"));

        Self {
            _temp: temp,
            root,
            service,
            base_url: format!("http://{addr}"),
        }
    }

    fn source(&self) -> PathBuf {
        self.root.join("cases.xlsx")
    }

    fn report_dir(&self) -> PathBuf {
        self.root.join("report")
    }

    fn verdicts(&self) -> PathBuf {
        self.report_dir().join("excelReport").join("cases.xlsx")
    }

    fn write_cases(&self, rows: &[Row]) {
        write_workbook(&self.source(), rows);
    }

    /// Run an apicase command against the demo service
    fn run_apicase(&self, args: &[&str]) -> ApicaseOutput {
        let source = self.source();
        let report_dir = self.report_dir();
        let mut full_args: Vec<&str> = args.to_vec();
        full_args.extend([
            "--source",
            source.to_str().unwrap(),
            "--tester",
            "integration",
        ]);

        let output = Command::new(env!("CARGO_BIN_EXE_apicase"))
            .args(&full_args)
            .env("XDG_CONFIG_HOME", self.root.join("config"))
            .env("BASE_URL", &self.base_url)
            .env("REPORT_DIR", &report_dir)
            .env("NO_COLOR", "1")
            .env_remove("RESET_PATH")
            .env_remove("CONTAINER_HOST")
            .env_remove("REPORT_TITLE")
            .env_remove("REPORT_DESCRIPTION")
            .env_remove("TESTER")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run apicase");

        ApicaseOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        }
    }

    fn marker(&self, row: u32) -> Option<String> {
        read_marker(&self.verdicts(), "Sheet1", "result", row).expect("Failed to read verdicts")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = self.service.kill();
        let _ = self.service.wait();
    }
}

/// Output from an apicase command
#[derive(Debug)]
struct ApicaseOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

impl ApicaseOutput {
    fn assert_code(&self, expected: i32) {
        assert_eq!(
            self.code,
            Some(expected),
            "stdout: {}\nstderr: {}",
            self.stdout,
            self.stderr
        );
    }
}

fn write_workbook(path: &Path, rows: &[Row]) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
    for (i, header) in HEADERS.iter().enumerate() {
        sheet.get_cell_mut((i as u32 + 1, 1)).set_value(*header);
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet
                    .get_cell_mut((c as u32 + 1, r as u32 + 2))
                    .set_value(*value);
            }
        }
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

// ============== Tests ==============

#[test]
fn test_full_suite_passes() {
    let ctx = TestContext::new();
    ctx.write_cases(&[
        QUERY_BY_EID,
        QUERY_WITHOUT_FILTERS,
        ADD_DUPLICATE_EID,
        ADD_MISSING_FIELD,
        ADD_NEW_EVENT,
        GUEST_BLANK_PHONE,
    ]);

    let output = ctx.run_apicase(&["run"]);
    output.assert_code(0);
    assert!(output.stdout.contains("Test result: event_query_001 ----> PASS"));
    assert!(output.stdout.contains("6 passed, 0 failed"), "{}", output.stdout);

    for row in 2..=7 {
        assert_eq!(ctx.marker(row).as_deref(), Some("PASS"), "row {row}");
    }
    assert!(ctx.report_dir().join("latest.json").exists());
    assert!(ctx.report_dir().join("apicase.log").exists());
    assert!(ctx.source().exists(), "template must be left in place");
}

#[test]
fn test_duplicate_creation_is_reproducible_with_reset() {
    let ctx = TestContext::new();
    ctx.write_cases(&[QUERY_BY_EID, QUERY_WITHOUT_FILTERS, ADD_DUPLICATE_EID, ADD_MISSING_FIELD, ADD_NEW_EVENT]);

    ctx.run_apicase(&["run", "--filter", "add_005"]).assert_code(0);
    ctx.run_apicase(&["run", "--filter", "add_005"]).assert_code(0);
    assert_eq!(ctx.marker(6).as_deref(), Some("PASS"));

    // Without the reset the event from the previous run is still there
    let output = ctx.run_apicase(&["run", "--filter", "add_005", "--no-reset"]);
    output.assert_code(1);
    assert!(output.stdout.contains("actual=10022 expected=200"), "{}", output.stdout);
    assert_eq!(ctx.marker(6).as_deref(), Some("FAIL"));
}

#[test]
fn test_duplicate_eid_rejection_is_stable() {
    let ctx = TestContext::new();
    ctx.write_cases(&[QUERY_BY_EID, QUERY_WITHOUT_FILTERS, ADD_DUPLICATE_EID]);

    let output = ctx.run_apicase(&["run", "--filter", "add_003"]);
    output.assert_code(0);
    assert!(output.stdout.contains("Test result: event_add_003 ----> PASS"), "{}", output.stdout);
    assert_eq!(ctx.marker(4).as_deref(), Some("PASS"));

    // The seeded eid is still taken when the fixtures are not reset
    let output = ctx.run_apicase(&["run", "--filter", "add_003", "--no-reset"]);
    output.assert_code(0);
    assert!(output.stdout.contains("1 passed, 0 failed"), "{}", output.stdout);
    assert_eq!(ctx.marker(4).as_deref(), Some("PASS"));
    assert_eq!(ctx.marker(2), None);
}

#[test]
fn test_business_mismatch_fails() {
    let ctx = TestContext::new();
    ctx.write_cases(&[QUERY_BY_EID, ADD_WRONG_EXPECTATION]);

    let output = ctx.run_apicase(&["run"]);
    output.assert_code(1);
    assert!(output.stdout.contains("actual=10022 expected=10023"), "{}", output.stdout);
    assert_eq!(ctx.marker(2).as_deref(), Some("PASS"));
    assert_eq!(ctx.marker(3).as_deref(), Some("FAIL"));
}

#[test]
fn test_list_shows_rows_without_dispatching() {
    let ctx = TestContext::new();
    ctx.write_cases(&[QUERY_BY_EID, ADD_MISSING_FIELD]);

    let output = ctx.run_apicase(&["list"]);
    output.assert_code(0);
    assert!(output.stdout.contains("event_query_001"));
    assert!(output.stdout.contains("event_add_004"));
    assert!(output.stdout.contains(&format!("{}/api/add_event/", ctx.base_url)));
    assert!(!ctx.verdicts().exists());
}

#[test]
fn test_reset_command() {
    let ctx = TestContext::new();
    let output = ctx.run_apicase(&["reset"]);
    output.assert_code(0);
    assert!(output.stdout.contains("Fixtures reset"));
}

#[test]
fn test_run_level_errors_exit_2() {
    let ctx = TestContext::new();

    // No workbook written
    let output = ctx.run_apicase(&["run"]);
    output.assert_code(2);
    assert!(output.stderr.contains("Error:"), "{}", output.stderr);

    ctx.write_cases(&[QUERY_BY_EID]);
    let output = ctx.run_apicase(&["--config", "/nonexistent/apicase.toml", "list"]);
    output.assert_code(2);
    assert!(output.stderr.contains("does not exist"), "{}", output.stderr);
}
