//! Configuration file handling
//!
//! Settings are layered: built-in defaults, then the TOML config file, then
//! environment variables and command-line flags (see [`Overrides`]).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::paths::{self, config_path};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Target service settings
    #[serde(default)]
    pub target: TargetConfig,

    /// Case artifact settings
    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Run report settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Target service settings
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Explicit base URL; replaces scheme and authority of every case URL
    pub base_url: Option<String>,

    /// Base used for the reset endpoint when no override is set
    #[serde(default = "default_reset_base")]
    pub reset_base: String,

    /// Path of the fixture reset endpoint
    #[serde(default = "default_reset_path")]
    pub reset_path: String,

    /// Headers sent with the reset request
    #[serde(default = "default_reset_headers")]
    pub reset_headers: BTreeMap<String, String>,

    /// Host substituted for loopback hosts when running in a container
    #[serde(default = "default_container_host")]
    pub container_host: String,

    /// Marker file whose presence means "running in a container"
    #[serde(default = "default_container_marker")]
    pub container_marker: PathBuf,

    /// Timeout for each case request
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Timeout for the reset request
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            reset_base: default_reset_base(),
            reset_path: default_reset_path(),
            reset_headers: default_reset_headers(),
            container_host: default_container_host(),
            container_marker: default_container_marker(),
            timeout_secs: default_request_timeout(),
            reset_timeout_secs: default_reset_timeout(),
        }
    }
}

fn default_reset_base() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_reset_path() -> String {
    "/api/test/reset".to_string()
}
fn default_reset_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("X-TEST-KEY".to_string(), "local-dev-only".to_string())])
}
fn default_container_host() -> String {
    "host.docker.internal".to_string()
}
fn default_container_marker() -> PathBuf {
    PathBuf::from(paths::CONTAINER_MARKER)
}
fn default_request_timeout() -> u64 {
    10
}
fn default_reset_timeout() -> u64 {
    3
}

/// Where the writeback row of a case comes from
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RowSource {
    /// Third underscore-delimited segment of the case ID
    #[default]
    Id,
    /// Physical row the case was read from
    Position,
}

/// Case artifact settings
#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactConfig {
    /// Template workbook holding the case declarations
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Verdict workbook; defaults to `<report dir>/excelReport/<source name>`
    pub target: Option<PathBuf>,

    /// Sheet holding the cases
    #[serde(default = "default_sheet")]
    pub sheet: String,

    /// Header naming the verdict column
    #[serde(default = "default_result_header")]
    pub result_header: String,

    /// Explicit 1-based verdict column, used when no header matches
    pub result_column: Option<u32>,

    /// Header naming the tester column
    #[serde(default = "default_tester_header")]
    pub tester_header: String,

    /// Writeback row source
    #[serde(default)]
    pub row_source: RowSource,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            target: None,
            sheet: default_sheet(),
            result_header: default_result_header(),
            result_column: None,
            tester_header: default_tester_header(),
            row_source: RowSource::default(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("database").join("DemoAPITestCase.xlsx")
}
fn default_sheet() -> String {
    "Sheet1".to_string()
}
fn default_result_header() -> String {
    "result".to_string()
}
fn default_tester_header() -> String {
    "tester".to_string()
}

/// Run report settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Output directory for reports, logs and the verdict workbook
    #[serde(default = "paths::default_report_dir")]
    pub dir: PathBuf,

    /// Report title
    #[serde(default = "default_title")]
    pub title: String,

    /// Report description
    #[serde(default)]
    pub description: String,

    /// Tester identity, also written to the tester column
    pub tester: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: paths::default_report_dir(),
            title: default_title(),
            description: String::new(),
            tester: None,
        }
    }
}

fn default_title() -> String {
    "API Contract Test Report".to_string()
}

/// Values supplied by environment variables or command-line flags
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub reset_path: Option<String>,
    pub container_host: Option<String>,
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub sheet: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tester: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from an explicit file, or the default config file
    ///
    /// Returns default configuration if no file exists. An explicit path that
    /// does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(super::Error::Config(format!(
                    "Config file '{}' does not exist",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Apply environment/flag overrides on top of the file configuration
    pub fn apply(&mut self, overrides: Overrides) {
        // Blank values count as unset so `BASE_URL=` disables nothing
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(base_url) = non_blank(overrides.base_url) {
            self.target.base_url = Some(base_url);
        }
        if let Some(reset_path) = non_blank(overrides.reset_path) {
            self.target.reset_path = reset_path;
        }
        if let Some(host) = non_blank(overrides.container_host) {
            self.target.container_host = host;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.target.timeout_secs = timeout;
        }
        if let Some(source) = overrides.source {
            self.artifact.source = source;
        }
        if let Some(target) = overrides.target {
            self.artifact.target = Some(target);
        }
        if let Some(sheet) = non_blank(overrides.sheet) {
            self.artifact.sheet = sheet;
        }
        if let Some(dir) = overrides.report_dir {
            self.report.dir = dir;
        }
        if let Some(title) = non_blank(overrides.title) {
            self.report.title = title;
        }
        if let Some(description) = overrides.description {
            self.report.description = description;
        }
        if let Some(tester) = non_blank(overrides.tester) {
            self.report.tester = Some(tester);
        }
    }

    /// Path of the verdict workbook
    pub fn target_artifact(&self) -> PathBuf {
        self.artifact.target.clone().unwrap_or_else(|| {
            paths::default_target_artifact(&self.report.dir, &self.artifact.source)
        })
    }

    /// Full URL of the reset endpoint, before endpoint resolution
    pub fn reset_url(&self) -> String {
        let base = self
            .target
            .base_url
            .as_deref()
            .unwrap_or(&self.target.reset_base)
            .trim_end_matches('/');
        let path = self.target.reset_path.trim();
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}
