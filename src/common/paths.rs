//! Configuration, report and environment paths

use std::path::{Path, PathBuf};

/// Name used for the project directories
const APP_NAME: &str = "apicase";

/// Marker file present inside Docker containers
pub const CONTAINER_MARKER: &str = "/.dockerenv";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/apicase/`
/// - macOS: `~/Library/Application Support/apicase/`
/// - Windows: `%APPDATA%\apicase\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Default report output directory, relative to the working directory
pub fn default_report_dir() -> PathBuf {
    PathBuf::from("report")
}

/// Default location of the verdict artifact for a given template
///
/// `<report dir>/excelReport/<template file name>`
pub fn default_target_artifact(report_dir: &Path, template: &Path) -> PathBuf {
    let file_name = template
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "cases.xlsx".into());
    report_dir.join("excelReport").join(file_name)
}

/// Whether the process runs inside a container, judged by a marker file
pub fn running_in_container(marker: &Path) -> bool {
    marker.exists()
}
