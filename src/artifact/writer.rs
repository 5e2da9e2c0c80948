//! Verdict writeback
//!
//! The verdict workbook starts as a copy of the template and is then mutated
//! in place: every write opens it, sets one row's result (and tester) cell,
//! and saves it again. Re-running a case overwrites the same cell.

use std::path::{Path, PathBuf};

use umya_spreadsheet::{Spreadsheet, Worksheet};

use super::reader::header_columns;
use crate::common::config::ArtifactConfig;
use crate::common::{Error, Result};

/// Font color for markers other than PASS/FAIL (amber)
const DIAGNOSTIC_ARGB: &str = "FFC65911";

/// Outcome of one executed case
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes verdict markers into the verdict workbook
#[derive(Debug)]
pub struct VerdictWriter {
    template: PathBuf,
    target: PathBuf,
    sheet: String,
    result_header: String,
    result_column: Option<u32>,
    tester_header: String,
    tester: Option<String>,
    initialized: bool,
}

impl VerdictWriter {
    pub fn new(template: impl Into<PathBuf>, target: impl Into<PathBuf>, sheet: &str) -> Self {
        let defaults = ArtifactConfig::default();
        Self {
            template: template.into(),
            target: target.into(),
            sheet: sheet.to_string(),
            result_header: defaults.result_header,
            result_column: None,
            tester_header: defaults.tester_header,
            tester: None,
            initialized: false,
        }
    }

    /// Build a writer from artifact configuration
    pub fn from_config(config: &ArtifactConfig, target: &Path, tester: Option<String>) -> Self {
        Self {
            template: config.source.clone(),
            target: target.to_path_buf(),
            sheet: config.sheet.clone(),
            result_header: config.result_header.clone(),
            result_column: config.result_column,
            tester_header: config.tester_header.clone(),
            tester,
            initialized: false,
        }
    }

    /// Copy the template to the target if the target does not exist yet
    ///
    /// Runs at most once per writer; an existing target is reused as-is.
    pub fn ensure_initialized(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        if let Some(dir) = self.target.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| Error::artifact_write(&self.target, e))?;
            }
        }

        if !self.target.exists() {
            if !self.template.exists() {
                return Err(Error::TemplateMissing(self.template.display().to_string()));
            }
            std::fs::copy(&self.template, &self.target)
                .map_err(|e| Error::artifact_write(&self.target, e))?;
            tracing::info!(
                template = %self.template.display(),
                target = %self.target.display(),
                "Initialized verdict artifact from template"
            );
        }

        self.initialized = true;
        Ok(())
    }

    /// Write a verdict into a sheet row
    pub fn write(&mut self, row: u32, verdict: Verdict) -> Result<()> {
        self.write_marker(row, verdict.as_str())
    }

    /// Write an arbitrary marker into a sheet row
    ///
    /// Markers other than PASS/FAIL are kept for diagnostics but rendered in
    /// a bold amber font. PASS/FAIL leave the template's cell style alone.
    pub fn write_marker(&mut self, row: u32, marker: &str) -> Result<()> {
        if row < 2 {
            return Err(Error::Internal(format!(
                "Refusing to write verdict into header row {row}"
            )));
        }
        self.ensure_initialized()?;

        let mut book = umya_spreadsheet::reader::xlsx::read(&self.target)
            .map_err(|e| Error::artifact_read(&self.target, e))?;
        let sheet = self.sheet_mut(&mut book)?;

        let result_col = self.result_column(sheet);
        let is_standard = marker == "PASS" || marker == "FAIL";
        {
            let cell = sheet.get_cell_mut((result_col, row));
            cell.set_value_string(marker);
            if !is_standard {
                let font = cell.get_style_mut().get_font_mut();
                font.set_bold(true);
                font.get_color_mut().set_argb(DIAGNOSTIC_ARGB);
                tracing::warn!(row, marker, "Writing non-standard verdict marker");
            }
        }

        if let Some(tester) = &self.tester {
            if let Some(tester_col) = header_columns(sheet)
                .get(&self.tester_header.trim().to_ascii_lowercase())
                .copied()
            {
                sheet.get_cell_mut((tester_col, row)).set_value_string(tester.as_str());
            }
        }

        umya_spreadsheet::writer::xlsx::write(&book, &self.target)
            .map_err(|e| Error::artifact_write(&self.target, e))?;

        tracing::debug!(row, marker, target = %self.target.display(), "Verdict written");
        Ok(())
    }

    fn sheet_mut<'a>(&self, book: &'a mut Spreadsheet) -> Result<&'a mut Worksheet> {
        book.get_sheet_by_name_mut(&self.sheet)
            .ok_or_else(|| Error::SheetNotFound {
                path: self.target.display().to_string(),
                sheet: self.sheet.clone(),
            })
    }

    /// Locate the result column, appending a header if the sheet has none
    fn result_column(&self, sheet: &mut Worksheet) -> u32 {
        let header = self.result_header.trim().to_ascii_lowercase();
        if let Some(col) = header_columns(sheet).get(&header) {
            return *col;
        }
        if let Some(col) = self.result_column {
            return col;
        }
        let col = sheet.get_highest_column() + 1;
        sheet.get_cell_mut((col, 1)).set_value_string(self.result_header.as_str());
        col
    }
}

/// Read back the marker in a row's result column
pub fn read_marker(path: &Path, sheet: &str, result_header: &str, row: u32) -> Result<Option<String>> {
    let book =
        umya_spreadsheet::reader::xlsx::read(path).map_err(|e| Error::artifact_read(path, e))?;
    let sheet = book
        .get_sheet_by_name(sheet)
        .ok_or_else(|| Error::SheetNotFound {
            path: path.display().to_string(),
            sheet: sheet.to_string(),
        })?;
    let Some(col) = header_columns(sheet)
        .get(&result_header.trim().to_ascii_lowercase())
        .copied()
    else {
        return Ok(None);
    };
    let value = sheet.get_value((col, row));
    Ok(if value.is_empty() { None } else { Some(value) })
}
