//! Case loading from the spreadsheet artifact
//!
//! Row 1 names the fields; every following non-empty row is one case.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use umya_spreadsheet::{Cell, Worksheet};

use crate::case::TestCase;
use crate::common::{Error, Result};

/// Loads ordered test cases from one sheet of a workbook
#[derive(Debug, Clone)]
pub struct CaseSource {
    path: PathBuf,
    sheet: String,
}

impl CaseSource {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every case row, in sheet order
    pub fn load(&self) -> Result<Vec<TestCase>> {
        if !self.path.exists() {
            return Err(Error::artifact_read(&self.path, "file does not exist"));
        }

        let book = umya_spreadsheet::reader::xlsx::read(&self.path)
            .map_err(|e| Error::artifact_read(&self.path, e))?;
        let sheet = book
            .get_sheet_by_name(&self.sheet)
            .ok_or_else(|| Error::SheetNotFound {
                path: self.path.display().to_string(),
                sheet: self.sheet.clone(),
            })?;

        let columns = header_columns(sheet);
        if !columns.contains_key("id") {
            return Err(Error::artifact_read(&self.path, "header row has no 'ID' column"));
        }

        let mut cases = Vec::new();
        for row in 2..=sheet.get_highest_row() {
            let field = |name: &str| -> Value {
                columns
                    .get(name)
                    .and_then(|col| sheet.get_cell((*col, row)))
                    .map(cell_value)
                    .unwrap_or(Value::Null)
            };

            let values: Vec<Value> = columns
                .values()
                .map(|col| sheet.get_cell((*col, row)).map(cell_value).unwrap_or(Value::Null))
                .collect();
            if values.iter().all(crate::resolve::value::is_blank) {
                continue;
            }

            let use_case = match field("usecase") {
                Value::Null => String::new(),
                v => text(&v),
            };

            cases.push(TestCase {
                id: text(&field("id")),
                use_case,
                method: text(&field("method")),
                url: text(&field("url")),
                params_raw: field("params"),
                headers_raw: field("headers"),
                body_raw: field("body"),
                content_type: text(&field("type")),
                expected_status_code: field("status_code"),
                expected_message: field("msg"),
                sheet_row: row,
            });
        }

        if cases.is_empty() {
            return Err(Error::EmptyArtifact(self.path.display().to_string()));
        }

        tracing::debug!(
            path = %self.path.display(),
            sheet = %self.sheet,
            count = cases.len(),
            "Loaded cases"
        );
        Ok(cases)
    }
}

/// Map lowercase header names to their 1-based column
pub(crate) fn header_columns(sheet: &Worksheet) -> HashMap<String, u32> {
    let mut columns = HashMap::new();
    for col in 1..=sheet.get_highest_column() {
        let name = sheet.get_value((col, 1)).trim().to_ascii_lowercase();
        if !name.is_empty() {
            // First occurrence wins
            columns.entry(name).or_insert(col);
        }
    }
    columns
}

/// Convert a cell into a raw JSON value, keeping numbers and booleans typed
fn cell_value(cell: &Cell) -> Value {
    let raw = cell.get_value().to_string();
    if raw.is_empty() {
        return Value::Null;
    }
    match cell.get_data_type() {
        "n" => match raw.trim().parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f.abs() < 1e15 => Value::from(f as i64),
            Ok(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::String(raw)),
            Err(_) => Value::String(raw),
        },
        "b" => Value::Bool(raw.eq_ignore_ascii_case("true") || raw.trim() == "1"),
        _ => Value::String(raw),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
