//! Test case declarations
//!
//! A [`TestCase`] is one spreadsheet row: one HTTP call plus the business
//! outcome it is expected to produce.

use serde::Serialize;
use serde_json::Value;

use crate::common::config::RowSource;
use crate::common::{Error, Result};
use crate::resolve::value::scalar_text;

/// Last addressable row of an xlsx worksheet
pub const MAX_SHEET_ROW: u32 = 1_048_576;

/// One declared request and its expected outcome
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    /// Case identifier, e.g. `event_query_001`
    pub id: String,
    /// Free-text description, diagnostic only
    pub use_case: String,
    pub method: String,
    pub url: String,
    /// Raw cell values; decoded by the value resolver at dispatch time
    pub params_raw: Value,
    pub headers_raw: Value,
    pub body_raw: Value,
    /// `json` for a JSON body, anything else for a form body
    pub content_type: String,
    pub expected_status_code: Value,
    pub expected_message: Value,
    /// Physical 1-based sheet row the case was read from
    pub sheet_row: u32,
}

impl TestCase {
    /// Whether the row has no identifier and must be skipped
    pub fn is_blank_id(&self) -> bool {
        self.id.trim().is_empty()
    }

    /// 1-based data-row number embedded in the identifier
    ///
    /// Returns `Ok(None)` for a blank identifier.
    pub fn row_index(&self) -> Result<Option<u32>> {
        if self.is_blank_id() {
            return Ok(None);
        }
        row_from_id(&self.id).map(Some)
    }

    /// Sheet row that receives this case's verdict
    pub fn writeback_row(&self, source: RowSource) -> Result<Option<u32>> {
        match source {
            RowSource::Id => match self.row_index()? {
                Some(row) => row
                    .checked_add(1)
                    .filter(|row| *row <= MAX_SHEET_ROW)
                    .map(Some)
                    .ok_or_else(|| Error::InvalidCaseId(self.id.trim().to_string())),
                None => Ok(None),
            },
            RowSource::Position if self.is_blank_id() => Ok(None),
            RowSource::Position => Ok(Some(self.sheet_row)),
        }
    }

    /// Expected business status as an integer
    ///
    /// Accepts `10021`, `"10021"` and `"10021.0"` since spreadsheet cells
    /// drift between text and number.
    pub fn expected_status(&self) -> Result<i64> {
        let invalid = || Error::InvalidExpectedStatus {
            case: self.id.clone(),
            value: scalar_text(&self.expected_status_code).unwrap_or_default(),
        };

        let text = scalar_text(&self.expected_status_code).ok_or_else(invalid)?;
        if let Ok(code) = text.parse::<i64>() {
            return Ok(code);
        }
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
            _ => Err(invalid()),
        }
    }

    /// Expected business message, rendered as text
    pub fn expected_message_text(&self) -> Option<String> {
        scalar_text(&self.expected_message)
    }

    /// Whether the request body should be JSON-encoded
    pub fn is_json(&self) -> bool {
        self.content_type.trim().eq_ignore_ascii_case("json")
    }
}

/// Extract the row number from a legacy identifier like `event_query_001`
///
/// The third underscore-delimited segment is the row number. Zero is rejected
/// since it would address the header row, and so is anything whose sheet row
/// lies past the end of a worksheet.
pub fn row_from_id(id: &str) -> Result<u32> {
    let id = id.trim();
    let segment = id
        .split('_')
        .nth(2)
        .ok_or_else(|| Error::InvalidCaseId(id.to_string()))?;

    match segment.trim().parse::<u32>() {
        Ok(row) if row > 0 && row < MAX_SHEET_ROW => Ok(row),
        _ => Err(Error::InvalidCaseId(id.to_string())),
    }
}
