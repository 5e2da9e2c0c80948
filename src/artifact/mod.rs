//! Spreadsheet artifact access: case loading and verdict writeback

pub mod reader;
pub mod writer;

pub use reader::CaseSource;
pub use writer::{read_marker, Verdict, VerdictWriter};

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::Path;

    /// Header row of the workbooks built in tests
    pub const HEADERS: [&str; 12] = [
        "ID", "UseCase", "method", "url", "params", "headers", "body", "type", "status_code",
        "msg", "result", "tester",
    ];

    /// Write a workbook with the standard header row and the given case rows
    pub fn write_workbook(path: &Path, rows: &[&[&str]]) {
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
}
