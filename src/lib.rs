//! apicase - spreadsheet-driven HTTP contract test runner
//!
//! Each row of a workbook declares one HTTP call and the business outcome
//! (`status`, `message`) it must produce. The runner replays the rows,
//! normalizes the responses and writes a PASS/FAIL marker next to each row.

pub mod artifact;
pub mod case;
pub mod cli;
pub mod commands;
pub mod common;
pub mod http;
pub mod resolve;
pub mod runner;

// Re-export commonly used types for tests
pub use common::{Error, Result};
