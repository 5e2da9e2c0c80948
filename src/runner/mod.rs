//! Case and suite execution

pub mod case;
pub mod report;
pub mod reset;
pub mod suite;

pub use case::{CaseResult, CaseRunner, CaseState, CaseStatus};
pub use reset::reset_fixtures;
pub use suite::{run_suite, RunOptions, RunSummary};
