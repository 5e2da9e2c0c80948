//! HTTP dispatch and response normalization

pub mod dispatcher;
pub mod outcome;
pub mod transport;

pub use dispatcher::{DispatchOutcome, RequestDispatcher, ResolvedCase};
pub use outcome::{normalize, ActualOutcome, Comparison, Expectation};
pub use transport::{HttpTransport, PreparedRequest, RawResponse, RequestBody, Transport};
