//! Turning declared cell content into what actually goes on the wire

pub mod endpoint;
pub mod literal;
pub mod value;

pub use endpoint::EndpointResolver;
pub use value::{resolve_traced, Strategy};
