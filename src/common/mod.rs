//! Common utilities shared by the runner and the demo service

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Parse a "listening at:" address from a service's startup output.
/// Handles the wildcard format [::]:PORT / 0.0.0.0:PORT by converting to 127.0.0.1:PORT
pub fn parse_listen_address(line: &str) -> Option<String> {
    let addr_start = line.find("listening at:")?;
    let addr = line[addr_start + "listening at:".len()..].trim();
    let addr = addr
        .strip_prefix("http://")
        .unwrap_or(addr)
        .trim_end_matches('/');
    // Handle wildcard binds
    let addr = if let Some(port) = addr.strip_prefix("[::]:") {
        format!("127.0.0.1:{port}")
    } else if let Some(port) = addr.strip_prefix("0.0.0.0:") {
        format!("127.0.0.1:{port}")
    } else {
        addr.to_string()
    };
    Some(addr)
}
