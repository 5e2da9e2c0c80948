//! Fixture reset before a run
//!
//! Restores the target service's in-memory fixtures so create-type cases are
//! repeatable. An unreachable reset endpoint only costs idempotence, so every
//! failure here is a warning.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};

use crate::common::config::Config;
use crate::http::{PreparedRequest, RequestBody, Transport};
use crate::resolve::EndpointResolver;

/// POST the reset endpoint; returns whether the reset succeeded
pub async fn reset_fixtures(
    transport: &dyn Transport,
    endpoint: &EndpointResolver,
    config: &Config,
) -> bool {
    let url = endpoint.resolve(&config.reset_url());
    match try_reset(transport, &url, config).await {
        Ok(()) => {
            tracing::info!(url = %url, "Test data reset via API OK");
            true
        }
        Err(reason) => {
            tracing::warn!(url = %url, "Test data reset skipped/failed: {reason}");
            tracing::warn!("Continuing without reset. Create-type cases may become non-idempotent.");
            false
        }
    }
}

async fn try_reset(transport: &dyn Transport, url: &str, config: &Config) -> Result<(), String> {
    let url = Url::parse(url).map_err(|e| format!("invalid reset URL: {e}"))?;

    let mut headers = HeaderMap::new();
    for (name, value) in &config.target.reset_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid reset header {name:?}: {e}"))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| format!("invalid reset header value: {e}"))?;
        headers.insert(name, value);
    }

    let response = transport
        .send(PreparedRequest {
            method: Method::POST,
            url,
            headers,
            query: Vec::new(),
            body: RequestBody::None,
        })
        .await
        .map_err(|e| e.to_string())?;

    if (200..300).contains(&response.status) {
        Ok(())
    } else {
        Err(format!("HTTP {}: {}", response.status, response.body))
    }
}
