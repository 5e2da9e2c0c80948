//! HTTP transport
//!
//! The case pipeline talks to the network only through [`Transport`], so it
//! can be exercised against an in-process fake.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use serde_json::Value;
use std::time::Duration;

use crate::common::{Error, Result};

/// Body of a prepared request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    /// JSON-encoded payload
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs
    Form(Vec<(String, String)>),
    /// Sent verbatim
    Raw(String),
}

/// A fully validated request, ready to send
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

/// Status and body of a response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request and returns the raw response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Any failure to obtain a complete response is an `Error::Transport`
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse>;
}

/// reqwest-backed transport
///
/// Certificate validation is disabled: targets are local or ephemeral test
/// instances.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse> {
        let url = request.url.to_string();
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Raw(text) => builder.body(text),
        };

        let response = builder.send().await.map_err(|e| Error::Transport {
            url: url.clone(),
            reason: error_chain(&e),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| Error::Transport {
            url,
            reason: error_chain(&e),
        })?;

        Ok(RawResponse { status, body })
    }
}

/// Render an error and all of its sources, outermost first
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": caused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
