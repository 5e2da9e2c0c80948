//! Request dispatch
//!
//! Turns a case and its resolved values into exactly one HTTP call. Transport
//! failures never escape as errors: they become
//! [`DispatchOutcome::NoResponse`] so one unreachable endpoint cannot abort
//! the remaining cases.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{Map, Value};

use super::transport::{PreparedRequest, RawResponse, RequestBody, Transport};
use crate::case::TestCase;
use crate::common::{Error, Result};
use crate::resolve::value::{into_mapping, resolve_traced};
use crate::resolve::{EndpointResolver, Strategy};

/// Case values after resolution, as they will be sent
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCase {
    /// URL after endpoint rewriting
    pub url: String,
    pub params: Option<Map<String, Value>>,
    pub headers: Option<Map<String, Value>>,
    pub body: Value,
    /// Which decoding strategy produced params/headers/body
    #[serde(skip)]
    pub strategies: [Option<Strategy>; 3],
    /// Non-fatal problems found while resolving
    pub warnings: Vec<String>,
}

impl ResolvedCase {
    /// Resolve a case's raw cells and its URL
    ///
    /// Never fails: non-mapping params/headers are dropped with a warning.
    pub fn resolve(case: &TestCase, endpoint: &EndpointResolver) -> Self {
        let mut warnings = Vec::new();

        let (params, params_strategy) = resolve_traced(&case.params_raw);
        let (params, discarded) = into_mapping(params);
        if let Some(value) = discarded {
            tracing::warn!(case = %case.id, params = %value, "params is not a mapping after resolution; dropping it");
            warnings.push(format!("params is not a mapping after parse: {value}. Forcing to null."));
        }

        let (headers, headers_strategy) = resolve_traced(&case.headers_raw);
        let (headers, discarded) = into_mapping(headers);
        if let Some(value) = discarded {
            tracing::warn!(case = %case.id, headers = %value, "headers is not a mapping after resolution; dropping it");
            warnings.push(format!("headers is not a mapping after parse: {value}. Forcing to null."));
        }

        let (body, body_strategy) = resolve_traced(&case.body_raw);

        Self {
            url: endpoint.resolve(&case.url),
            params,
            headers,
            body,
            strategies: [params_strategy, headers_strategy, body_strategy],
            warnings,
        }
    }
}

/// Result of one dispatch attempt
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Response(RawResponse),
    /// The call produced no response (connect error, timeout, TLS failure)
    NoResponse { reason: String },
}

/// Executes one HTTP call per case
pub struct RequestDispatcher {
    transport: Box<dyn Transport>,
}

impl RequestDispatcher {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send the case's request
    ///
    /// Declaration problems (blank method/URL, invalid method, URL or header)
    /// are returned as errors; transport problems are `NoResponse`.
    pub async fn dispatch(&self, case: &TestCase, resolved: &ResolvedCase) -> Result<DispatchOutcome> {
        let request = build_request(case, resolved)?;
        let url = request.url.to_string();

        match self.transport.send(request).await {
            Ok(response) => Ok(DispatchOutcome::Response(response)),
            Err(e) => {
                tracing::error!(case = %case.id, url = %url, error = %e, "Request failed");
                Ok(DispatchOutcome::NoResponse {
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Validate a case and assemble its request
pub fn build_request(case: &TestCase, resolved: &ResolvedCase) -> Result<PreparedRequest> {
    let method = case.method.trim();
    if method.is_empty() {
        return Err(Error::missing_field(&case.id, "method"));
    }
    if case.url.trim().is_empty() {
        return Err(Error::missing_field(&case.id, "url"));
    }

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        Error::InvalidMethod {
            case: case.id.clone(),
            method: method.to_string(),
        }
    })?;
    let url = Url::parse(&resolved.url).map_err(|e| Error::invalid_url(&case.id, &resolved.url, e))?;

    let mut headers = HeaderMap::new();
    for (name, value) in resolved.headers.iter().flatten() {
        let Some(value) = param_texts(value).into_iter().next() else {
            continue;
        };
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| Error::invalid_header(&case.id, name, e))?;
        let header_value =
            HeaderValue::from_str(&value).map_err(|e| Error::invalid_header(&case.id, name, e))?;
        headers.insert(header_name, header_value);
    }

    let query = resolved
        .params
        .as_ref()
        .map(pairs)
        .unwrap_or_default();

    let body = match &resolved.body {
        Value::Null => RequestBody::None,
        value if case.is_json() => RequestBody::Json(value.clone()),
        Value::Object(map) => RequestBody::Form(pairs(map)),
        Value::String(text) => RequestBody::Raw(text.clone()),
        other => {
            tracing::warn!(case = %case.id, body = %other, "Form body is not a mapping; sending its JSON text");
            RequestBody::Raw(other.to_string())
        }
    };

    Ok(PreparedRequest {
        method,
        url,
        headers,
        query,
        body,
    })
}

/// Flatten a mapping into key/value pairs; sequences repeat the key, nulls are dropped
fn pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .flat_map(|(key, value)| {
            param_texts(value)
                .into_iter()
                .map(move |text| (key.clone(), text))
        })
        .collect()
}

fn param_texts(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(param_texts).collect(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn case(method: &str, url: &str) -> TestCase {
        TestCase {
            id: "event_query_001".into(),
            use_case: String::new(),
            method: method.into(),
            url: url.into(),
            params_raw: Value::Null,
            headers_raw: Value::Null,
            body_raw: Value::Null,
            content_type: String::new(),
            expected_status_code: json!(200),
            expected_message: json!("success"),
            sheet_row: 2,
        }
    }

    fn host() -> EndpointResolver {
        EndpointResolver::new(None, false, "demo")
    }

    #[test]
    fn test_resolve_drops_non_mapping_params() {
        let mut c = case("GET", "http://127.0.0.1:8000/api/get_event_list/");
        c.params_raw = json!("[1, 2]");
        c.headers_raw = json!("{'X-Trace': 'abc'}");

        let resolved = ResolvedCase::resolve(&c, &host());
        assert!(resolved.params.is_none());
        assert_eq!(resolved.headers, Some(json!({"X-Trace": "abc"}).as_object().unwrap().clone()));
        assert_eq!(resolved.warnings.len(), 1);
        assert!(resolved.warnings[0].starts_with("params is not a mapping"));
    }

    #[test]
    fn test_blank_method_or_url_is_declaration_error() {
        let c = case("  ", "http://127.0.0.1:8000/");
        let resolved = ResolvedCase::resolve(&c, &host());
        assert!(matches!(
            build_request(&c, &resolved),
            Err(Error::MissingField { field: "method", .. })
        ));

        let c = case("GET", "");
        let resolved = ResolvedCase::resolve(&c, &host());
        assert!(matches!(
            build_request(&c, &resolved),
            Err(Error::MissingField { field: "url", .. })
        ));

        let c = case("GET", "not a url");
        let resolved = ResolvedCase::resolve(&c, &host());
        assert!(matches!(build_request(&c, &resolved), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn test_json_and_form_bodies() {
        let mut c = case("post", "http://127.0.0.1:8000/api/add_event/");
        c.body_raw = json!(r#"{"eid": 3, "name": "x"}"#);

        c.content_type = "json".into();
        let request = build_request(&c, &ResolvedCase::resolve(&c, &host())).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, RequestBody::Json(json!({"eid": 3, "name": "x"})));

        c.content_type = "data".into();
        let request = build_request(&c, &ResolvedCase::resolve(&c, &host())).unwrap();
        assert_eq!(
            request.body,
            RequestBody::Form(vec![
                ("eid".to_string(), "3".to_string()),
                ("name".to_string(), "x".to_string())
            ])
        );

        c.body_raw = json!("raw text");
        let request = build_request(&c, &ResolvedCase::resolve(&c, &host())).unwrap();
        assert_eq!(request.body, RequestBody::Raw("raw text".into()));

        c.body_raw = Value::Null;
        let request = build_request(&c, &ResolvedCase::resolve(&c, &host())).unwrap();
        assert_eq!(request.body, RequestBody::None);
    }

    #[test]
    fn test_query_pairs() {
        let mut c = case("GET", "http://127.0.0.1:8000/api/get_guest_list/");
        c.params_raw = json!(r#"{"eid": 1, "phone": "", "tag": ["a", "b"], "skip": null}"#);
        let request = build_request(&c, &ResolvedCase::resolve(&c, &host())).unwrap();
        assert_eq!(
            request.query,
            vec![
                ("eid".to_string(), "1".to_string()),
                ("phone".to_string(), String::new()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_header_is_declaration_error() {
        let mut c = case("GET", "http://127.0.0.1:8000/");
        c.headers_raw = json!(r#"{"bad header": "x"}"#);
        let err = build_request(&c, &ResolvedCase::resolve(&c, &host())).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));
    }

    struct Failing;

    #[async_trait]
    impl Transport for Failing {
        async fn send(&self, request: PreparedRequest) -> Result<RawResponse> {
            Err(Error::Transport {
                url: request.url.to_string(),
                reason: "operation timed out".into(),
            })
        }
    }

    struct Recording(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Transport for Recording {
        async fn send(&self, request: PreparedRequest) -> Result<RawResponse> {
            self.0.lock().unwrap().push(request.url.to_string());
            Ok(RawResponse {
                status: 200,
                body: r#"{"status":200,"message":"success"}"#.into(),
            })
        }
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_no_response() {
        let dispatcher = RequestDispatcher::new(Box::new(Failing));
        let c = case("GET", "http://127.0.0.1:8000/api/get_event_list/");
        let outcome = dispatcher
            .dispatch(&c, &ResolvedCase::resolve(&c, &host()))
            .await
            .unwrap();
        match outcome {
            DispatchOutcome::NoResponse { reason } => assert!(reason.contains("timed out")),
            DispatchOutcome::Response(_) => panic!("Expected NoResponse"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_uses_resolved_url_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = RequestDispatcher::new(Box::new(Recording(seen.clone())));
        let c = case("GET", "http://localhost:8000/api/get_event_list/");
        let resolver = EndpointResolver::new(Some("http://10.1.2.3:9000"), false, "demo");

        let outcome = dispatcher
            .dispatch(&c, &ResolvedCase::resolve(&c, &resolver))
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Response(_)));
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["http://10.1.2.3:9000/api/get_event_list/".to_string()]
        );
    }
}
