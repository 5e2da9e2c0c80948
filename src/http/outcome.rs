//! Response normalization
//!
//! Extracts the business outcome (`status`, `message`) from a response body
//! and reconciles transport-level validation rejections with the business
//! error an author expects for the same condition.

use serde::Serialize;
use serde_json::Value;

use super::transport::RawResponse;
use crate::common::{Error, Result};
use crate::resolve::value::scalar_text;

/// Business code meaning "a required parameter is missing or invalid"
pub const PARAMETER_ERROR_CODE: i64 = 10021;
/// Business message paired with [`PARAMETER_ERROR_CODE`]
pub const PARAMETER_ERROR_MESSAGE: &str = "parameter error";
/// HTTP status of a schema-validation rejection
pub const VALIDATION_REJECTED: u16 = 422;

/// What a case expects the service to answer
#[derive(Debug, Clone, Serialize)]
pub struct Expectation {
    pub status: i64,
    pub message: Option<String>,
}

impl Expectation {
    /// Whether this expectation is exactly the parameter-error outcome
    pub fn is_parameter_error(&self) -> bool {
        self.status == PARAMETER_ERROR_CODE
            && self
                .message
                .as_deref()
                .is_some_and(|m| m.trim().eq_ignore_ascii_case(PARAMETER_ERROR_MESSAGE))
    }
}

/// Business outcome extracted from one response
#[derive(Debug, Clone, Serialize)]
pub struct ActualOutcome {
    pub http_status: u16,
    pub business_status: Option<Value>,
    pub business_message: Option<Value>,
    /// Set when a validation rejection was translated into a business outcome
    pub remapped: bool,
}

/// Field-by-field comparison of expected and actual outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub status_matches: bool,
    pub message_matches: bool,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.status_matches && self.message_matches
    }
}

impl ActualOutcome {
    pub fn status_text(&self) -> Option<String> {
        self.business_status.as_ref().and_then(scalar_text)
    }

    pub fn message_text(&self) -> Option<String> {
        self.business_message.as_ref().and_then(scalar_text)
    }

    /// Compare against an expectation
    ///
    /// Both sides are rendered to trimmed strings first, so `10021`,
    /// `"10021"` and `10021.0` are equal. This leniency is intentional:
    /// spreadsheet cells and JSON bodies disagree on types all the time.
    pub fn compare(&self, expected: &Expectation) -> Comparison {
        Comparison {
            status_matches: self.status_text() == Some(expected.status.to_string()),
            message_matches: self.message_text() == expected.message.as_deref().map(|m| m.trim().to_string()),
        }
    }
}

/// Parse a response into its business outcome
///
/// A body that is not JSON is an error carrying the raw body.
pub fn normalize(response: &RawResponse, expected: &Expectation) -> Result<ActualOutcome> {
    let body: Value = serde_json::from_str(&response.body).map_err(|_| Error::ResponseNotJson {
        http_status: response.status,
        body: response.body.clone(),
    })?;

    let (mut business_status, mut business_message) = match &body {
        Value::Object(map) => (
            map.get("status").cloned(),
            map.get("message").or_else(|| map.get("msg")).cloned(),
        ),
        _ => (None, None),
    };

    let is_validation_rejection = response.status == VALIDATION_REJECTED
        && body
            .as_object()
            .is_some_and(|map| map.contains_key("detail") && !map.contains_key("status"));

    let remapped = is_validation_rejection && expected.is_parameter_error();
    if remapped {
        tracing::debug!(
            http_status = response.status,
            "Mapping validation rejection to parameter error"
        );
        business_status = Some(Value::from(PARAMETER_ERROR_CODE));
        if business_message.is_none() {
            business_message = Some(Value::from(PARAMETER_ERROR_MESSAGE));
        }
    }

    Ok(ActualOutcome {
        http_status: response.status,
        business_status,
        business_message,
        remapped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    fn expect(status: i64, message: &str) -> Expectation {
        Expectation {
            status,
            message: Some(message.to_string()),
        }
    }

    const VALIDATION_BODY: &str =
        r#"{"detail":[{"loc":["body","eid"],"msg":"field required","type":"value_error.missing"}]}"#;

    #[test]
    fn test_success_round_trip() {
        let actual = normalize(
            &response(200, r#"{"status":200,"message":"success","data":[{"eid":1}]}"#),
            &expect(200, "success"),
        )
        .unwrap();
        assert_eq!(actual.status_text().as_deref(), Some("200"));
        assert!(actual.compare(&expect(200, "success")).passed());
        assert!(!actual.remapped);
    }

    #[test]
    fn test_message_falls_back_to_msg() {
        let actual = normalize(
            &response(200, r#"{"status":"10022","msg":"query result is empty"}"#),
            &expect(10022, "query result is empty"),
        )
        .unwrap();
        assert!(actual.compare(&expect(10022, "query result is empty")).passed());
    }

    #[test]
    fn test_validation_rejection_is_remapped() {
        let expected = expect(10021, "parameter error");
        let actual = normalize(&response(422, VALIDATION_BODY), &expected).unwrap();
        assert!(actual.remapped);
        assert_eq!(actual.status_text().as_deref(), Some("10021"));
        assert_eq!(actual.message_text().as_deref(), Some("parameter error"));
        assert!(actual.compare(&expected).passed());
    }

    #[test]
    fn test_remap_only_for_parameter_error_expectation() {
        let expected = expect(10022, "event id already exists");
        let actual = normalize(&response(422, VALIDATION_BODY), &expected).unwrap();
        assert!(!actual.remapped);
        assert_eq!(actual.business_status, None);
        assert!(!actual.compare(&expected).passed());
    }

    #[test]
    fn test_remap_requires_422_and_missing_status() {
        let expected = expect(10021, "parameter error");

        let actual = normalize(&response(400, VALIDATION_BODY), &expected).unwrap();
        assert!(!actual.remapped);

        let actual = normalize(
            &response(422, r#"{"detail":[],"status":500,"message":"boom"}"#),
            &expected,
        )
        .unwrap();
        assert!(!actual.remapped);
        assert_eq!(actual.status_text().as_deref(), Some("500"));
    }

    #[test]
    fn test_non_remap_business_mismatch() {
        let expected = expect(10023, "event name already exists");
        let actual = normalize(
            &response(200, r#"{"status":10022,"message":"query result is empty"}"#),
            &expected,
        )
        .unwrap();
        let comparison = actual.compare(&expected);
        assert!(!comparison.status_matches);
        assert!(!comparison.message_matches);
        assert_eq!(actual.status_text().as_deref(), Some("10022"));
    }

    #[test]
    fn test_non_json_body_is_error() {
        let err = normalize(
            &response(502, "<html>Bad Gateway</html>"),
            &expect(200, "success"),
        )
        .unwrap_err();
        match err {
            Error::ResponseNotJson { http_status, body } => {
                assert_eq!(http_status, 502);
                assert!(body.contains("Bad Gateway"));
            }
            other => panic!("Expected ResponseNotJson, got {other:?}"),
        }
    }

    #[test]
    fn test_parameter_error_expectation_is_lenient_on_case() {
        assert!(expect(10021, " Parameter Error ").is_parameter_error());
        assert!(!expect(10021, "eid cannot be empty").is_parameter_error());
        assert!(!Expectation {
            status: 10021,
            message: None
        }
        .is_parameter_error());
    }
}
