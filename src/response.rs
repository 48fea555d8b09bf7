//! JSON responses with CORS headers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::HandlerError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";

/// What the handler hands back to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

fn default_headers() -> BTreeMap<String, String> {
    [
        (CONTENT_TYPE, "application/json"),
        (ALLOW_ORIGIN, "*"),
        (ALLOW_HEADERS, "Content-Type"),
        (ALLOW_METHODS, "POST, OPTIONS"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Builds a response; `extra_headers` override the defaults.
pub fn create_response(
    status_code: u16,
    body: &Value,
    extra_headers: &[(&str, &str)],
) -> ApiResponse {
    let mut headers = default_headers();
    for (name, value) in extra_headers {
        headers.insert(name.to_string(), value.to_string());
    }
    ApiResponse {
        status_code,
        headers,
        body: body.to_string(),
    }
}

/// Body of a successful send.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody<'a> {
    pub success: bool,
    pub message: &'static str,
    pub message_id: &'a str,
    pub recipient: &'a str,
}

impl<'a> SuccessBody<'a> {
    pub fn new(message_id: &'a str, recipient: &'a str) -> Self {
        Self {
            success: true,
            message: "Email sent successfully",
            message_id,
            recipient,
        }
    }
}

/// Body of every failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a [String]>,
}

impl<'a> From<&'a HandlerError> for ErrorBody<'a> {
    fn from(e: &'a HandlerError) -> Self {
        Self {
            error: e.error_code(),
            message: e.public_message(),
            details: e.details(),
        }
    }
}

impl ApiResponse {
    /// Empty 200 answering a CORS preflight.
    pub fn preflight() -> Self {
        create_response(200, &json!({}), &[])
    }

    /// Last-resort 500; built from a literal so it cannot fail.
    pub fn internal_error() -> Self {
        create_response(
            500,
            &json!({
                "error": "Internal server error",
                "message": "An unexpected error occurred",
            }),
            &[],
        )
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let response = create_response(200, &json!({"ok": true}), &[]);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers[ALLOW_ORIGIN], "*");
        assert_eq!(response.headers[ALLOW_HEADERS], "Content-Type");
        assert_eq!(response.headers[ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(response.body, r#"{"ok":true}"#);
    }

    #[test]
    fn test_extra_headers_override() {
        let response = create_response(
            200,
            &json!({}),
            &[(ALLOW_ORIGIN, "https://example.com"), ("Cache-Control", "no-store")],
        );
        assert_eq!(response.headers[ALLOW_ORIGIN], "https://example.com");
        assert_eq!(response.headers["Cache-Control"], "no-store");
        assert_eq!(response.headers.len(), 5);
    }

    #[test]
    fn test_builder_is_pure() {
        let body = json!({"error": "x", "message": "y"});
        assert_eq!(create_response(400, &body, &[]), create_response(400, &body, &[]));
    }

    #[test]
    fn test_success_body_key_order() {
        let body = serde_json::to_value(SuccessBody::new("abc123", "a@b.com")).unwrap();
        assert_eq!(
            body.to_string(),
            r#"{"success":true,"message":"Email sent successfully","messageId":"abc123","recipient":"a@b.com"}"#
        );
    }

    #[test]
    fn test_error_body_details() {
        let err = HandlerError::Validation(vec!["subject is required".into()]);
        let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(
            body.to_string(),
            r#"{"error":"Validation failed","message":"Invalid request parameters","details":["subject is required"]}"#
        );

        let err = HandlerError::Unexpected("boom".into());
        let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_api_response_serialization() {
        let value = serde_json::to_value(ApiResponse::preflight()).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["body"], "{}");
        assert_eq!(ApiResponse::internal_error().json().unwrap()["error"], "Internal server error");
    }
}
