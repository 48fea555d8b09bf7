//! Incoming request: body parsing and field validation.

use serde_json::{Map, Value};

use crate::errors::HandlerError;
use crate::utils::is_valid_email;

pub const RECEIVER_EMAIL: &str = "receiver_email";
pub const SUBJECT: &str = "subject";
pub const BODY_TEXT: &str = "body_text";

/// HTTP method and raw body of an invocation, independent of the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: String,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method: method.into(),
            body,
        }
    }

    pub fn is_preflight(&self) -> bool {
        self.method == "OPTIONS"
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub receiver_email: String,
    pub subject: String,
    pub body_text: String,
}

/// Ordered validation errors; empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decodes the body as JSON. Absent or empty input is `{}`; JSON that is not
/// an object decodes to an empty mapping.
pub fn parse_body(raw: Option<&str>) -> Result<Map<String, Value>, HandlerError> {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => "{}",
    };
    match serde_json::from_str::<Value>(raw).map_err(HandlerError::InvalidJson)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

enum Field<'a> {
    Missing,
    NotAString,
    Text(&'a str),
}

/// Absent, `null`, `""`, `false` and `0` all count as missing.
fn field<'a>(body: &'a Map<String, Value>, name: &str) -> Field<'a> {
    match body.get(name) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Field::Missing,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Field::Missing,
        Some(Value::String(s)) if s.is_empty() => Field::Missing,
        Some(Value::String(s)) => Field::Text(s),
        Some(_) => Field::NotAString,
    }
}

fn check_text(body: &Map<String, Value>, name: &str, errors: &mut Vec<String>) {
    match field(body, name) {
        Field::Missing => errors.push(format!("{} is required", name)),
        Field::NotAString => errors.push(format!("{} must be a string", name)),
        Field::Text(s) if s.trim().is_empty() => errors.push(format!("{} cannot be empty", name)),
        Field::Text(_) => {}
    }
}

/// Checks every field, collecting at most one error per field.
pub fn validate(body: &Map<String, Value>) -> ValidationResult {
    let mut errors = Vec::new();

    match field(body, RECEIVER_EMAIL) {
        Field::Missing => errors.push(format!("{} is required", RECEIVER_EMAIL)),
        Field::Text(s) if is_valid_email(s) => {}
        Field::NotAString | Field::Text(_) => {
            errors.push(format!("{} must be a valid email address", RECEIVER_EMAIL))
        }
    }
    check_text(body, SUBJECT, &mut errors);
    check_text(body, BODY_TEXT, &mut errors);

    ValidationResult { errors }
}

fn text(body: &Map<String, Value>, name: &str) -> String {
    body.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl EmailRequest {
    /// Validates a parsed body and extracts the request.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, HandlerError> {
        let result = validate(body);
        if !result.is_valid() {
            return Err(HandlerError::Validation(result.errors));
        }
        Ok(Self {
            receiver_email: text(body, RECEIVER_EMAIL),
            subject: text(body, SUBJECT),
            body_text: text(body, BODY_TEXT),
        })
    }

    /// Parses and validates a raw body in one step.
    pub fn parse(raw: Option<&str>) -> Result<Self, HandlerError> {
        Self::from_body(&parse_body(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    #[test]
    fn test_parse_body() {
        assert!(parse_body(None).unwrap().is_empty());
        assert!(parse_body(Some("")).unwrap().is_empty());
        assert!(parse_body(Some("[1, 2]")).unwrap().is_empty());
        assert!(parse_body(Some("null")).unwrap().is_empty());
        assert_eq!(parse_body(Some(r#"{"subject":"x"}"#)).unwrap()["subject"], "x");
        assert!(matches!(parse_body(Some("{not json")), Err(HandlerError::InvalidJson(_))));
    }

    #[test]
    fn test_all_missing_in_fixed_order() {
        let result = validate(&Map::new());
        assert_eq!(
            result.errors,
            vec![
                "receiver_email is required",
                "subject is required",
                "body_text is required",
            ]
        );
    }

    #[test]
    fn test_one_error_per_field() {
        let result = validate(&body(json!({
            "receiver_email": "a b@c.com",
            "subject": "   ",
            "body_text": "\n\t",
        })));
        assert_eq!(
            result.errors,
            vec![
                "receiver_email must be a valid email address",
                "subject cannot be empty",
                "body_text cannot be empty",
            ]
        );
    }

    #[test]
    fn test_null_and_empty_count_as_missing() {
        let result = validate(&body(json!({
            "receiver_email": "",
            "subject": null,
            "body_text": "hello",
        })));
        assert_eq!(result.errors, vec!["receiver_email is required", "subject is required"]);
    }

    #[test]
    fn test_non_string_fields() {
        let result = validate(&body(json!({
            "receiver_email": 42,
            "subject": ["x"],
            "body_text": true,
        })));
        assert_eq!(
            result.errors,
            vec![
                "receiver_email must be a valid email address",
                "subject must be a string",
                "body_text must be a string",
            ]
        );
    }

    #[test]
    fn test_false_and_zero_count_as_missing() {
        let result = validate(&body(json!({
            "receiver_email": 0,
            "subject": false,
            "body_text": 0.0,
        })));
        assert_eq!(
            result.errors,
            vec![
                "receiver_email is required",
                "subject is required",
                "body_text is required",
            ]
        );
    }

    #[test]
    fn test_email_shapes() {
        for bad in ["a@b", "@b.com", "a b@c.com"] {
            let result = validate(&body(json!({
                "receiver_email": bad, "subject": "s", "body_text": "b",
            })));
            assert_eq!(result.errors, vec!["receiver_email must be a valid email address"]);
        }
        let result = validate(&body(json!({
            "receiver_email": "user@example.com", "subject": "s", "body_text": "b",
        })));
        assert!(result.is_valid());
    }

    #[test]
    fn test_parse_valid_request_keeps_raw_values() {
        let request = EmailRequest::parse(Some(
            r#"{"receiver_email":"a@b.com","subject":" Hi ","body_text":" Hello "}"#,
        ))
        .unwrap();
        assert_eq!(request.receiver_email, "a@b.com");
        assert_eq!(request.subject, " Hi ");
        assert_eq!(request.body_text, " Hello ");
    }

    #[test]
    fn test_parse_reports_validation_details() {
        match EmailRequest::parse(Some(r#"{"subject":"s"}"#)) {
            Err(HandlerError::Validation(details)) => {
                assert_eq!(details, vec!["receiver_email is required", "body_text is required"])
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_preflight_detection() {
        assert!(ApiRequest::new("OPTIONS", None).is_preflight());
        assert!(!ApiRequest::new("POST", Some("{}".into())).is_preflight());
    }
}
