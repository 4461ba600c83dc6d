//! Errors returned by the auth API client.

use std::collections::BTreeMap;

use serde_json::Value;

/// Failure of one backend call.
///
/// `Rejected` is the backend saying no (bad credentials, duplicate email,
/// expired token). `Network` and `Unexpected` mean the answer never arrived
/// or could not be understood; forms show their generic fallback for those.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        /// Backend field name -> message, when the rejection is field-specific.
        fields: BTreeMap<String, String>,
    },
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// True for errors the backend produced on purpose.
    pub fn is_backend_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Unexpected(_) => None,
        }
    }

    /// Builds a rejection from a non-2xx response body.
    ///
    /// Understands `{"message": ..}`, `{"detail": ".."}`, FastAPI's
    /// `{"detail": [{"loc": [..], "msg": ..}]}`, `{"error": ".."}`,
    /// `{"error": {"message": ..}}` and `{"errors": {"field": ".."|[..]}}`,
    /// optionally inside a `{"data": ..}` envelope. Anything else keeps a
    /// status-based message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let mut message = None;
        let mut fields = BTreeMap::new();

        if let Ok(json) = serde_json::from_str::<Value>(body) {
            let json = json.get("data").filter(|d| d.is_object()).unwrap_or(&json);

            message = json
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| json.get("detail").and_then(Value::as_str))
                .or_else(|| json.get("error").and_then(Value::as_str))
                .or_else(|| {
                    json.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(Value::as_str)
                })
                .map(str::to_string);

            if let Some(errors) = json.get("errors").and_then(Value::as_object) {
                for (name, value) in errors {
                    let text = match value {
                        Value::String(s) => Some(s.clone()),
                        Value::Array(items) => {
                            items.first().and_then(Value::as_str).map(str::to_string)
                        }
                        _ => None,
                    };
                    if let Some(text) = text {
                        fields.insert(name.clone(), text);
                    }
                }
            }

            if let Some(details) = json.get("detail").and_then(Value::as_array) {
                for item in details {
                    let msg = item.get("msg").and_then(Value::as_str);
                    let name = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    if let (Some(name), Some(msg)) = (name, msg) {
                        fields.entry(name.to_string()).or_insert_with(|| msg.to_string());
                    }
                }
                if message.is_none() {
                    message = details
                        .first()
                        .and_then(|d| d.get("msg"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
            }
        }

        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_message(status));

        ApiError::Rejected {
            status,
            message,
            fields,
        }
    }
}

fn default_message(status: u16) -> String {
    match status {
        400 => "Invalid request".to_string(),
        401 => "Invalid credentials".to_string(),
        403 => "Access denied".to_string(),
        404 => "Not found".to_string(),
        409 => "Conflict".to_string(),
        422 => "Validation failed".to_string(),
        429 => "Too many requests. Please wait and try again".to_string(),
        s if s >= 500 => format!("Server error (HTTP {s})"),
        s => format!("HTTP {s}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(err: &ApiError) -> (&str, &BTreeMap<String, String>) {
        match err {
            ApiError::Rejected {
                message, fields, ..
            } => (message.as_str(), fields),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_message_field() {
        let err = ApiError::from_response(401, r#"{"message":"Invalid email or password"}"#);
        assert_eq!(parts(&err).0, "Invalid email or password");
        assert_eq!(err.status(), Some(401));
        assert!(err.is_backend_rejection());
    }

    #[test]
    fn test_detail_string() {
        let err = ApiError::from_response(400, r#"{"detail":"Reset token has expired"}"#);
        assert_eq!(parts(&err).0, "Reset token has expired");
    }

    #[test]
    fn test_fastapi_detail_list_maps_fields() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"}]}"#;
        let err = ApiError::from_response(422, body);
        let (message, fields) = parts(&err);
        assert_eq!(message, "value is not a valid email address");
        assert_eq!(
            fields.get("email").map(String::as_str),
            Some("value is not a valid email address")
        );
    }

    #[test]
    fn test_errors_object_with_envelope() {
        let body = r#"{"data":{"message":"Registration failed","errors":{"email":["Email already registered"]}}}"#;
        let err = ApiError::from_response(409, body);
        let (message, fields) = parts(&err);
        assert_eq!(message, "Registration failed");
        assert_eq!(
            fields.get("email").map(String::as_str),
            Some("Email already registered")
        );
    }

    #[test]
    fn test_nested_error_message() {
        let err = ApiError::from_response(403, r#"{"error":{"message":"Account locked"}}"#);
        assert_eq!(parts(&err).0, "Account locked");
    }

    #[test]
    fn test_non_json_body_uses_status_message() {
        let err = ApiError::from_response(502, "<html>Bad Gateway</html>");
        assert_eq!(parts(&err).0, "Server error (HTTP 502)");
        let err = ApiError::from_response(401, r#"{"message":"  "}"#);
        assert_eq!(parts(&err).0, "Invalid credentials");
    }

    #[test]
    fn test_unexpected_is_not_rejection() {
        let err = ApiError::Unexpected("missing access_token".into());
        assert!(!err.is_backend_rejection());
        assert_eq!(err.status(), None);
    }
}
