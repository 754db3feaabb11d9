//! The HTTP-like response envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Status of a successful stylization.
pub const STATUS_OK: u16 = 200;
/// Status of every failed stylization, whatever the cause.
pub const STATUS_ERROR: u16 = 500;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessBody {
    /// `data:image/png;base64,...` URI of the stylized image.
    pub stylized_image: String,
}

/// Body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Display text of the failure.
    pub error: String,
}

/// Response envelope: a status code, headers, and a JSON-encoded body string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl Response {
    /// Build the envelope for a finished invocation.
    ///
    /// This is the single point where a failure becomes wire data; it cannot fail.
    #[must_use]
    pub fn from_result(result: Result<SuccessBody>) -> Self {
        match result.and_then(|body| Ok(serde_json::to_string(&body)?)) {
            Ok(body) => Self::json(STATUS_OK, body),
            Err(err) => Self::error(&err.to_string()),
        }
    }

    /// A 500 envelope carrying `message`.
    #[must_use]
    pub fn error(message: &str) -> Self {
        let body = ErrorBody {
            error: message.to_string(),
        };
        // A struct with one string field always serializes
        let body = serde_json::to_string(&body)
            .unwrap_or_else(|_| String::from(r#"{"error":"unserializable error"}"#));
        Self::json(STATUS_ERROR, body)
    }

    fn json(status_code: u16, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// Whether the invocation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Parse the body as a success body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a success body.
    pub fn success_body(&self) -> serde_json::Result<SuccessBody> {
        serde_json::from_str(&self.body)
    }

    /// Parse the body as an error body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not an error body.
    pub fn error_body(&self) -> serde_json::Result<ErrorBody> {
        serde_json::from_str(&self.body)
    }
}
