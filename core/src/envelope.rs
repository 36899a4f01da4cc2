//! The `{code, success?, message?, data}` response wrapper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;

/// Envelope code that marks a successful call.
pub const SUCCESS_CODE: i64 = 200;

/// Message surfaced when a failed envelope carries none.
pub const FALLBACK_MESSAGE: &str = "Request failed";

/// Uniform response wrapper returned by every backend endpoint.
///
/// `code` is optional only because the admin backend sometimes answers with
/// `success: true` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Decode a response body.
    pub fn from_body(body: &str) -> Result<Self, RequestError> {
        serde_json::from_str(body).map_err(|e| RequestError::MalformedResponse(e.to_string()))
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(SUCCESS_CODE) || self.success == Some(true)
    }

    /// Unwrap to `data`, or turn a logical failure into `Business`.
    pub fn into_result(self) -> Result<Value, RequestError> {
        if self.is_success() {
            return Ok(self.data);
        }
        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        Err(RequestError::Business {
            code: self.code,
            message,
        })
    }
}
