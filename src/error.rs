//! Error normalization for the portal API.
//!
//! Every transport or protocol failure in the crate funnels through this
//! module and comes out as an [`ApiError`] carrying exactly one [`ErrorCode`]
//! and a display-ready message. Nothing downstream inspects raw reqwest
//! errors or response bodies.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown when a response body yields no usable message.
const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Closed taxonomy of normalized failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Connection never completed (unreachable or timed out)
    #[serde(rename = "E_NET")]
    Net,
    /// 5xx (or Cloudflare 520) — infrastructure problem, retry later
    #[serde(rename = "E_SERVER")]
    Server,
    /// 401 — credential rejected
    #[serde(rename = "E_AUTH")]
    Auth,
    /// 403 — authenticated but not allowed
    #[serde(rename = "E_FORBIDDEN")]
    Forbidden,
    /// Any other 4xx — message derived from the response body
    #[serde(rename = "E_API")]
    Api,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Net => "E_NET",
            ErrorCode::Server => "E_SERVER",
            ErrorCode::Auth => "E_AUTH",
            ErrorCode::Forbidden => "E_FORBIDDEN",
            ErrorCode::Api => "E_API",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized API failure.
///
/// The only error shape the rest of the crate (and its callers) consume.
/// `message` is always non-empty and safe to show to a user.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Display-ready description of the failure
    pub message: String,
    /// Taxonomy code
    pub code: ErrorCode,
    /// HTTP status of the response, or 0 if none was received
    pub status: u16,
    /// True for connectivity and 5xx failures — retry later, keep the session
    pub is_network_error: bool,
    /// True for 401 — the credential itself is bad
    pub is_auth_error: bool,
    /// Raw response body, when one was received and parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiError {
    /// Normalize a failure where no response arrived at all.
    ///
    /// Timeouts and connection failures share `E_NET`; only the message
    /// distinguishes them.
    pub fn from_send_error(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out. Please try again."
        } else {
            "Cannot reach the server. Check your connection."
        };

        Self {
            message: message.to_string(),
            code: ErrorCode::Net,
            status: 0,
            is_network_error: true,
            is_auth_error: false,
            data: None,
        }
    }

    /// Normalize a completed response with a non-success status.
    ///
    /// Classification is an ordered decision list; the conditions overlap in
    /// the raw data, so the order is load-bearing.
    pub fn from_status(status: u16, body: Option<Value>) -> Self {
        if status >= 500 || status == 520 {
            // Grouped with network failures on purpose: both mean "retry
            // later, don't invalidate the session".
            return Self {
                message: "The server hit a problem. Please try again shortly.".to_string(),
                code: ErrorCode::Server,
                status,
                is_network_error: true,
                is_auth_error: false,
                data: body,
            };
        }

        if status == 401 {
            return Self {
                message: "Your session has expired. Please log in again.".to_string(),
                code: ErrorCode::Auth,
                status,
                is_network_error: false,
                is_auth_error: true,
                data: body,
            };
        }

        if status == 403 {
            return Self {
                message: "You do not have permission to do that.".to_string(),
                code: ErrorCode::Forbidden,
                status,
                is_network_error: false,
                is_auth_error: false,
                data: body,
            };
        }

        Self {
            message: extract_message(body.as_ref()),
            code: ErrorCode::Api,
            status,
            is_network_error: false,
            is_auth_error: false,
            data: body,
        }
    }

    /// Normalize a response whose body could not be decoded.
    ///
    /// Lands in `E_API` like any other malformed-payload case.
    pub fn from_invalid_body(status: u16) -> Self {
        Self {
            message: "The server returned an unexpected response.".to_string(),
            code: ErrorCode::Api,
            status,
            is_network_error: false,
            is_auth_error: false,
            data: None,
        }
    }
}

/// Derive a display-ready message from an arbitrary error body.
///
/// Handles the backend's validation shape (`detail` as a string, an array of
/// `{msg}` objects, or a single object) plus plain `message`/`error` fields.
/// Guaranteed to return a non-empty string for any input.
pub fn extract_message(body: Option<&Value>) -> String {
    let Some(body) = body else {
        return FALLBACK_MESSAGE.to_string();
    };

    if let Value::String(s) = body {
        if !s.is_empty() {
            return s.clone();
        }
        return FALLBACK_MESSAGE.to_string();
    }

    if let Some(detail) = body.get("detail") {
        match detail {
            Value::String(s) if !s.is_empty() => return s.clone(),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(element_message)
                    .collect::<Vec<_>>()
                    .join(", ");
                if !joined.is_empty() {
                    return joined;
                }
            }
            Value::Object(_) => return element_message(detail),
            _ => {}
        }
    }

    if let Some(Value::String(s)) = body.get("message") {
        if !s.is_empty() {
            return s.clone();
        }
    }

    if let Some(Value::String(s)) = body.get("error") {
        if !s.is_empty() {
            return s.clone();
        }
    }

    FALLBACK_MESSAGE.to_string()
}

/// Message for one element of a `detail` payload: prefer `msg`, then
/// `message`, else stringify the element.
fn element_message(element: &Value) -> String {
    if let Some(Value::String(s)) = element.get("msg") {
        return s.clone();
    }
    if let Some(Value::String(s)) = element.get("message") {
        return s.clone();
    }
    match element {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
