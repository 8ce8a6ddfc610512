//! Response envelope and error-to-status mapping

use serde::{Deserialize, Serialize};
use serde_json::Value;

use souq_types::Error;

use super::request::Method;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_FORBIDDEN: u16 = 403;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;
pub const STATUS_UNPROCESSABLE: u16 = 422;
pub const STATUS_INTERNAL: u16 = 500;

const INTERNAL_MESSAGE: &str = "internal server error";

/// `{success, message, data?}` wrapper used by every API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl ApiResponse {
    /// Success envelope carrying `data`
    pub fn success<T: Serialize>(status: u16, message: &str, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::envelope(status, true, message, Some(data)),
            Err(e) => Self::from_error(&Error::Json(e)),
        }
    }

    pub fn ok<T: Serialize>(message: &str, data: &T) -> Self {
        Self::success(STATUS_OK, message, data)
    }

    pub fn created<T: Serialize>(message: &str, data: &T) -> Self {
        Self::success(STATUS_CREATED, message, data)
    }

    /// Failure envelope without data
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::envelope(status, false, &message.into(), None)
    }

    /// Body sent as-is, outside the envelope
    pub fn raw(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::error(STATUS_NOT_FOUND, format!("no route for {}", path))
    }

    pub fn method_not_allowed(method: Method, allowed: &[Method]) -> Self {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let mut response = Self::error(
            STATUS_METHOD_NOT_ALLOWED,
            format!("method {} not allowed", method),
        );
        response.headers.push(("allow", allow));
        response
    }

    /// Map a service error to a status and envelope.
    ///
    /// Server-side failures are logged and replaced by a generic message.
    pub fn from_error(err: &Error) -> Self {
        let status = status_for(err);
        if status >= STATUS_INTERNAL {
            tracing::error!(error = %err, "request failed");
            return Self::error(status, INTERNAL_MESSAGE);
        }
        Self::error(status, client_message(err))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a Value cannot fail
        serde_json::to_vec(&self.body).unwrap_or_default()
    }

    fn envelope(status: u16, success: bool, message: &str, data: Option<Value>) -> Self {
        let envelope = Envelope {
            success,
            message: message.to_string(),
            data,
        };
        let body = serde_json::to_value(envelope).unwrap_or(Value::Null);
        Self::raw(status, body)
    }
}

pub fn status_for(err: &Error) -> u16 {
    match err {
        Error::InvalidInput(_) => STATUS_BAD_REQUEST,
        Error::Auth(_) => STATUS_UNAUTHORIZED,
        Error::Forbidden(_) => STATUS_FORBIDDEN,
        Error::NotFound(_) => STATUS_NOT_FOUND,
        Error::Conflict(_) => STATUS_CONFLICT,
        Error::InsufficientMarketData(_) => STATUS_UNPROCESSABLE,
        _ => STATUS_INTERNAL,
    }
}

fn client_message(err: &Error) -> String {
    match err {
        Error::InvalidInput(m)
        | Error::Auth(m)
        | Error::Forbidden(m)
        | Error::NotFound(m)
        | Error::Conflict(m)
        | Error::InsufficientMarketData(m) => m.clone(),
        other => other.to_string(),
    }
}
