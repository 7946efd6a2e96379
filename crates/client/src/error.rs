//! Error types for the bookstore client.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur when talking to the bookstore API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request or response body was not valid JSON for the expected type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The access token could not be re-established.
    #[error("session refresh failed: {0}")]
    Refresh(#[from] RefreshFailure),

    /// Durable storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input was rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Why a token refresh failed.
///
/// Cloneable so every caller waiting on a shared refresh observes the same
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    /// The refresh endpoint answered with a non-success status.
    #[error("refresh rejected with status {status}")]
    Rejected {
        /// Status returned by the refresh endpoint.
        status: StatusCode,
    },

    /// The refresh call failed before a usable response arrived.
    #[error("refresh transport failure: {0}")]
    Transport(String),
}

/// A non-success response from the API.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code.
    pub status: StatusCode,
    /// Decoded response body, `None` when the body was empty or not JSON.
    pub payload: Option<serde_json::Value>,
}

impl ApiError {
    /// Build an error from a status and raw body.
    #[must_use]
    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let payload = if body.is_empty() {
            None
        } else {
            let text = || serde_json::Value::String(String::from_utf8_lossy(body).into_owned());
            Some(serde_json::from_slice(body).unwrap_or_else(|_| text()))
        };
        Self { status, payload }
    }

    /// The `detail` member of the payload, if present and well-formed.
    #[must_use]
    pub fn detail(&self) -> Option<ErrorDetail> {
        let detail = self.payload.as_ref()?.get("detail")?;
        ErrorDetail::deserialize(detail).ok()
    }

    /// Field-level validation errors keyed by field name.
    ///
    /// The field name is the last element of each entry's `loc` path, which
    /// is how the API reports body fields (`["body", "email"]`).
    #[must_use]
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        match self.detail() {
            Some(ErrorDetail::Fields(fields)) => fields
                .into_iter()
                .filter_map(|f| f.field_name().map(|name| (name, f.msg)))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Whether this is a validation failure (422).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.status == StatusCode::UNPROCESSABLE_ENTITY
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API request failed with status {}", self.status.as_u16())?;
        match self.detail() {
            Some(detail) => write!(f, ": {detail}"),
            None => match &self.payload {
                Some(payload) => write!(f, ": {payload}"),
                None => Ok(()),
            },
        }
    }
}

impl std::error::Error for ApiError {}

/// The `detail` member of an API error payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// A single human-readable message.
    Message(String),
    /// Field-level validation errors.
    Fields(Vec<FieldError>),
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::Fields(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|field| match field.field_name() {
                        Some(name) => format!("{name}: {}", field.msg),
                        None => field.msg.clone(),
                    })
                    .collect();
                f.write_str(&parts.join("; "))
            }
        }
    }
}

/// One field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    /// Location of the offending value (e.g. `["body", "price"]`).
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    /// Error message.
    pub msg: String,
    /// Machine-readable error type.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl FieldError {
    /// Name of the offending field, taken from the end of `loc`.
    #[must_use]
    pub fn field_name(&self) -> Option<String> {
        match self.loc.last()? {
            serde_json::Value::String(name) => Some(name.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_detail_display() {
        let err = ApiError::from_body(StatusCode::NOT_FOUND, br#"{"detail":"Book not found"}"#);
        assert_eq!(err.detail(), Some(ErrorDetail::Message("Book not found".into())));
        assert_eq!(
            err.to_string(),
            "API request failed with status 404: Book not found"
        );
    }

    #[test]
    fn test_validation_detail_maps_fields() {
        let body = br#"{"detail":[
            {"loc":["body","price"],"msg":"Input should be greater than 0","type":"greater_than"},
            {"loc":["body","title"],"msg":"Field required","type":"missing"}
        ]}"#;
        let err = ApiError::from_body(StatusCode::UNPROCESSABLE_ENTITY, body);

        assert!(err.is_validation());
        let fields = err.field_errors();
        assert_eq!(fields.get("price").unwrap(), "Input should be greater than 0");
        assert_eq!(fields.get("title").unwrap(), "Field required");
        assert_eq!(
            err.to_string(),
            "API request failed with status 422: price: Input should be greater than 0; title: Field required"
        );
    }

    #[test]
    fn test_non_json_body_is_kept_as_text() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, b"upstream down");
        assert_eq!(
            err.payload,
            Some(serde_json::Value::String("upstream down".into()))
        );
        assert!(err.detail().is_none());
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn test_empty_body() {
        let err = ApiError::from_body(StatusCode::INTERNAL_SERVER_ERROR, b"");
        assert!(err.payload.is_none());
        assert_eq!(err.to_string(), "API request failed with status 500");
    }

    #[test]
    fn test_client_error_status() {
        let err = ClientError::from(ApiError::from_body(StatusCode::FORBIDDEN, b""));
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(ClientError::InvalidInput("x".into()).status().is_none());
    }

    #[test]
    fn test_refresh_failure_display() {
        let err = RefreshFailure::Rejected {
            status: StatusCode::UNAUTHORIZED,
        };
        assert_eq!(err.to_string(), "refresh rejected with status 401 Unauthorized");
    }
}
