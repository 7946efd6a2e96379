//! Buffered API responses.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// A fully-read response from the API.
///
/// Callers inspect [`status`](Self::status) and decode the body themselves,
/// or use [`error_for_status`](Self::error_for_status) to turn failures into
/// an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) const fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_slice(b"null")
        } else {
            serde_json::from_slice(&self.body)
        }
    }

    /// Turn a non-2xx response into an [`ApiError`].
    ///
    /// # Errors
    ///
    /// Returns `ApiError` carrying the status and decoded payload if the
    /// status is not a success.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_body(self.status, &self.body))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_decodes_as_null() {
        let response = ApiResponse::new(StatusCode::NO_CONTENT, Vec::new());
        let value: Option<u32> = response.json().unwrap();
        assert!(value.is_none());
        response.json::<()>().unwrap();
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::new(StatusCode::CREATED, b"{}".to_vec());
        assert!(ok.error_for_status().is_ok());

        let failed = ApiResponse::new(StatusCode::CONFLICT, br#"{"detail":"exists"}"#.to_vec());
        let err = failed.error_for_status().unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "API request failed with status 409: exists");
    }
}
