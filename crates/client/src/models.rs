//! Account and session payloads.

use bookstore_core::{Email, UserId, UserRole};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Minimum password length accepted by the API.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// The signed-in user's profile.
///
/// Persisted under the durable `user` key and restored on startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    /// Profiles returned without a role are customers.
    #[serde(default)]
    pub role: UserRole,
}

/// Response from the login and refresh endpoints.
///
/// The refresh token is also delivered as a cookie, which is what the
/// session relies on; the body copy is ignored.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserProfile,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("user", &self.user)
            .finish()
    }
}

/// Credentials for `POST /users/login`.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: SecretString,
}

impl LoginInput {
    /// Create login input.
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }

    /// Check the input before sending it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidInput` if either field is empty.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.email.trim().is_empty() {
            return Err(ClientError::InvalidInput("Email is required".into()));
        }
        if self.password.expose_secret().is_empty() {
            return Err(ClientError::InvalidInput("Password is required".into()));
        }
        Ok(())
    }

    pub(crate) fn wire(&self) -> CredentialsRequest<'_> {
        CredentialsRequest {
            email: self.email.trim(),
            full_name: None,
            password: self.password.expose_secret(),
        }
    }
}

/// Account details for `POST /users/signup`.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub full_name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignupInput {
    /// Check the input before sending it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidInput` naming the first problem found.
    pub fn validate(&self) -> Result<Email, ClientError> {
        if self.full_name.trim().is_empty() {
            return Err(ClientError::InvalidInput("Full name is required".into()));
        }
        let email =
            Email::parse(&self.email).map_err(|e| ClientError::InvalidInput(e.to_string()))?;
        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ClientError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            return Err(ClientError::InvalidInput("Passwords do not match".into()));
        }
        Ok(email)
    }
}

/// Wire body shared by login and signup.
#[derive(Serialize)]
pub(crate) struct CredentialsRequest<'a> {
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<&'a str>,
    pub password: &'a str,
}
