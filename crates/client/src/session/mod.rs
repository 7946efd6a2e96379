//! Authenticated access to the bookstore API.
//!
//! [`SessionManager`] holds the access token in memory, mirrors the user
//! profile into durable storage, and keeps the token valid without callers
//! having to know about expiry:
//!
//! - protected calls made without a token refresh first
//! - a 401 (or a 403 sent without a token) triggers one refresh and one retry
//! - concurrent refreshes collapse into a single in-flight call
//!
//! # Authentication
//!
//! The access token is never persisted. The refresh credential is a cookie
//! set by the API and kept in a [`PersistentCookieJar`], so a restarted
//! client re-establishes its token through `POST /users/refresh`.

mod refresh;
mod response;
mod route;

pub use response::ApiResponse;
pub use route::Route;

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::cookies::PersistentCookieJar;
use crate::error::{ClientError, RefreshFailure};
use crate::models::{CredentialsRequest, LoginInput, SignupInput, TokenResponse, UserProfile};
use crate::storage::{Storage, StorageError, USER_KEY, read_json, write_json};

use refresh::RefreshSlot;

pub(crate) const LOGIN_PATH: &str = "/users/login";
pub(crate) const SIGNUP_PATH: &str = "/users/signup";
pub(crate) const REFRESH_PATH: &str = "/users/refresh";
pub(crate) const LOGOUT_PATH: &str = "/users/logout";

/// Whether `path` is one of the endpoints that must be called without token
/// handling (login, signup, refresh).
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    matches!(
        path.trim_end_matches('/'),
        LOGIN_PATH | SIGNUP_PATH | REFRESH_PATH
    )
}

/// A user's session with the bookstore API.
///
/// Cheap to clone; clones share the same token, profile and cookie jar.
/// Independent sessions are created with separate [`SessionManager::new`]
/// calls.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: reqwest::Client,
    config: ClientConfig,
    storage: Arc<dyn Storage>,
    cookies: Arc<PersistentCookieJar>,
    token: RwLock<Option<SecretString>>,
    user: RwLock<Option<UserProfile>>,
    refresh: RefreshSlot,
}

impl SessionManager {
    /// Create a session for the configured API.
    ///
    /// Cookies are restored from `storage`; the user profile is hydrated
    /// lazily by [`user`](Self::user).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidInput` if the API base URL is invalid and
    /// `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, ClientError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| ClientError::InvalidInput(format!("invalid API base URL: {e}")))?;
        let cookies = Arc::new(PersistentCookieJar::load(storage.clone(), &api_base));

        let mut builder = reqwest::Client::builder().cookie_provider(cookies.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        Ok(Self {
            inner: Arc::new(SessionInner {
                client: builder.build()?,
                config: config.clone(),
                storage,
                cookies,
                token: RwLock::new(None),
                user: RwLock::new(None),
                refresh: RefreshSlot::default(),
            }),
        })
    }

    // =========================================================================
    // Session State
    // =========================================================================

    /// Replace the in-memory access token.
    pub fn set_token(&self, token: Option<SecretString>) {
        *self.inner.token.write() = token;
    }

    /// The current access token, if one is held.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.inner.token.read().clone()
    }

    /// Whether an access token is held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner.token.read().is_some()
    }

    /// Replace the user profile and its durable record.
    ///
    /// The in-memory profile is updated even if the durable write fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable record cannot be written or erased.
    pub fn set_user(&self, user: Option<UserProfile>) -> Result<(), StorageError> {
        let result = match &user {
            Some(profile) => write_json(self.inner.storage.as_ref(), USER_KEY, profile),
            None => self.inner.storage.remove(USER_KEY),
        };
        *self.inner.user.write() = user;
        result
    }

    /// The signed-in user.
    ///
    /// Returns the in-memory profile, hydrating it from durable storage on
    /// first use. A corrupt record is logged, erased and treated as absent.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        if let Some(user) = self.inner.user.read().as_ref() {
            return Some(user.clone());
        }

        let stored = match read_json::<UserProfile>(self.inner.storage.as_ref(), USER_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable user record");
                if let Err(e) = self.inner.storage.remove(USER_KEY) {
                    tracing::warn!(error = %e, "Failed to erase user record");
                }
                None
            }
        };

        let mut user = self.inner.user.write();
        if user.is_none() {
            user.clone_from(&stored);
        }
        user.clone()
    }

    /// Where the front-end should land for the current user.
    #[must_use]
    pub fn landing_route(&self) -> Route {
        Route::landing(self.user().as_ref())
    }

    /// The cookie jar carrying the refresh credential.
    #[must_use]
    pub fn cookies(&self) -> &PersistentCookieJar {
        &self.inner.cookies
    }

    /// Forget the token and the profile, including its durable record.
    pub fn clear_session(&self) {
        *self.inner.token.write() = None;
        if let Err(e) = self.set_user(None) {
            tracing::warn!(error = %e, "Failed to erase user record");
        }
        tracing::info!("Session cleared");
    }

    fn establish(&self, tokens: TokenResponse) {
        self.set_token(Some(SecretString::from(tokens.access_token)));
        if let Err(e) = self.set_user(Some(tokens.user)) {
            tracing::warn!(error = %e, "Failed to persist user record");
        }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Perform an API call with automatic token handling.
    ///
    /// Login, signup and refresh are sent as-is. Any other path refreshes
    /// first when no token is held, and refreshes then retries once when the
    /// API answers 401 (or 403 to a call sent without a token). The final
    /// response is returned whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Refresh` if the token had to be obtained before
    /// the call and that failed; the call itself is then never sent.
    /// Returns `ClientError::Http` on transport failures.
    #[instrument(skip(self, method, body), fields(method = %method))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, ClientError> {
        if is_public_path(path) {
            let response = self.send(&method, path, body.as_deref(), None).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                self.clear_session();
            }
            return Ok(response);
        }

        if !self.has_token() {
            tracing::debug!("No access token held, refreshing before request");
            self.refresh().await?;
        }

        let token = self.token();
        let response = self
            .send(&method, path, body.as_deref(), token.as_ref())
            .await?;

        let rejected = response.status() == StatusCode::UNAUTHORIZED
            || (response.status() == StatusCode::FORBIDDEN && token.is_none());
        if !rejected {
            return Ok(response);
        }

        tracing::debug!(status = %response.status(), "Request rejected, refreshing token");
        if let Err(failure) = self.refresh().await {
            tracing::debug!(%failure, "Refresh failed, returning original response");
            return Ok(response);
        }

        let token = self.token();
        let retried = self
            .send(&method, path, body.as_deref(), token.as_ref())
            .await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Retry rejected after refresh");
            self.clear_session();
        }
        Ok(retried)
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` on non-2xx statuses, `ClientError::Json` if
    /// the body does not decode, and anything [`request`](Self::request)
    /// returns.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.json_call(Method::GET, path, None).await
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        self.json_call(Method::POST, path, Some(body)).await
    }

    /// `PATCH` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        self.json_call(Method::PATCH, path, Some(body)).await
    }

    /// `DELETE` a resource, ignoring any response body.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.request(Method::DELETE, path, None)
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn json_call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, ClientError> {
        let response = self.request(method, path, body).await?.error_for_status()?;
        Ok(response.json()?)
    }

    /// Send one request and buffer the response.
    async fn send(
        &self,
        method: &Method,
        path: &str,
        body: Option<&[u8]>,
        token: Option<&SecretString>,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut request = self
            .inner
            .client
            .request(method.clone(), self.inner.config.url_for(path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(%method, path, status = status.as_u16(), "API response");
        Ok(ApiResponse::new(status, body.to_vec()))
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Log in and establish the session.
    ///
    /// Returns the landing route for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidInput` for empty fields and
    /// `ClientError::Api` if the API rejects the credentials.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: &LoginInput) -> Result<Route, ClientError> {
        input.validate()?;
        let tokens: TokenResponse = self.post_json(LOGIN_PATH, &input.wire()).await?;
        let route = Route::landing(Some(&tokens.user));
        self.establish(tokens);
        tracing::info!(%route, "Logged in");
        Ok(route)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidInput` if the input fails local checks
    /// and `ClientError::Api` if the API rejects it (e.g. duplicate email).
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn signup(&self, input: &SignupInput) -> Result<UserProfile, ClientError> {
        let email = input.validate()?;
        let request = CredentialsRequest {
            email: email.as_str(),
            full_name: Some(input.full_name.trim()),
            password: input.password.expose_secret(),
        };
        self.post_json(SIGNUP_PATH, &request).await
    }

    /// Log out.
    ///
    /// The logout call is best-effort; local state (token, profile, cookies)
    /// is always cleared. Returns the unauthenticated entry point.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Route {
        let token = self.token();
        match self
            .send(&Method::POST, LOGOUT_PATH, None, token.as_ref())
            .await
        {
            Ok(response) if !response.is_success() => {
                tracing::warn!(status = %response.status(), "Logout call rejected");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Logout call failed"),
        }

        self.clear_session();
        self.inner.cookies.clear();
        Route::Auth
    }

    /// Exchange the refresh cookie for a new token and profile.
    ///
    /// Any failure clears the session.
    async fn exchange_refresh_credential(&self) -> Result<(), RefreshFailure> {
        let result = match self.send(&Method::POST, REFRESH_PATH, None, None).await {
            Ok(response) if response.is_success() => response
                .json::<TokenResponse>()
                .map_err(|e| RefreshFailure::Transport(format!("invalid refresh response: {e}"))),
            Ok(response) => Err(RefreshFailure::Rejected {
                status: response.status(),
            }),
            Err(e) => Err(RefreshFailure::Transport(e.to_string())),
        };

        match result {
            Ok(tokens) => {
                self.establish(tokens);
                tracing::info!("Session refreshed");
                Ok(())
            }
            Err(failure) => {
                tracing::warn!(%failure, "Session refresh failed");
                self.clear_session();
                Err(failure)
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("api_base", &self.inner.config.api_base)
            .field("has_token", &self.has_token())
            .field("user", &*self.inner.user.read())
            .finish_non_exhaustive()
    }
}
