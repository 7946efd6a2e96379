//! `/users/me` endpoint.

use tracing::instrument;

use crate::error::ClientError;
use crate::models::UserProfile;
use crate::session::SessionManager;

/// Current-user endpoints.
#[derive(Debug, Clone, Copy)]
pub struct UsersApi<'a> {
    session: &'a SessionManager,
}

impl<'a> UsersApi<'a> {
    pub(crate) const fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// Fetch the signed-in user's profile from the API.
    ///
    /// The stored profile is not modified.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        self.session.get_json("/users/me").await
    }
}
