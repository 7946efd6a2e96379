//! `/authors` endpoints.

use bookstore_core::AuthorId;
use tracing::instrument;

use super::types::{Author, AuthorUpdate, NewAuthor};
use crate::error::ClientError;
use crate::session::SessionManager;

/// Author endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AuthorsApi<'a> {
    session: &'a SessionManager,
}

impl<'a> AuthorsApi<'a> {
    pub(crate) const fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// List every author. Listed authors carry no books.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Author>, ClientError> {
        self.session.get_json("/authors").await
    }

    /// Fetch one author with their books.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 404 if the author does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, id: AuthorId) -> Result<Author, ClientError> {
        self.session.get_json(&format!("/authors/{id}")).await
    }

    /// Add an author (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the API rejects the input.
    #[instrument(skip(self, author), fields(name = %author.name))]
    pub async fn create(&self, author: &NewAuthor) -> Result<Author, ClientError> {
        self.session.post_json("/authors", author).await
    }

    /// Update an author (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidInput` for an empty update, otherwise as
    /// [`create`](Self::create).
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: AuthorId, update: &AuthorUpdate) -> Result<Author, ClientError> {
        if update.is_empty() {
            return Err(ClientError::InvalidInput("nothing to update".into()));
        }
        self.session
            .patch_json(&format!("/authors/{id}"), update)
            .await
    }

    /// Remove an author and their books (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AuthorId) -> Result<(), ClientError> {
        self.session.delete(&format!("/authors/{id}")).await
    }
}
