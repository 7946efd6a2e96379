//! `/books` endpoints.

use bookstore_core::BookId;
use tracing::instrument;

use super::types::{Book, BookUpdate, NewBook};
use crate::error::ClientError;
use crate::session::SessionManager;

/// Book catalog endpoints.
#[derive(Debug, Clone, Copy)]
pub struct BooksApi<'a> {
    session: &'a SessionManager,
}

impl<'a> BooksApi<'a> {
    pub(crate) const fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// List every book.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Book>, ClientError> {
        self.session.get_json("/books").await
    }

    /// Fetch one book.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 404 if the book does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, id: BookId) -> Result<Book, ClientError> {
        self.session.get_json(&format!("/books/{id}")).await
    }

    /// Add a book to the catalog (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 422 and field errors if the API
    /// rejects the input.
    #[instrument(skip(self, book), fields(title = %book.title))]
    pub async fn create(&self, book: &NewBook) -> Result<Book, ClientError> {
        self.session.post_json("/books", book).await
    }

    /// Update a book (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidInput` for an empty update, otherwise as
    /// [`create`](Self::create).
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: BookId, update: &BookUpdate) -> Result<Book, ClientError> {
        if update.is_empty() {
            return Err(ClientError::InvalidInput("nothing to update".into()));
        }
        self.session
            .patch_json(&format!("/books/{id}"), update)
            .await
    }

    /// Remove a book (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: BookId) -> Result<(), ClientError> {
        self.session.delete(&format!("/books/{id}")).await
    }
}
