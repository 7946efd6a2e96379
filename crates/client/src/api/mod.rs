//! Typed wrappers for the bookstore REST resources.
//!
//! Each wrapper borrows a [`SessionManager`] and goes through its JSON
//! helpers, so every call gets token refresh and structured errors.
//!
//! ```rust,no_run
//! # async fn run(session: &bookstore_client::SessionManager) -> Result<(), bookstore_client::ClientError> {
//! for book in session.books().list().await? {
//!     println!("{} - {}", book.title, book.price);
//! }
//! # Ok(())
//! # }
//! ```

mod authors;
mod books;
mod orders;
mod types;
mod users;

pub use authors::AuthorsApi;
pub use books::BooksApi;
pub use orders::OrdersApi;
pub use types::*;
pub use users::UsersApi;

use crate::session::SessionManager;

impl SessionManager {
    /// Book catalog endpoints.
    #[must_use]
    pub const fn books(&self) -> BooksApi<'_> {
        BooksApi::new(self)
    }

    /// Author endpoints.
    #[must_use]
    pub const fn authors(&self) -> AuthorsApi<'_> {
        AuthorsApi::new(self)
    }

    /// Order endpoints.
    #[must_use]
    pub const fn orders(&self) -> OrdersApi<'_> {
        OrdersApi::new(self)
    }

    /// Current-user endpoints.
    #[must_use]
    pub const fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }
}
