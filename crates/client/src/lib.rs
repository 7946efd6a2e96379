//! Bookstore client library.
//!
//! Talks to the bookstore REST API on behalf of a single user:
//!
//! - [`session`] - authenticated requests with transparent token refresh
//! - [`cart`] - the client-side shopping cart and its durable mirror
//! - [`checkout`] - turning the cart into orders
//! - [`api`] - typed wrappers for books, authors, orders and users
//! - [`storage`] - durable key/value storage backends
//! - [`cookies`] - a cookie jar that survives restarts
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bookstore_client::{CartStore, ClientConfig, MemoryStorage, SessionManager};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let storage = Arc::new(MemoryStorage::new());
//! let session = SessionManager::new(&config, storage.clone())?;
//!
//! let books = session.books().list().await?;
//! let mut cart = CartStore::load(storage);
//! if let Some(book) = books.first() {
//!     cart.add_item(book.id, book.title.clone(), book.price)?;
//! }
//! let receipt = bookstore_client::checkout(&session, &mut cart).await?;
//! println!("placed {} orders for {}", receipt.orders.len(), receipt.total);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod cookies;
pub mod error;
pub mod models;
pub mod session;
pub mod storage;

pub use cart::{CartError, CartLine, CartStore};
pub use checkout::{CheckoutError, CheckoutReceipt, LineFailure, checkout};
pub use config::{ClientConfig, ConfigError};
pub use cookies::PersistentCookieJar;
pub use error::{ApiError, ClientError, ErrorDetail, FieldError, RefreshFailure};
pub use models::{LoginInput, SignupInput, TokenResponse, UserProfile};
pub use session::{ApiResponse, Route, SessionManager};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
