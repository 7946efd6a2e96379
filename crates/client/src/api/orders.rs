//! `/orders` endpoints.

use bookstore_core::OrderId;
use tracing::instrument;

use super::types::{NewOrder, Order};
use crate::error::ClientError;
use crate::session::SessionManager;

/// Order endpoints. Orders are always scoped to the signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct OrdersApi<'a> {
    session: &'a SessionManager,
}

impl<'a> OrdersApi<'a> {
    pub(crate) const fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self, order), fields(book_id = %order.book_id, quantity = order.quantity))]
    pub async fn create(&self, order: &NewOrder) -> Result<Order, ClientError> {
        self.session.post_json("/orders", order).await
    }

    /// List the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>, ClientError> {
        self.session.get_json("/orders").await
    }

    /// Fetch one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 404 if the order does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order, ClientError> {
        self.session.get_json(&format!("/orders/{id}")).await
    }
}
