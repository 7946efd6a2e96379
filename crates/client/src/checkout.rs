//! Turning the cart into orders.
//!
//! One order is placed per cart line, all concurrently. The cart is cleared
//! only when every order succeeds. On any failure nothing is rolled back:
//! orders that were placed stay placed, the cart is left intact, and the
//! error lists both so the caller can decide what to do next.

use bookstore_core::{BookId, Price};
use futures::future::join_all;
use thiserror::Error;
use tracing::instrument;

use crate::api::{NewOrder, Order};
use crate::cart::CartStore;
use crate::error::ClientError;
use crate::session::SessionManager;

/// A cart line whose order could not be placed.
#[derive(Debug)]
pub struct LineFailure {
    /// The book the order was for.
    pub book_id: BookId,
    /// Title of the cart line, for reporting.
    pub title: String,
    /// Why the order was refused.
    pub error: ClientError,
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// At least one order failed. `placed` holds the ones that went through.
    #[error("{} of {} orders failed", failures.len(), failures.len() + placed.len())]
    Failed {
        /// Orders that were placed and are not rolled back.
        placed: Vec<Order>,
        /// Lines whose orders failed, in cart order.
        failures: Vec<LineFailure>,
    },
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// One order per former cart line.
    pub orders: Vec<Order>,
    /// Sum of the orders' `total_amount`.
    pub total: Price,
}

/// Place one order per cart line and empty the cart on full success.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` if the cart has no lines and
/// `CheckoutError::Failed` if any order could not be placed.
#[instrument(skip_all, fields(lines = cart.lines().len()))]
pub async fn checkout(
    session: &SessionManager,
    cart: &mut CartStore,
) -> Result<CheckoutReceipt, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let orders = session.orders();
    let requests = cart.lines().iter().map(|line| {
        let order = NewOrder {
            book_id: line.id,
            quantity: line.quantity,
            total_amount: line.subtotal(),
        };
        async move { orders.create(&order).await }
    });
    let results = join_all(requests).await;

    let mut placed = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (line, result) in cart.lines().iter().zip(results) {
        match result {
            Ok(order) => placed.push(order),
            Err(error) => {
                tracing::warn!(book_id = %line.id, error = %error, "Order failed");
                failures.push(LineFailure {
                    book_id: line.id,
                    title: line.title.clone(),
                    error,
                });
            }
        }
    }

    if !failures.is_empty() {
        return Err(CheckoutError::Failed { placed, failures });
    }

    if let Err(e) = cart.clear() {
        tracing::error!(error = %e, "Orders placed but cart could not be cleared");
    }

    let total: Price = placed.iter().map(|order| order.total_amount).sum();
    tracing::info!(orders = placed.len(), %total, "Checkout complete");
    Ok(CheckoutReceipt {
        orders: placed,
        total,
    })
}
