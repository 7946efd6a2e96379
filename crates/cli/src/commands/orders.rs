//! Order history commands.

use bookstore_client::ClientError;
use bookstore_client::api::Order;
use bookstore_core::OrderId;

use super::Context;

/// List the user's orders.
///
/// # Errors
///
/// Returns `ClientError` if the request fails.
pub async fn list(ctx: &Context) -> Result<(), ClientError> {
    let orders = ctx.session.orders().list().await?;
    if orders.is_empty() {
        println!("No orders yet.");
        return Ok(());
    }
    for order in &orders {
        print_order(order);
    }
    Ok(())
}

/// Show one order.
///
/// # Errors
///
/// Returns `ClientError` if the order does not exist or the request fails.
pub async fn show(ctx: &Context, id: OrderId) -> Result<(), ClientError> {
    let order = ctx.session.orders().get(id).await?;
    print_order(&order);
    Ok(())
}

fn print_order(order: &Order) {
    println!(
        "{}  book {}  x{}  {}  [{}]",
        order.id, order.book_id, order.quantity, order.total_amount, order.status
    );
}
