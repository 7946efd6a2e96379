//! Cart and checkout commands.

use bookstore_client::{CartError, CartStore, CheckoutError, ClientError, checkout as place_orders};
use bookstore_core::BookId;
use thiserror::Error;

use super::Context;

/// Errors from cart commands.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// The cart could not be updated.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Looking up the book failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Checkout placed no orders or only some of them.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

/// Print the cart and its total.
pub fn show(ctx: &Context) {
    let cart = CartStore::load(ctx.storage.clone());
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for line in cart.lines() {
        println!(
            "{}  {} x{}  {}",
            line.id,
            line.title,
            line.quantity,
            line.subtotal()
        );
    }
    println!("Total: {} ({} items)", cart.total(), cart.item_count());
}

/// Add one copy of a book, looking up its title and price.
///
/// # Errors
///
/// Returns `CartCommandError` if the book cannot be fetched or the cart
/// cannot be saved.
pub async fn add(ctx: &Context, id: BookId) -> Result<(), CartCommandError> {
    let book = ctx.session.books().get(id).await?;
    let mut cart = CartStore::load(ctx.storage.clone());
    cart.add_item(book.id, book.title.clone(), book.price)?;
    let quantity = cart.line(id).map_or(0, |line| line.quantity);
    println!("Added {} (now x{quantity}). Total: {}", book.title, cart.total());
    Ok(())
}

/// Remove a book's line.
///
/// # Errors
///
/// Returns `CartError` if the cart cannot be saved.
pub fn remove(ctx: &Context, id: BookId) -> Result<(), CartError> {
    let mut cart = CartStore::load(ctx.storage.clone());
    cart.remove_item(id)?;
    println!("Total: {}", cart.total());
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns `CartError` if the quantity is out of range or the cart cannot
/// be saved.
pub fn set(ctx: &Context, id: BookId, quantity: i64) -> Result<(), CartError> {
    let mut cart = CartStore::load(ctx.storage.clone());
    if cart.line(id).is_none() {
        println!("Book {id} is not in your cart.");
        return Ok(());
    }
    cart.update_quantity(id, quantity)?;
    println!("Total: {}", cart.total());
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `CartError` if the cart cannot be saved.
pub fn clear(ctx: &Context) -> Result<(), CartError> {
    CartStore::load(ctx.storage.clone()).clear()?;
    println!("Cart cleared.");
    Ok(())
}

/// Place one order per cart line.
///
/// # Errors
///
/// Returns `CartCommandError::Checkout` if the cart is empty or any order
/// fails; what was placed and what failed is printed first.
pub async fn checkout(ctx: &Context) -> Result<(), CartCommandError> {
    let mut cart = CartStore::load(ctx.storage.clone());
    match place_orders(&ctx.session, &mut cart).await {
        Ok(receipt) => {
            for order in &receipt.orders {
                print_placed(order);
            }
            println!("Total charged: {}", receipt.total);
            Ok(())
        }
        Err(CheckoutError::Failed { placed, failures }) => {
            for order in &placed {
                print_placed(order);
            }
            for failure in &failures {
                println!("Failed: {} ({})", failure.title, failure.error);
            }
            println!("Your cart was kept; placed orders were not cancelled.");
            Err(CheckoutError::Failed { placed, failures }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_placed(order: &bookstore_client::api::Order) {
    println!(
        "Placed order {}  x{}  {}",
        order.id, order.quantity, order.total_amount
    );
}
