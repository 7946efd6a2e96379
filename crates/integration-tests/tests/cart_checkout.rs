//! Cart persistence and checkout against the mock API.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use bookstore_client::{
    CartStore, CheckoutError, LoginInput, MemoryStorage, SessionManager, Storage, checkout,
};
use bookstore_core::{BookId, Price};
use bookstore_integration_tests::{BOOK_FIVE, BOOK_TEN, MockApi, READER_EMAIL, READER_PASSWORD};
use reqwest::StatusCode;
use secrecy::SecretString;

async fn logged_in(mock: &MockApi, storage: Arc<dyn Storage>) -> SessionManager {
    let session = mock.session(storage);
    session
        .login(&LoginInput::new(
            READER_EMAIL,
            SecretString::from(READER_PASSWORD),
        ))
        .await
        .unwrap();
    session
}

async fn add(session: &SessionManager, cart: &mut CartStore, id: BookId) {
    let book = session.books().get(id).await.unwrap();
    cart.add_item(book.id, book.title, book.price).unwrap();
}

/// Two copies of the £10 book and one of the £5 book.
async fn filled_cart(session: &SessionManager, storage: Arc<dyn Storage>) -> CartStore {
    let mut cart = CartStore::load(storage);
    add(session, &mut cart, BOOK_TEN).await;
    add(session, &mut cart, BOOK_TEN).await;
    add(session, &mut cart, BOOK_FIVE).await;
    cart
}

#[tokio::test]
async fn test_checkout_places_one_order_per_line() {
    let mock = MockApi::start().await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let session = logged_in(&mock, storage.clone()).await;
    let mut cart = filled_cart(&session, storage.clone()).await;
    assert_eq!(cart.total(), Price::from_pence(2500));

    let receipt = checkout(&session, &mut cart).await.unwrap();

    assert_eq!(receipt.orders.len(), 2);
    assert_eq!(receipt.total, Price::from_pence(2500));
    let ten = receipt
        .orders
        .iter()
        .find(|order| order.book_id == BOOK_TEN)
        .unwrap();
    assert_eq!(ten.quantity, 2);
    assert_eq!(ten.total_amount, Price::from_pence(2000));
    assert_eq!(ten.status, "pending");

    assert!(cart.is_empty());
    assert!(CartStore::load(storage).is_empty());
    assert_eq!(mock.hits().create_order, 2);

    let history = session.orders().list().await.unwrap();
    assert_eq!(history.len(), 2);
    let fetched = session.orders().get(ten.id).await.unwrap();
    assert_eq!(&fetched, ten);
}

#[tokio::test]
async fn test_partial_failure_keeps_cart() {
    let mock = MockApi::start().await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let session = logged_in(&mock, storage.clone()).await;
    let mut cart = filled_cart(&session, storage.clone()).await;
    mock.mark_out_of_stock(BOOK_FIVE);

    let err = checkout(&session, &mut cart).await.unwrap_err();

    let (placed, failures) = match err {
        CheckoutError::Failed { placed, failures } => (placed, failures),
        other => panic!("expected partial failure, got {other:?}"),
    };
    assert_eq!(placed.len(), 1);
    assert_eq!(placed.first().unwrap().book_id, BOOK_TEN);
    assert_eq!(failures.len(), 1);
    let failure = failures.first().unwrap();
    assert_eq!(failure.book_id, BOOK_FIVE);
    assert_eq!(failure.title, "The Tombs of Atuan");
    assert_eq!(failure.error.status(), Some(StatusCode::BAD_REQUEST));

    // Nothing is rolled back and the cart is left for the user to retry.
    assert_eq!(mock.orders().len(), 1);
    assert_eq!(cart.lines().len(), 2);
    assert_eq!(CartStore::load(storage).lines(), cart.lines());
}

#[tokio::test]
async fn test_empty_cart_places_no_orders() {
    let mock = MockApi::start().await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let session = logged_in(&mock, storage.clone()).await;
    let mut cart = CartStore::load(storage);

    let err = checkout(&session, &mut cart).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(mock.hits().create_order, 0);
}

#[tokio::test]
async fn test_checkout_after_restart_refreshes_once() {
    let mock = MockApi::start().await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    {
        let session = logged_in(&mock, storage.clone()).await;
        filled_cart(&session, storage.clone()).await;
    }

    // A new session over the same storage holds the cookie and cart but no
    // access token, so every concurrent order waits on the same refresh.
    let session = mock.session(storage.clone());
    let mut cart = CartStore::load(storage);
    assert_eq!(cart.item_count(), 3);

    let receipt = checkout(&session, &mut cart).await.unwrap();
    assert_eq!(receipt.orders.len(), 2);
    let hits = mock.hits();
    assert_eq!(hits.refresh, 1);
    assert_eq!(hits.create_order, 2);
}
