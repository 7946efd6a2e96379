//! Catalog endpoints, role checks and API error bodies.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use bookstore_client::api::{BookUpdate, NewBook};
use bookstore_client::{ClientError, ErrorDetail, LoginInput, MemoryStorage, SessionManager};
use bookstore_core::{BookId, Price, UserRole};
use bookstore_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, AUTHOR, BOOK_FIVE, BOOK_TEN, MockApi, READER_EMAIL,
    READER_PASSWORD,
};
use reqwest::StatusCode;
use secrecy::SecretString;

async fn login_as(mock: &MockApi, email: &str, password: &str) -> SessionManager {
    let session = mock.session(Arc::new(MemoryStorage::new()));
    session
        .login(&LoginInput::new(email, SecretString::from(password)))
        .await
        .unwrap();
    session
}

fn new_book(title: &str) -> NewBook {
    NewBook {
        title: title.to_owned(),
        author_id: AUTHOR,
        description: None,
        price: Price::from_pence(1299),
        published_date: None,
    }
}

#[tokio::test]
async fn test_books_decode_prices_and_dates() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, READER_EMAIL, READER_PASSWORD).await;

    let book = session.books().get(BOOK_TEN).await.unwrap();
    assert_eq!(book.price, Price::from_pence(1000));
    assert_eq!(
        book.published_date.unwrap().format("%Y-%m-%d").to_string(),
        "1968-09-01"
    );

    let other = session.books().get(BOOK_FIVE).await.unwrap();
    assert!(other.published_date.is_none());
    assert!(other.description.is_none());
}

#[tokio::test]
async fn test_author_detail_lists_books() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, READER_EMAIL, READER_PASSWORD).await;

    let authors = session.authors().list().await.unwrap();
    assert_eq!(authors.len(), 1);
    assert!(authors.first().unwrap().books.is_empty());

    let author = session.authors().get(AUTHOR).await.unwrap();
    assert_eq!(author.books.len(), 2);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, READER_EMAIL, READER_PASSWORD).await;

    let err = session.books().get(BookId::generate()).await.unwrap_err();
    let ClientError::Api(api) = &err else {
        panic!("expected API error, got {err:?}");
    };
    assert_eq!(api.status, StatusCode::NOT_FOUND);
    assert_eq!(
        api.detail(),
        Some(ErrorDetail::Message("Book not found".into()))
    );
}

#[tokio::test]
async fn test_forbidden_with_token_is_not_retried() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, READER_EMAIL, READER_PASSWORD).await;

    let err = session
        .books()
        .create(&new_book("Tehanu"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));

    let hits = mock.hits();
    assert_eq!(hits.create_book, 1);
    assert_eq!(hits.refresh, 0);
    assert!(session.user().is_some());
}

#[tokio::test]
async fn test_admin_manages_books() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(session.user().unwrap().role, UserRole::Admin);

    let created = session.books().create(&new_book("Tehanu")).await.unwrap();
    assert_eq!(created.title, "Tehanu");
    assert_eq!(created.price, Price::from_pence(1299));
    assert_eq!(session.books().list().await.unwrap().len(), 3);

    session.books().delete(created.id).await.unwrap();
    assert_eq!(session.books().list().await.unwrap().len(), 2);

    let err = session.books().delete(created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_validation_errors_expose_fields() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let err = session.books().create(&new_book("")).await.unwrap_err();
    let ClientError::Api(api) = &err else {
        panic!("expected API error, got {err:?}");
    };
    assert!(api.is_validation());
    assert_eq!(
        api.field_errors().get("title").map(String::as_str),
        Some("Field required")
    );
}

#[tokio::test]
async fn test_empty_update_is_rejected_locally() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let err = session
        .books()
        .update(BOOK_TEN, &BookUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
}

#[tokio::test]
async fn test_me_matches_login() {
    let mock = MockApi::start().await;
    let session = login_as(&mock, READER_EMAIL, READER_PASSWORD).await;

    let me = session.users().me().await.unwrap();
    assert_eq!(Some(me), session.user());
}
