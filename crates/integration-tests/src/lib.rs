//! Integration tests for the bookstore client.
//!
//! [`MockApi`] serves an in-process imitation of the bookstore REST API on
//! `127.0.0.1`, so the tests drive the real reqwest stack end to end:
//! bearer tokens, the `refresh_token` cookie, error bodies and all.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookstore-integration-tests
//! ```
//!
//! # Mock behaviour
//!
//! - Login and refresh issue a fresh access token and rotate the
//!   `refresh_token` cookie.
//! - Calls without an `Authorization` header get 403; unknown tokens get 401.
//! - Creating books requires the admin role.
//! - Calls to the endpoints the tests care about are counted; see [`Hits`].

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bookstore_client::{ClientConfig, SessionManager, Storage};
use bookstore_core::{AuthorId, BookId};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Seeded admin account.
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Seeded customer account. The API reports its role as `user`.
pub const READER_EMAIL: &str = "reader@example.com";
pub const READER_PASSWORD: &str = "reader-password";

/// Seeded author of both books.
pub const AUTHOR: AuthorId = AuthorId::new(Uuid::from_u128(0xa0));

/// Seeded book priced £10.00.
pub const BOOK_TEN: BookId = BookId::new(Uuid::from_u128(0xb1));

/// Seeded book priced £5.00.
pub const BOOK_FIVE: BookId = BookId::new(Uuid::from_u128(0xb2));

#[derive(Debug, Default)]
struct Counters {
    login: AtomicUsize,
    refresh: AtomicUsize,
    logout: AtomicUsize,
    me: AtomicUsize,
    list_books: AtomicUsize,
    create_book: AtomicUsize,
    create_order: AtomicUsize,
}

/// Per-endpoint call counts at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hits {
    pub login: usize,
    pub refresh: usize,
    pub logout: usize,
    pub me: usize,
    pub list_books: usize,
    pub create_book: usize,
    pub create_order: usize,
}

impl Counters {
    fn snapshot(&self) -> Hits {
        let read = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        Hits {
            login: read(&self.login),
            refresh: read(&self.refresh),
            logout: read(&self.logout),
            me: read(&self.me),
            list_books: read(&self.list_books),
            create_book: read(&self.create_book),
            create_order: read(&self.create_order),
        }
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    profile: Value,
}

#[derive(Debug, Default)]
struct MockState {
    hits: Counters,
    next_token: AtomicUsize,
    accounts: Mutex<HashMap<String, Account>>,
    /// Access token to account email.
    access_tokens: Mutex<HashMap<String, String>>,
    /// Refresh token to account email.
    refresh_tokens: Mutex<HashMap<String, String>>,
    refresh_delay: Mutex<Duration>,
    refresh_failure: Mutex<Option<StatusCode>>,
    refresh_garbled: Mutex<bool>,
    issue_dead_tokens: Mutex<bool>,
    books: Mutex<Vec<Value>>,
    authors: Mutex<Vec<Value>>,
    orders: Mutex<Vec<Value>>,
    out_of_stock: Mutex<HashSet<Uuid>>,
}

impl MockState {
    fn seeded() -> Self {
        let state = Self::default();
        {
            let mut accounts = state.accounts.lock();
            for (email, password, name, role, id) in [
                (ADMIN_EMAIL, ADMIN_PASSWORD, "Ada Admin", "admin", 0xc1_u128),
                (READER_EMAIL, READER_PASSWORD, "Rita Reader", "user", 0xc2_u128),
            ] {
                accounts.insert(
                    email.to_owned(),
                    Account {
                        password: password.to_owned(),
                        profile: json!({
                            "id": Uuid::from_u128(id),
                            "email": email,
                            "full_name": name,
                            "role": role,
                        }),
                    },
                );
            }
        }
        state.authors.lock().push(json!({
            "id": AUTHOR.as_uuid(),
            "name": "Ursula K. Le Guin",
            "bio": "Author of Earthsea.",
        }));
        state.books.lock().extend([
            json!({
                "id": BOOK_TEN.as_uuid(),
                "title": "A Wizard of Earthsea",
                "author_id": AUTHOR.as_uuid(),
                "description": "A young mage learns the cost of power.",
                "price": 10.0,
                "published_date": "1968-09-01T00:00:00",
            }),
            json!({
                "id": BOOK_FIVE.as_uuid(),
                "title": "The Tombs of Atuan",
                "author_id": AUTHOR.as_uuid(),
                "description": null,
                "price": 5.0,
                "published_date": null,
            }),
        ]);
        state
    }

    fn issue_tokens(&self, email: &str) -> (String, String) {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        if !*self.issue_dead_tokens.lock() {
            self.access_tokens
                .lock()
                .insert(access.clone(), email.to_owned());
        }
        self.refresh_tokens
            .lock()
            .insert(refresh.clone(), email.to_owned());
        (access, refresh)
    }

    fn profile(&self, email: &str) -> Option<Value> {
        self.accounts
            .lock()
            .get(email)
            .map(|account| account.profile.clone())
    }

    /// Resolve the bearer token to a profile, FastAPI style: no header is
    /// 403, a bad token is 401.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Value, Response> {
        let Some(header) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return Err(detail(StatusCode::FORBIDDEN, "Not authenticated"));
        };
        let token = header.strip_prefix("Bearer ").unwrap_or_default();
        let email = self.access_tokens.lock().get(token).cloned();
        email
            .and_then(|email| self.profile(&email))
            .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }

    fn require_admin(&self, headers: &HeaderMap) -> Result<Value, Response> {
        let user = self.authenticate(headers)?;
        if user["role"] == "admin" {
            Ok(user)
        } else {
            Err(detail(StatusCode::FORBIDDEN, "Not enough permissions"))
        }
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| pair.trim().strip_prefix("refresh_token="))
        .map(str::to_owned)
}

fn token_response(state: &MockState, email: &str) -> Response {
    let (access, refresh) = state.issue_tokens(email);
    let body = json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "user": state.profile(email),
    });
    let cookie = format!("refresh_token={refresh}; HttpOnly; Path=/; Max-Age=604800; SameSite=lax");
    ([(SET_COOKIE, cookie)], Json(body)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
    full_name: Option<String>,
}

async fn signup(State(state): State<Arc<MockState>>, Json(body): Json<Credentials>) -> Response {
    let mut accounts = state.accounts.lock();
    if accounts.contains_key(&body.email) {
        return detail(StatusCode::BAD_REQUEST, "Email already registered");
    }
    let profile = json!({
        "id": Uuid::new_v4(),
        "email": body.email,
        "full_name": body.full_name.unwrap_or_default(),
        "role": "user",
    });
    accounts.insert(
        body.email,
        Account {
            password: body.password,
            profile: profile.clone(),
        },
    );
    (StatusCode::CREATED, Json(profile)).into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Credentials>) -> Response {
    bump(&state.hits.login);
    let valid = state
        .accounts
        .lock()
        .get(&body.email)
        .is_some_and(|account| account.password == body.password);
    if !valid {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect email or password");
    }
    token_response(&state, &body.email)
}

async fn refresh(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    bump(&state.hits.refresh);
    let delay = *state.refresh_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = *state.refresh_failure.lock() {
        return detail(status, "Refresh unavailable");
    }
    if *state.refresh_garbled.lock() {
        return Json(json!({ "message": "maintenance" })).into_response();
    }

    let email = refresh_cookie(&headers).and_then(|token| state.refresh_tokens.lock().remove(&token));
    match email {
        Some(email) => token_response(&state, &email),
        None => detail(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
    }
}

async fn logout(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    bump(&state.hits.logout);
    if let Some(token) = refresh_cookie(&headers) {
        state.refresh_tokens.lock().remove(&token);
    }
    (
        [(SET_COOKIE, "refresh_token=\"\"; Max-Age=0; Path=/")],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    bump(&state.hits.me);
    match state.authenticate(&headers) {
        Ok(user) => Json(user).into_response(),
        Err(response) => response,
    }
}

async fn list_books(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    bump(&state.hits.list_books);
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    Json(state.books.lock().clone()).into_response()
}

fn find_book(state: &MockState, id: Uuid) -> Option<Value> {
    state
        .books
        .lock()
        .iter()
        .find(|book| book["id"] == json!(id))
        .cloned()
}

async fn get_book(
    State(state): State<Arc<MockState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    find_book(&state, id).map_or_else(
        || detail(StatusCode::NOT_FOUND, "Book not found"),
        |book| Json(book).into_response(),
    )
}

async fn create_book(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(mut book): Json<Value>,
) -> Response {
    bump(&state.hits.create_book);
    if let Err(response) = state.require_admin(&headers) {
        return response;
    }
    if book["title"].as_str().is_none_or(str::is_empty) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [
                { "loc": ["body", "title"], "msg": "Field required", "type": "missing" }
            ]})),
        )
            .into_response();
    }
    book["id"] = json!(Uuid::new_v4());
    state.books.lock().push(book.clone());
    (StatusCode::CREATED, Json(book)).into_response()
}

async fn delete_book(
    State(state): State<Arc<MockState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.require_admin(&headers) {
        return response;
    }
    let mut books = state.books.lock();
    let before = books.len();
    books.retain(|book| book["id"] != json!(id));
    if books.len() == before {
        return detail(StatusCode::NOT_FOUND, "Book not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_authors(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    Json(state.authors.lock().clone()).into_response()
}

async fn get_author(
    State(state): State<Arc<MockState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = state.authenticate(&headers) {
        return response;
    }
    let Some(mut author) = state
        .authors
        .lock()
        .iter()
        .find(|author| author["id"] == json!(id))
        .cloned()
    else {
        return detail(StatusCode::NOT_FOUND, "Author not found");
    };
    let books: Vec<Value> = state
        .books
        .lock()
        .iter()
        .filter(|book| book["author_id"] == json!(id))
        .cloned()
        .collect();
    author["books"] = json!(books);
    Json(author).into_response()
}

#[derive(Deserialize)]
struct OrderBody {
    book_id: Uuid,
    quantity: u32,
    total_amount: f64,
}

async fn create_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<OrderBody>,
) -> Response {
    bump(&state.hits.create_order);
    let user = match state.authenticate(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if find_book(&state, body.book_id).is_none() {
        return detail(StatusCode::NOT_FOUND, "Book not found");
    }
    if state.out_of_stock.lock().contains(&body.book_id) {
        return detail(StatusCode::BAD_REQUEST, "Book is out of stock");
    }
    let order = json!({
        "id": Uuid::new_v4(),
        "user_id": user["id"],
        "book_id": body.book_id,
        "quantity": body.quantity,
        "total_amount": body.total_amount,
        "status": "pending",
    });
    state.orders.lock().push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn list_orders(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let user = match state.authenticate(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let orders: Vec<Value> = state
        .orders
        .lock()
        .iter()
        .filter(|order| order["user_id"] == user["id"])
        .cloned()
        .collect();
    Json(orders).into_response()
}

async fn get_order(
    State(state): State<Arc<MockState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let user = match state.authenticate(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    state
        .orders
        .lock()
        .iter()
        .find(|order| order["id"] == json!(id) && order["user_id"] == user["id"])
        .cloned()
        .map_or_else(
            || detail(StatusCode::NOT_FOUND, "Order not found"),
            |order| Json(order).into_response(),
        )
}

fn router(state: Arc<MockState>) -> Router {
    let api = Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/refresh", post(refresh))
        .route("/users/logout", post(logout))
        .route("/users/me", get(me))
        .route("/books", get(list_books).post(create_book))
        .route("/books/{id}", get(get_book).delete(delete_book))
        .route("/authors", get(list_authors))
        .route("/authors/{id}", get(get_author))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order));
    Router::new().nest("/api/v1", api).with_state(state)
}

// ============================================================================
// Harness
// ============================================================================

/// A running mock API. The server stops when this is dropped.
pub struct MockApi {
    base_url: String,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockApi {
    /// Start a mock API on an ephemeral port with seeded data.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::seeded());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API");
        let addr = listener.local_addr().expect("Failed to read mock API address");
        let app = router(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}/api/v1"),
            state,
            server,
        }
    }

    /// Base URL including the `/api/v1` prefix.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url)
            .expect("Mock API URL is valid")
            .with_timeout(Duration::from_secs(10))
    }

    /// A session against this server backed by `storage`.
    #[must_use]
    pub fn session(&self, storage: Arc<dyn Storage>) -> SessionManager {
        SessionManager::new(&self.config(), storage).expect("Failed to build session")
    }

    /// Calls received so far, per endpoint.
    #[must_use]
    pub fn hits(&self) -> Hits {
        self.state.hits.snapshot()
    }

    /// Invalidate every access token issued so far, as if they had expired.
    pub fn expire_access_tokens(&self) {
        self.state.access_tokens.lock().clear();
    }

    /// Invalidate every refresh token issued so far.
    pub fn revoke_refresh_tokens(&self) {
        self.state.refresh_tokens.lock().clear();
    }

    /// Hold each refresh call for `delay` before answering.
    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.state.refresh_delay.lock() = delay;
    }

    /// Make every refresh call answer `status`, or behave normally on `None`.
    pub fn fail_refresh_with(&self, status: Option<StatusCode>) {
        *self.state.refresh_failure.lock() = status;
    }

    /// Answer refresh calls with a 200 whose body is not a token response.
    pub fn garble_refresh(&self, garbled: bool) {
        *self.state.refresh_garbled.lock() = garbled;
    }

    /// Issue access tokens that the API itself will then reject.
    pub fn issue_dead_tokens(&self, dead: bool) {
        *self.state.issue_dead_tokens.lock() = dead;
    }

    /// Reject orders for `book`.
    pub fn mark_out_of_stock(&self, book: BookId) {
        self.state.out_of_stock.lock().insert(book.as_uuid());
    }

    /// Every order placed so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.state.orders.lock().clone()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}
