//! Integration test support for the Shopfront client.
//!
//! [`MockBackend`] is an in-process `axum` server that speaks the store
//! backend's REST contract closely enough to drive the client end to end:
//! JWT issuance and identity, anonymous carts, a small catalog, customers,
//! orders, and the hosted checkout endpoint. Every request is counted per
//! endpoint so tests can assert on what the client actually sent.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! No external services are needed; each test starts its own backend on an
//! ephemeral port.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use shopfront_client::storage::{KeyValueStore, MemoryStore};
use shopfront_client::{ClientConfig, StoreEvent, Storefront};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Bearer key the mock checkout endpoint accepts.
pub const CHECKOUT_KEY: &str = "test-anon-key";
/// Price id the mock checkout endpoint accepts.
pub const KNOWN_PRICE_ID: &str = "price_1RMNN6IiDKGueWGHRbcFHOzD";
/// Redirect URL returned for a successful checkout session.
pub const CHECKOUT_REDIRECT: &str = "https://checkout.example.com/c/pay/cs_test_123";

const PAGE_SIZE: usize = 10;

/// Backend endpoints, for request counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CreateToken,
    RegisterUser,
    CurrentUser,
    UpdateUser,
    CreateCart,
    GetCart,
    AddItem,
    UpdateItem,
    RemoveItem,
    Products,
    Product,
    Collections,
    Collection,
    Customer,
    Orders,
    Order,
    Checkout,
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone)]
struct MockUser {
    id: i64,
    username: String,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

impl MockUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
        })
    }
}

#[derive(Debug, Clone)]
struct MockProduct {
    id: i64,
    title: String,
    cents: i64,
    collection: i64,
}

#[derive(Debug, Clone)]
struct MockLine {
    id: i64,
    product: i64,
    quantity: i64,
}

#[derive(Debug, Clone)]
struct MockCart {
    created_at: String,
    items: Vec<MockLine>,
}

#[derive(Debug, Clone)]
struct MockOrder {
    id: i64,
    customer: i64,
    placed_at: String,
    payment_status: String,
    items: Vec<(i64, i64)>,
}

#[derive(Debug, Default)]
struct MockState {
    users: Vec<MockUser>,
    /// access token -> (user id, exp)
    tokens: HashMap<String, (i64, i64)>,
    token_ttl_secs: i64,
    carts: HashMap<String, MockCart>,
    products: Vec<MockProduct>,
    orders: Vec<MockOrder>,
    /// user id -> (phone, birth date, membership)
    customers: HashMap<i64, (String, Option<String>, String)>,
    next_id: i64,
    hits: HashMap<Endpoint, usize>,
    failures: HashMap<Endpoint, u16>,
    cart_delays: VecDeque<Duration>,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn cart_json(&self, id: &str, cart: &MockCart) -> Value {
        let mut total = 0;
        let items: Vec<Value> = cart
            .items
            .iter()
            .filter_map(|line| {
                let product = self.products.iter().find(|p| p.id == line.product)?;
                let line_total = product.cents * line.quantity;
                total += line_total;
                Some(json!({
                    "id": line.id,
                    "product": {
                        "id": product.id,
                        "title": product.title,
                        // Numeric on purpose: the real backend mixes both.
                        "unit_price": cents_number(product.cents),
                    },
                    "quantity": line.quantity,
                    "total_price": cents_string(line_total),
                }))
            })
            .collect();

        json!({
            "id": id,
            "items": items,
            "total_price": cents_string(total),
            "created_at": cart.created_at,
        })
    }

    fn product_json(product: &MockProduct) -> Value {
        json!({
            "id": product.id,
            "title": product.title,
            "description": format!("A fine {}", product.title.to_lowercase()),
            "slug": product.title.to_lowercase().replace(' ', "-"),
            "inventory": 25,
            "unit_price": cents_string(product.cents),
            "price_with_tax": cents_string(product.cents * 118 / 100),
            "collection": product.collection,
            "images": [{ "id": product.id * 10, "image": format!("/media/store/images/{}.jpg", product.id) }],
        })
    }

    fn order_json(&self, order: &MockOrder) -> Value {
        let items: Vec<Value> = order
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, (product, quantity))| {
                let product = self.products.iter().find(|p| p.id == *product)?;
                Some(json!({
                    "id": index + 1,
                    "product": { "id": product.id, "title": product.title, "unit_price": cents_string(product.cents) },
                    "unit_price": cents_string(product.cents),
                    "quantity": quantity,
                }))
            })
            .collect();
        json!({
            "id": order.id,
            "customer": order.customer,
            "placed_at": order.placed_at,
            "payment_status": order.payment_status,
            "items": items,
        })
    }
}

fn cents_string(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[allow(clippy::cast_precision_loss)]
fn cents_number(cents: i64) -> Value {
    json!(cents as f64 / 100.0)
}

fn mint_token(user_id: i64, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "token_type": "access",
            "exp": exp,
            "jti": uuid::Uuid::new_v4().simple().to_string(),
            "user_id": user_id,
        })
        .to_string(),
    );
    format!("{header}.{payload}.mock-signature")
}

// =============================================================================
// MockBackend
// =============================================================================

#[derive(Clone)]
struct Shared(Arc<Mutex<MockState>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().expect("mock state poisoned")
    }

    /// Count the request and apply an injected failure, if any.
    fn enter(&self, endpoint: Endpoint) -> Result<(), Response> {
        let mut state = self.lock();
        *state.hits.entry(endpoint).or_default() += 1;
        match state.failures.remove(&endpoint) {
            Some(status) => Err(error(status, json!({ "detail": "Injected failure." }))),
            None => Ok(()),
        }
    }

    /// DRF-style authentication: a missing header is anonymous, a bad one
    /// is rejected outright.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<i64>, Response> {
        let Some(value) = headers.get("authorization") else {
            return Ok(None);
        };
        let value = value.to_str().unwrap_or_default();
        let Some(("JWT", token)) = value.split_once(' ') else {
            return Err(not_authenticated());
        };
        match self.lock().tokens.get(token) {
            Some((user_id, exp)) if *exp > Utc::now().timestamp() => Ok(Some(*user_id)),
            _ => Err(error(
                401,
                json!({ "detail": "Given token not valid for any token type", "code": "token_not_valid" }),
            )),
        }
    }

    fn require_user(&self, headers: &HeaderMap) -> Result<i64, Response> {
        self.authenticate(headers)?.ok_or_else(not_authenticated)
    }
}

fn error(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

fn not_authenticated() -> Response {
    error(
        401,
        json!({ "detail": "Authentication credentials were not provided." }),
    )
}

fn not_found() -> Response {
    error(404, json!({ "detail": "Not found." }))
}

/// An in-process store backend bound to an ephemeral port.
pub struct MockBackend {
    addr: SocketAddr,
    shared: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend seeded with a small catalog and no users.
    pub async fn start() -> Self {
        let mut state = MockState {
            token_ttl_secs: 300,
            next_id: 100,
            ..MockState::default()
        };
        state.products = vec![
            MockProduct { id: 42, title: "Coffee Mug".into(), cents: 1250, collection: 3 },
            MockProduct { id: 43, title: "Tea Kettle".into(), cents: 3999, collection: 3 },
            MockProduct { id: 44, title: "Bread Knife".into(), cents: 1999, collection: 4 },
        ];
        let shared = Shared(Arc::new(Mutex::new(state)));

        let app = Router::new()
            .route("/auth/jwt/create/", post(create_token))
            .route("/auth/users/", post(register_user))
            .route("/auth/users/me/", get(current_user).patch(update_user))
            .route("/store/carts/", post(create_cart))
            .route("/store/carts/{cart_id}/", get(get_cart))
            .route("/store/carts/{cart_id}/items/", post(add_item))
            .route(
                "/store/carts/{cart_id}/items/{item_id}/",
                patch(update_item).delete(remove_item),
            )
            .route("/store/products/", get(list_products))
            .route("/store/products/{product_id}/", get(get_product))
            .route("/store/collections/", get(list_collections))
            .route("/store/collections/{collection_id}/", get(get_collection))
            .route("/store/customers/", post(create_customer))
            .route("/store/customers/me/", get(current_customer).patch(update_customer))
            .route("/store/orders/", get(list_orders).post(create_order))
            .route("/store/orders/{order_id}/", get(get_order).patch(update_order))
            .route("/functions/v1/stripe-checkout", post(create_checkout_session))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend crashed");
        });

        Self {
            addr,
            shared,
            server,
        }
    }

    /// Base URL of the backend, with a trailing slash.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client configuration pointed at this backend, checkout included.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let base = self.url();
        ClientConfig::from_lookup(|key| match key {
            "SHOPFRONT_BACKEND_URL" => Some(base.clone()),
            "SHOPFRONT_REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
            "SHOPFRONT_CHECKOUT_URL" => Some(format!("{base}functions/v1/stripe-checkout")),
            "SHOPFRONT_CHECKOUT_KEY" => Some(CHECKOUT_KEY.to_string()),
            "SHOPFRONT_SITE_URL" => Some("https://shop.example.com".to_string()),
            _ => None,
        })
        .expect("mock backend config")
    }

    /// Fresh in-memory client storage.
    #[must_use]
    pub fn storage() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    /// A client wired to this backend over fresh in-memory storage.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        self.storefront_with(Self::storage())
    }

    /// A client wired to this backend over `storage`.
    #[must_use]
    pub fn storefront_with(&self, storage: Arc<dyn KeyValueStore>) -> Storefront {
        Storefront::new(self.config(), storage).expect("storefront")
    }

    /// Register a user directly, returning its id.
    #[must_use]
    pub fn add_user(&self, username: &str, password: &str) -> i64 {
        let mut state = self.shared.lock();
        let id = state.next_id();
        state.users.push(MockUser {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: password.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        });
        id
    }

    /// Number of requests received by `endpoint`.
    #[must_use]
    pub fn hits(&self, endpoint: Endpoint) -> usize {
        self.shared.lock().hits.get(&endpoint).copied().unwrap_or(0)
    }

    /// Total number of requests received.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.shared.lock().hits.values().sum()
    }

    /// Make the next request to `endpoint` fail with `status`.
    pub fn fail_next(&self, endpoint: Endpoint, status: u16) {
        self.shared.lock().failures.insert(endpoint, status);
    }

    /// Delete a cart server-side, as if it had expired.
    pub fn delete_cart(&self, cart_id: &str) {
        self.shared.lock().carts.remove(cart_id);
    }

    /// Identifiers of every live cart.
    #[must_use]
    pub fn cart_ids(&self) -> Vec<String> {
        self.shared.lock().carts.keys().cloned().collect()
    }

    /// Invalidate every issued access token.
    pub fn revoke_tokens(&self) {
        self.shared.lock().tokens.clear();
    }

    /// Lifetime of tokens issued from now on; negative values issue
    /// already-expired tokens.
    pub fn set_token_ttl(&self, secs: i64) {
        self.shared.lock().token_ttl_secs = secs;
    }

    /// Issue a token for `user_id` directly.
    #[must_use]
    pub fn issue_token(&self, user_id: i64) -> String {
        let mut state = self.shared.lock();
        let exp = Utc::now().timestamp() + state.token_ttl_secs;
        let token = mint_token(user_id, exp);
        state.tokens.insert(token.clone(), (user_id, exp));
        token
    }

    /// Delay upcoming cart fetches. The response body is captured before
    /// the delay, so a delayed response carries the state at request time.
    pub fn delay_cart_fetches(&self, delays: impl IntoIterator<Item = Duration>) {
        self.shared.lock().cart_delays.extend(delays);
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Event Helpers
// =============================================================================

/// Wait up to two seconds for an event matching `matches`, skipping others.
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<StoreEvent>,
    mut matches: impl FnMut(&StoreEvent) -> bool,
) -> StoreEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Every event already buffered on `rx`.
pub fn drain_events(rx: &mut broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

// =============================================================================
// Auth Handlers
// =============================================================================

#[derive(Deserialize)]
struct TokenRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn create_token(State(shared): State<Shared>, Json(body): Json<TokenRequest>) -> Response {
    if let Err(response) = shared.enter(Endpoint::CreateToken) {
        return response;
    }
    let mut state = shared.lock();
    let Some(user_id) = state
        .users
        .iter()
        .find(|u| u.username == body.username && u.password == body.password)
        .map(|u| u.id)
    else {
        return error(
            401,
            json!({ "detail": "No active account found with the given credentials" }),
        );
    };
    let exp = Utc::now().timestamp() + state.token_ttl_secs;
    let access = mint_token(user_id, exp);
    state.tokens.insert(access.clone(), (user_id, exp));
    Json(json!({ "access": access, "refresh": mint_token(user_id, exp + 86_400) })).into_response()
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

async fn register_user(
    State(shared): State<Shared>,
    Json(body): Json<RegisterRequest>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::RegisterUser) {
        return response;
    }
    let mut state = shared.lock();
    let mut errors = serde_json::Map::new();
    if state.users.iter().any(|u| u.username == body.username) {
        errors.insert(
            "username".into(),
            json!(["A user with that username already exists."]),
        );
    }
    if body.password.len() < 8 {
        errors.insert(
            "password".into(),
            json!(["This password is too short. It must contain at least 8 characters."]),
        );
    }
    if !errors.is_empty() {
        return error(400, Value::Object(errors));
    }

    let id = state.next_id();
    let user = MockUser {
        id,
        username: body.username,
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
    };
    let response = (StatusCode::CREATED, Json(user.to_json())).into_response();
    state.users.push(user);
    response
}

async fn current_user(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = shared.enter(Endpoint::CurrentUser) {
        return response;
    }
    let user_id = match shared.require_user(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let state = shared.lock();
    let users: Vec<Value> = state
        .users
        .iter()
        .filter(|u| u.id == user_id)
        .map(MockUser::to_json)
        .collect();
    Json(Value::Array(users)).into_response()
}

async fn update_user(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::UpdateUser) {
        return response;
    }
    let user_id = match shared.require_user(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = shared.lock();
    let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) else {
        return not_found();
    };
    let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
    if let Some(email) = text("email") {
        user.email = email;
    }
    if let Some(first_name) = text("first_name") {
        user.first_name = first_name;
    }
    if let Some(last_name) = text("last_name") {
        user.last_name = last_name;
    }
    Json(user.to_json()).into_response()
}

// =============================================================================
// Cart Handlers
// =============================================================================

async fn create_cart(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = shared.enter(Endpoint::CreateCart) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let mut state = shared.lock();
    let id = uuid::Uuid::new_v4().to_string();
    let cart = MockCart {
        created_at: Utc::now().to_rfc3339(),
        items: Vec::new(),
    };
    let body = state.cart_json(&id, &cart);
    state.carts.insert(id, cart);
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_cart(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::GetCart) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let (body, delay) = {
        let mut state = shared.lock();
        let delay = state.cart_delays.pop_front();
        let body = state
            .carts
            .get(&cart_id)
            .map(|cart| state.cart_json(&cart_id, cart));
        (body, delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    body.map_or_else(not_found, |body| Json(body).into_response())
}

#[derive(Deserialize)]
struct AddItemRequest {
    product: i64,
    quantity: i64,
}

async fn add_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Json(body): Json<AddItemRequest>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::AddItem) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    if body.quantity < 1 {
        return error(
            400,
            json!({ "quantity": ["Ensure this value is greater than or equal to 1."] }),
        );
    }
    let mut state = shared.lock();
    if !state.products.iter().any(|p| p.id == body.product) {
        return error(
            400,
            json!({ "product": ["No product with the given ID was found."] }),
        );
    }
    let line_id = state.next_id();
    let Some(cart) = state.carts.get_mut(&cart_id) else {
        return not_found();
    };
    let line = if let Some(line) = cart.items.iter_mut().find(|l| l.product == body.product) {
        line.quantity += body.quantity;
        line.clone()
    } else {
        let line = MockLine {
            id: line_id,
            product: body.product,
            quantity: body.quantity,
        };
        cart.items.push(line.clone());
        line
    };
    (
        StatusCode::CREATED,
        Json(json!({ "id": line.id, "product_id": line.product, "quantity": line.quantity })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct UpdateItemRequest {
    quantity: i64,
}

async fn update_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path((cart_id, item_id)): Path<(String, i64)>,
    Json(body): Json<UpdateItemRequest>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::UpdateItem) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let mut state = shared.lock();
    let Some(line) = state
        .carts
        .get_mut(&cart_id)
        .and_then(|cart| cart.items.iter_mut().find(|l| l.id == item_id))
    else {
        return not_found();
    };
    line.quantity = body.quantity;
    Json(json!({ "quantity": line.quantity })).into_response()
}

async fn remove_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path((cart_id, item_id)): Path<(String, i64)>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::RemoveItem) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let mut state = shared.lock();
    let Some(cart) = state.carts.get_mut(&cart_id) else {
        return not_found();
    };
    let before = cart.items.len();
    cart.items.retain(|l| l.id != item_id);
    if cart.items.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// Catalog Handlers
// =============================================================================

async fn list_products(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Products) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let state = shared.lock();
    let search = params.get("search").map(|s| s.to_lowercase());
    let collection = params
        .get("collection_id")
        .and_then(|c| c.parse::<i64>().ok());
    let mut products: Vec<&MockProduct> = state
        .products
        .iter()
        .filter(|p| {
            search
                .as_deref()
                .is_none_or(|s| p.title.to_lowercase().contains(s))
        })
        .filter(|p| collection.is_none_or(|c| p.collection == c))
        .collect();
    match params.get("ordering").map(String::as_str) {
        Some("unit_price") => products.sort_by_key(|p| p.cents),
        Some("-unit_price") => products.sort_by_key(|p| std::cmp::Reverse(p.cents)),
        _ => {}
    }

    let page = params
        .get("page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let count = products.len();
    let results: Vec<Value> = products
        .iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|p| MockState::product_json(p))
        .collect();
    if results.is_empty() && page > 1 {
        return error(404, json!({ "detail": "Invalid page." }));
    }
    Json(json!({
        "count": count,
        "next": (page * PAGE_SIZE < count).then(|| format!("/store/products/?page={}", page + 1)),
        "previous": (page > 1).then(|| format!("/store/products/?page={}", page - 1)),
        "results": results,
    }))
    .into_response()
}

async fn get_product(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Product) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let state = shared.lock();
    state
        .products
        .iter()
        .find(|p| p.id == product_id)
        .map_or_else(not_found, |p| Json(MockState::product_json(p)).into_response())
}

fn collection_json(state: &MockState, id: i64) -> Option<Value> {
    let title = match id {
        3 => "Kitchen",
        4 => "Cutlery",
        _ => return None,
    };
    let members: Vec<&MockProduct> = state.products.iter().filter(|p| p.collection == id).collect();
    Some(json!({
        "id": id,
        "title": title,
        "product_count": members.len(),
        "featured_product": members.first().map(|p| p.id),
    }))
}

async fn list_collections(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = shared.enter(Endpoint::Collections) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let state = shared.lock();
    let collections: Vec<Value> = [3, 4]
        .into_iter()
        .filter_map(|id| collection_json(&state, id))
        .collect();
    Json(Value::Array(collections)).into_response()
}

async fn get_collection(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(collection_id): Path<i64>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Collection) {
        return response;
    }
    if let Err(response) = shared.authenticate(&headers) {
        return response;
    }
    let state = shared.lock();
    collection_json(&state, collection_id).map_or_else(not_found, |c| Json(c).into_response())
}

// =============================================================================
// Customer & Order Handlers
// =============================================================================

fn customer_json(user_id: i64, profile: &(String, Option<String>, String)) -> Value {
    json!({
        "id": user_id + 1000,
        "user_id": user_id,
        "phone_number": profile.0,
        "birth_date": profile.1,
        "membership": profile.2,
    })
}

fn apply_customer_fields(profile: &mut (String, Option<String>, String), body: &Value) {
    if let Some(phone) = body.get("phone_number").and_then(Value::as_str) {
        phone.clone_into(&mut profile.0);
    }
    if let Some(birth_date) = body.get("birth_date").and_then(Value::as_str) {
        profile.1 = Some(birth_date.to_string());
    }
    if let Some(membership) = body.get("membership").and_then(Value::as_str) {
        membership.clone_into(&mut profile.2);
    }
}

async fn current_customer(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = shared.enter(Endpoint::Customer) {
        return response;
    }
    let user_id = match shared.require_user(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let state = shared.lock();
    let customers: Vec<Value> = state
        .customers
        .get(&user_id)
        .map(|profile| customer_json(user_id, profile))
        .into_iter()
        .collect();
    Json(Value::Array(customers)).into_response()
}

async fn update_customer(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Customer) {
        return response;
    }
    let user_id = match shared.require_user(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = shared.lock();
    let Some(profile) = state.customers.get_mut(&user_id) else {
        return not_found();
    };
    apply_customer_fields(profile, &body);
    Json(customer_json(user_id, profile)).into_response()
}

async fn create_customer(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Customer) {
        return response;
    }
    let user_id = match shared.require_user(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = shared.lock();
    let profile = state
        .customers
        .entry(user_id)
        .or_insert_with(|| (String::new(), None, "B".to_string()));
    apply_customer_fields(profile, &body);
    (StatusCode::CREATED, Json(customer_json(user_id, profile))).into_response()
}

async fn list_orders(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = shared.enter(Endpoint::Orders) {
        return response;
    }
    let user_id = match shared.require_user(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let state = shared.lock();
    let orders: Vec<Value> = state
        .orders
        .iter()
        .filter(|o| o.customer == user_id + 1000)
        .map(|o| state.order_json(o))
        .collect();
    Json(Value::Array(orders)).into_response()
}

#[derive(Deserialize)]
struct CreateOrderRequest {
    cart_id: String,
}

async fn create_order(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Orders) {
        return response;
    }
    let user_id = match shared.require_user(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut state = shared.lock();
    let Some(cart) = state.carts.get(&body.cart_id) else {
        return error(
            400,
            json!({ "cart_id": ["No cart with the given ID was found."] }),
        );
    };
    if cart.items.is_empty() {
        return error(400, json!({ "cart_id": ["The cart is empty."] }));
    }
    let items = cart.items.iter().map(|l| (l.product, l.quantity)).collect();
    state.carts.remove(&body.cart_id);
    let order = MockOrder {
        id: state.next_id(),
        customer: user_id + 1000,
        placed_at: Utc::now().to_rfc3339(),
        payment_status: "P".to_string(),
        items,
    };
    let body = state.order_json(&order);
    state.orders.push(order);
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_order(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Order) {
        return response;
    }
    if let Err(response) = shared.require_user(&headers) {
        return response;
    }
    let state = shared.lock();
    state
        .orders
        .iter()
        .find(|o| o.id == order_id)
        .map_or_else(not_found, |o| Json(state.order_json(o)).into_response())
}

async fn update_order(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Order) {
        return response;
    }
    if let Err(response) = shared.require_user(&headers) {
        return response;
    }
    let mut state = shared.lock();
    let Some(status) = body
        .get("payment_status")
        .and_then(Value::as_str)
        .filter(|s| matches!(*s, "P" | "C" | "F"))
    else {
        return error(400, json!({ "payment_status": ["Invalid choice."] }));
    };
    let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) else {
        return not_found();
    };
    status.clone_into(&mut order.payment_status);
    let order = order.clone();
    Json(state.order_json(&order)).into_response()
}

// =============================================================================
// Checkout Handler
// =============================================================================

async fn create_checkout_session(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = shared.enter(Endpoint::Checkout) {
        return response;
    }
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {CHECKOUT_KEY}"));
    if !authorized {
        return error(401, json!({ "error": "Invalid API key" }));
    }
    if body.get("price_id").and_then(Value::as_str) != Some(KNOWN_PRICE_ID) {
        return error(400, json!({ "error": "No such price" }));
    }
    for field in ["success_url", "cancel_url", "mode"] {
        if body.get(field).and_then(Value::as_str).is_none() {
            return error(400, json!({ "error": format!("Missing {field}") }));
        }
    }
    Json(json!({ "sessionId": "cs_test_123", "url": CHECKOUT_REDIRECT })).into_response()
}
