//! Wire types for the store backend REST API.
//!
//! Field names follow the backend's JSON exactly. Prices decode from either
//! JSON strings or numbers via [`Price`].

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use shopfront_core::{
    CartId, CartItemId, CollectionId, CustomerId, Email, ImageId, Membership, OrderId,
    OrderItemId, PaymentStatus, Price, ProductId, UserId,
};

// =============================================================================
// Auth Types
// =============================================================================

/// The authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Credential pair returned by `POST /auth/jwt/create/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Login form input.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

impl Credentials {
    /// Bundle a username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Registration form input.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub username: String,
    pub email: Email,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl RegisterData {
    /// Login credentials for the account being registered.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Partial update of the current user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A product image; `image` is a media path or absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub image: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub inventory: i64,
    pub unit_price: Price,
    #[serde(default)]
    pub price_with_tax: Option<Price>,
    #[serde(default)]
    pub collection: Option<CollectionId>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

/// A product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    #[serde(default)]
    pub product_count: u32,
    #[serde(default)]
    pub featured_product: Option<ProductId>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Normalize an arbitrary listing response.
    ///
    /// A bare array becomes a single page. Missing or malformed pagination
    /// fields fall back to empty values; entries that fail to decode are
    /// skipped.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                let results = decode_entries(items);
                Self {
                    count: results.len() as u64,
                    results,
                    ..Self::default()
                }
            }
            serde_json::Value::Object(mut map) => {
                let results = match map.remove("results") {
                    Some(serde_json::Value::Array(items)) => decode_entries(items),
                    _ => Vec::new(),
                };
                let text = |v: Option<&serde_json::Value>| {
                    v.and_then(serde_json::Value::as_str).map(str::to_string)
                };
                Self {
                    count: map
                        .get("count")
                        .and_then(serde_json::Value::as_u64)
                        .unwrap_or(0),
                    next: text(map.get("next")),
                    previous: text(map.get("previous")),
                    results,
                }
            }
            _ => Self::default(),
        }
    }
}

fn decode_entries<T: DeserializeOwned>(items: Vec<serde_json::Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| {
            serde_json::from_value(item)
                .inspect_err(|e| tracing::warn!(error = %e, "Skipping malformed listing entry"))
                .ok()
        })
        .collect()
}

/// Filters for the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub collection_id: Option<CollectionId>,
}

impl ProductQuery {
    /// Query-string pairs; empty filters are omitted.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.unwrap_or(1).max(1).to_string())];
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.trim().to_string()));
        }
        if let Some(ordering) = self.ordering.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("ordering", ordering.to_string()));
        }
        if let Some(collection) = self.collection_id {
            pairs.push(("collection_id", collection.to_string()));
        }
        pairs
    }

    /// Whether this is a free-text search (search results are not cached).
    #[must_use]
    pub fn is_search(&self) -> bool {
        self.search.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// The product fields embedded in cart and order lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub unit_price: Price,
}

/// A cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: ProductSummary,
    pub quantity: u32,
    pub total_price: Price,
}

/// A server-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_price: Price,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Sum of line quantities.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Line for `product`, if present.
    #[must_use]
    pub fn line_for(&self, product: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == product)
    }
}

/// Body of `POST /store/carts/{id}/items/`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AddToCart {
    pub product: ProductId,
    pub quantity: u32,
}

/// Body of `PATCH /store/carts/{id}/items/{item}/`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateCartItem {
    pub quantity: u32,
}

// =============================================================================
// Customer & Order Types
// =============================================================================

/// The storefront customer profile attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    pub membership: Membership,
}

/// Partial update or creation payload for a customer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<Membership>,
}

/// An order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product: ProductSummary,
    pub unit_price: Price,
    pub quantity: u32,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: CustomerId,
    #[serde(alias = "Order_placed_at", default)]
    pub placed_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Sum of `unit_price * quantity` over the order lines.
    #[must_use]
    pub fn total(&self) -> Price {
        let sum = self
            .items
            .iter()
            .map(|item| item.unit_price.amount() * rust_decimal::Decimal::from(item.quantity))
            .sum();
        Price::new(sum).unwrap_or(Price::ZERO)
    }
}

/// Body of `POST /store/orders/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrder {
    pub cart_id: CartId,
}

/// Body of `PATCH /store/orders/{id}/`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateOrderStatus {
    pub payment_status: PaymentStatus,
}
