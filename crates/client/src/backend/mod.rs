//! Typed wrappers over the store backend REST API.
//!
//! All calls go through the [`HttpGateway`]. Catalog reads are cached with
//! `moka` (5-minute TTL); carts, orders and identity are never cached.

mod auth;
mod cache;
mod cart;
mod catalog;
mod customers;
mod orders;
pub mod types;

use std::time::Duration;

use moka::future::Cache;
use tokio_util::sync::CancellationToken;

use crate::gateway::HttpGateway;

use cache::{CacheKey, CacheValue};

/// Client for the store backend.
///
/// Cheap to clone; clones share the gateway and the catalog cache.
#[derive(Clone)]
pub struct BackendClient {
    gateway: HttpGateway,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Wrap a gateway.
    #[must_use]
    pub fn new(gateway: HttpGateway) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self { gateway, cache }
    }

    /// A client whose requests resolve with `Cancelled` once `token` fires.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            gateway: self.gateway.with_cancellation(token),
            cache: self.cache.clone(),
        }
    }

    /// The underlying gateway.
    #[must_use]
    pub const fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    /// Drop every cached catalog entry.
    pub fn invalidate_catalog(&self) {
        self.cache.invalidate_all();
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("gateway", &self.gateway)
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

/// Decode the first element of a list response; a bare object is accepted
/// as-is.
fn first_element<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> crate::error::Result<T> {
    let item = match value {
        serde_json::Value::Array(items) => items.into_iter().next(),
        serde_json::Value::Null => None,
        other => Some(other),
    }
    .ok_or_else(|| crate::error::ClientError::Decode(format!("empty {what} response")))?;

    serde_json::from_value(item).map_err(|e| crate::error::ClientError::Decode(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::types::User;
    use super::*;

    #[test]
    fn test_first_element() {
        let user: User = first_element(
            json!([{ "id": 1, "username": "ada", "email": "ada@example.com" }, { "id": 2, "username": "bob" }]),
            "identity",
        )
        .unwrap();
        assert_eq!(user.username, "ada");

        let user: User = first_element(json!({ "id": 3, "username": "cy" }), "identity").unwrap();
        assert_eq!(user.id.as_i64(), 3);

        assert!(first_element::<User>(json!([]), "identity").is_err());
    }
}
