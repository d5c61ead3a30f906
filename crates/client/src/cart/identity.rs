//! Persisted cart identifier.

use std::sync::Arc;

use shopfront_core::CartId;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::backend::BackendClient;
use crate::error::Result;
use crate::storage::{KeyValueStore, StorageError, keys};

/// Resolves the identifier of this client's server-side cart.
///
/// The stored identifier is trusted without re-validation. Creation is
/// serialized so concurrent callers on an empty store issue at most one
/// `POST /store/carts/`.
#[derive(Clone)]
pub struct CartIdentityResolver {
    inner: Arc<IdentityInner>,
}

struct IdentityInner {
    backend: BackendClient,
    storage: Arc<dyn KeyValueStore>,
    creating: Mutex<()>,
}

impl CartIdentityResolver {
    /// Create a resolver over durable storage.
    #[must_use]
    pub fn new(backend: BackendClient, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(IdentityInner {
                backend,
                storage,
                creating: Mutex::new(()),
            }),
        }
    }

    /// The stored identifier, if any. No backend call.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn current(&self) -> std::result::Result<Option<CartId>, StorageError> {
        Ok(self
            .inner
            .storage
            .get(keys::CART_ID)?
            .filter(|id| !id.trim().is_empty())
            .map(CartId::new))
    }

    /// The stored identifier, creating and persisting a new cart if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the backend refuses to create a
    /// cart.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<CartId> {
        if let Some(id) = self.current()? {
            return Ok(id);
        }

        let _creating = self.inner.creating.lock().await;
        // Another caller may have created the cart while we waited.
        if let Some(id) = self.current()? {
            debug!(cart_id = %id, "Cart created by concurrent caller");
            return Ok(id);
        }

        self.create_locked().await
    }

    /// Forget the stored identifier. No backend call.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn discard(&self) -> std::result::Result<(), StorageError> {
        self.inner.storage.remove(keys::CART_ID)
    }

    /// Replace `stale` with a fresh cart.
    ///
    /// Only the caller that still sees `stale` in storage creates a cart;
    /// any other caller gets the identifier that replaced it.
    ///
    /// # Errors
    ///
    /// Same as [`CartIdentityResolver::resolve`].
    #[instrument(skip(self), fields(stale = %stale))]
    pub async fn replace(&self, stale: &CartId) -> Result<CartId> {
        let _creating = self.inner.creating.lock().await;
        if let Some(id) = self.current()?.filter(|id| id != stale) {
            debug!(cart_id = %id, "Cart already replaced by concurrent caller");
            return Ok(id);
        }

        self.discard()?;
        self.create_locked().await
    }

    /// Create and persist a cart. Callers hold `creating`.
    async fn create_locked(&self) -> Result<CartId> {
        let cart = self.inner.backend.create_cart().await?;
        self.inner.storage.set(keys::CART_ID, cart.id.as_str())?;
        info!(cart_id = %cart.id, "Created cart");
        Ok(cart.id)
    }
}

impl std::fmt::Debug for CartIdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartIdentityResolver")
            .field("cart_id", &self.current().ok().flatten())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::events::EventBus;
    use crate::gateway::HttpGateway;
    use crate::storage::MemoryStore;
    use crate::token::TokenStore;

    fn resolver(storage: Arc<dyn KeyValueStore>) -> CartIdentityResolver {
        // Port 9 on loopback: any request made would fail to connect.
        let config = ClientConfig::for_backend("http://127.0.0.1:9").unwrap();
        let gateway = HttpGateway::new(
            &config,
            TokenStore::new(Arc::new(MemoryStore::new())),
            EventBus::default(),
        )
        .unwrap();
        CartIdentityResolver::new(BackendClient::new(gateway), storage)
    }

    #[tokio::test]
    async fn test_stored_id_is_trusted_without_request() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(keys::CART_ID, "cart-1").unwrap();

        let resolver = resolver(storage);
        assert_eq!(resolver.resolve().await.unwrap().as_str(), "cart-1");
        assert_eq!(resolver.resolve().await.unwrap().as_str(), "cart-1");
    }

    #[tokio::test]
    async fn test_discard_is_local() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(keys::CART_ID, "cart-1").unwrap();

        let resolver = resolver(Arc::clone(&storage));
        resolver.discard().unwrap();
        resolver.discard().unwrap();
        assert!(resolver.current().unwrap().is_none());
        assert!(storage.get(keys::CART_ID).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_keeps_newer_id() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(keys::CART_ID, "cart-2").unwrap();

        // A creation request would fail against port 9.
        let resolver = resolver(Arc::clone(&storage));
        let id = resolver.replace(&CartId::new("cart-1")).await.unwrap();
        assert_eq!(id.as_str(), "cart-2");
        assert_eq!(storage.get(keys::CART_ID).unwrap().as_deref(), Some("cart-2"));
    }

    #[tokio::test]
    async fn test_blank_id_counts_as_absent() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(keys::CART_ID, "  ").unwrap();
        assert!(resolver(storage).current().unwrap().is_none());
    }
}
