//! Application container.
//!
//! [`Storefront`] owns every stateful component for the lifetime of the
//! client and wires them together: one token store and event bus, one
//! gateway, and the session and cart owners built on top.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use url::Url;

use crate::backend::BackendClient;
use crate::cart::{CartIdentityResolver, CartSynchronizer};
use crate::checkout::{self, CheckoutClient, OrderEstimate};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{EventBus, Route, StoreEvent};
use crate::gateway::HttpGateway;
use crate::media;
use crate::session::SessionManager;
use crate::storage::KeyValueStore;
use crate::token::TokenStore;

/// Result of asking to start hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// No session; the shell was asked to show the login view.
    LoginRequired,
    /// The user should be sent to this processor URL.
    Redirect(Url),
}

/// Shared client state.
///
/// Cheaply cloneable via `Arc`. Dropping the last clone stops the session
/// invalidation listener.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    events: EventBus,
    backend: BackendClient,
    session: SessionManager,
    cart: CartSynchronizer,
    checkout: Option<CheckoutClient>,
    shutdown: CancellationToken,
}

impl Storefront {
    /// Wire up all components over `storage`.
    ///
    /// Must be called from within a Tokio runtime: the session invalidation
    /// listener is spawned immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let events = EventBus::default();
        let tokens = TokenStore::new(Arc::clone(&storage));
        let gateway = HttpGateway::new(&config, tokens.clone(), events.clone())?;
        let backend = BackendClient::new(gateway);

        let session = SessionManager::new(backend.clone(), tokens, events.clone());
        let identity = CartIdentityResolver::new(backend.clone(), storage);
        let cart = CartSynchronizer::new(backend.clone(), identity, events.clone());
        let checkout = CheckoutClient::from_config(&config)?;

        let shutdown = CancellationToken::new();
        // Detached; stopped through `shutdown`.
        drop(session.spawn_invalidation_listener(shutdown.clone()));

        info!(
            backend_url = %config.backend_url,
            checkout_enabled = checkout.is_some(),
            "Storefront client ready"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                events,
                backend,
                session,
                cart,
                checkout,
                shutdown,
            }),
        })
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Event bus; subscribe to render navigation and notifications.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Typed backend API.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Session owner.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Cart owner.
    #[must_use]
    pub fn cart(&self) -> &CartSynchronizer {
        &self.inner.cart
    }

    /// Hosted checkout client, if configured.
    #[must_use]
    pub fn checkout(&self) -> Option<&CheckoutClient> {
        self.inner.checkout.as_ref()
    }

    /// Absolute URL for a backend media path.
    #[must_use]
    pub fn media_url(&self, path: Option<&str>) -> String {
        media::media_url(&self.inner.config.backend_url, path)
    }

    /// Display totals for the loaded cart.
    pub async fn order_estimate(&self) -> Option<OrderEstimate> {
        self.inner
            .cart
            .snapshot()
            .await
            .map(|cart| OrderEstimate::for_subtotal(cart.total_price))
    }

    /// Start hosted checkout for a registry product.
    ///
    /// Without a confirmed session this publishes `Navigate(Login)` and
    /// returns [`CheckoutOutcome::LoginRequired`]. On success a `Redirect`
    /// event is published as well as returned.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::CheckoutDisabled` when checkout is not
    /// configured, `ClientError::Validation` for an unknown product, or the
    /// session-creation failure (also published as a notification).
    #[instrument(skip(self))]
    pub async fn begin_checkout(&self, product_key: &str) -> Result<CheckoutOutcome> {
        if !self.inner.session.is_authenticated()
            || self.inner.session.current_user().await.is_none()
        {
            info!("Checkout requires login");
            self.inner.events.navigate(Route::Login);
            return Ok(CheckoutOutcome::LoginRequired);
        }

        let client = self.checkout().ok_or(ClientError::CheckoutDisabled)?;
        let product = checkout::product(product_key).ok_or_else(|| {
            ClientError::Validation(format!("Unknown checkout product: {product_key}"))
        })?;

        match client.start(product).await {
            Ok(url) => {
                self.inner.events.publish(StoreEvent::Redirect(url.clone()));
                Ok(CheckoutOutcome::Redirect(url))
            }
            Err(e) => {
                warn!(error = %e, "Failed to start checkout");
                let message = match &e {
                    ClientError::Checkout(message) => message.clone(),
                    other => other.user_message("Failed to start checkout process"),
                };
                self.inner.events.notify_error(message);
                Err(e)
            }
        }
    }

    /// Stop background tasks. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

impl Drop for StorefrontInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}
