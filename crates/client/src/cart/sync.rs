//! Cart snapshot synchronization.
//!
//! The snapshot is replaced wholesale after every successful write; the
//! client never computes totals itself. Each refresh draws a sequence
//! number, and a response is applied only if it is newer than the last
//! applied one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use shopfront_core::{CartItemId, ProductId};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::CartIdentityResolver;
use crate::backend::BackendClient;
use crate::backend::types::Cart;
use crate::error::{ClientError, Result};
use crate::events::EventBus;

const LOAD_FAILED: &str =
    "Failed to load cart. Please check your internet connection and try again.";
const ITEM_ADDED: &str = "Item added to cart!";
const ADD_FAILED: &str = "Failed to add item to cart. Please try again.";
const UPDATE_FAILED: &str = "Failed to update item. Please try again.";
const ITEM_REMOVED: &str = "Item removed from cart";
const REMOVE_FAILED: &str = "Failed to remove item. Please try again.";

/// Outcome of a guarded cart write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMutation {
    /// The write was sent and the snapshot refreshed.
    Applied,
    /// The write was skipped without contacting the backend.
    Ignored,
}

/// Snapshot plus the bookkeeping that orders refresh responses.
#[derive(Debug, Default)]
struct CartState {
    snapshot: Option<Cart>,
    applied_seq: u64,
    error: Option<String>,
}

impl CartState {
    /// Apply a refresh response. Returns `false` if a newer one already won.
    fn apply(&mut self, seq: u64, cart: Cart) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.snapshot = Some(cart);
        self.applied_seq = seq;
        self.error = None;
        true
    }

    /// Record a refresh failure unless a newer response already landed.
    fn fail(&mut self, seq: u64, message: String) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.error = Some(message);
        true
    }
}

/// Owner of the cart snapshot.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartSynchronizer {
    inner: Arc<CartInner>,
}

struct CartInner {
    backend: BackendClient,
    identity: CartIdentityResolver,
    events: EventBus,
    state: RwLock<CartState>,
    next_seq: AtomicU64,
    in_flight: AtomicUsize,
    updating: AtomicBool,
}

impl CartSynchronizer {
    /// Create a synchronizer with no snapshot loaded.
    #[must_use]
    pub fn new(backend: BackendClient, identity: CartIdentityResolver, events: EventBus) -> Self {
        Self {
            inner: Arc::new(CartInner {
                backend,
                identity,
                events,
                state: RwLock::new(CartState::default()),
                next_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                updating: AtomicBool::new(false),
            }),
        }
    }

    /// The identifier resolver this synchronizer writes through.
    #[must_use]
    pub fn identity(&self) -> &CartIdentityResolver {
        &self.inner.identity
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Last applied snapshot.
    pub async fn snapshot(&self) -> Option<Cart> {
        self.inner.state.read().await.snapshot.clone()
    }

    /// Message of the last refresh failure, cleared by the next success.
    pub async fn error(&self) -> Option<String> {
        self.inner.state.read().await.error.clone()
    }

    /// Sum of line quantities in the current snapshot.
    pub async fn total_item_count(&self) -> u64 {
        self.inner
            .state
            .read()
            .await
            .snapshot
            .as_ref()
            .map_or(0, Cart::total_item_count)
    }

    /// Whether any cart request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire) > 0
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the cart and replace the snapshot.
    ///
    /// A confirmed 404 replaces the stored identifier with a fresh cart and
    /// retries the fetch once. On failure a notification is published, the
    /// message is kept in [`CartSynchronizer::error`], and the previous
    /// snapshot stays.
    ///
    /// # Errors
    ///
    /// Returns the failure after it has been surfaced.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Cart> {
        let _loading = InFlight::start(&self.inner.in_flight);
        let seq = self.inner.next_seq.fetch_add(1, Ordering::AcqRel) + 1;

        match self.fetch().await {
            Ok(cart) => {
                if !self.inner.state.write().await.apply(seq, cart.clone()) {
                    debug!(seq, "Discarding out-of-order cart response");
                }
                Ok(cart)
            }
            Err(e) => {
                let message = e.user_message(LOAD_FAILED);
                warn!(seq, error = %e, "Failed to fetch cart");
                let recorded = self.inner.state.write().await.fail(seq, message.clone());
                if recorded && surfaces_notice(&e) {
                    self.inner.events.notify_error(message);
                }
                Err(e)
            }
        }
    }

    /// Manual retry after a failed load.
    ///
    /// # Errors
    ///
    /// Same as [`CartSynchronizer::refresh`].
    pub async fn retry(&self) -> Result<Cart> {
        self.refresh().await
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` without any request for a quantity
    /// below 1, or the backend failure after it has been surfaced.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn add_item(&self, product: ProductId, quantity: i64) -> Result<()> {
        let Some(quantity) = positive_quantity(quantity) else {
            return Err(ClientError::Validation(
                "Quantity must be at least 1.".to_string(),
            ));
        };
        let _loading = InFlight::start(&self.inner.in_flight);

        let added = async {
            let cart_id = self.inner.identity.resolve().await?;
            self.inner
                .backend
                .add_cart_item(&cart_id, product, quantity)
                .await
        }
        .await;

        if let Err(e) = added {
            warn!(error = %e, "Failed to add item to cart");
            if surfaces_notice(&e) {
                self.inner.events.notify_error(ADD_FAILED);
            }
            return Err(e);
        }

        // A failed refresh has already been surfaced; the item was added.
        let _ = self.refresh().await;
        self.inner.events.notify_success(ITEM_ADDED);
        Ok(())
    }

    /// Set the quantity of a cart line.
    ///
    /// Ignored without any request when `quantity < 1`, when no snapshot is
    /// loaded, or while another update is still in flight.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after it has been surfaced.
    #[instrument(skip(self), fields(item_id = %item))]
    pub async fn update_item(&self, item: CartItemId, quantity: i64) -> Result<CartMutation> {
        let Some(quantity) = positive_quantity(quantity) else {
            return Ok(CartMutation::Ignored);
        };
        let Some(cart_id) = self.snapshot_id().await else {
            return Ok(CartMutation::Ignored);
        };
        if self.inner.updating.swap(true, Ordering::AcqRel) {
            debug!("Update already in flight, ignoring");
            return Ok(CartMutation::Ignored);
        }
        let _updating = UpdateFlag(&self.inner.updating);
        let _loading = InFlight::start(&self.inner.in_flight);

        if let Err(e) = self
            .inner
            .backend
            .update_cart_item(&cart_id, item, quantity)
            .await
        {
            warn!(error = %e, "Failed to update cart item");
            if surfaces_notice(&e) {
                self.inner.events.notify_error(UPDATE_FAILED);
            }
            return Err(e);
        }

        let _ = self.refresh().await;
        Ok(CartMutation::Applied)
    }

    /// Remove a cart line. Ignored when no snapshot is loaded.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after it has been surfaced.
    #[instrument(skip(self), fields(item_id = %item))]
    pub async fn remove_item(&self, item: CartItemId) -> Result<CartMutation> {
        let Some(cart_id) = self.snapshot_id().await else {
            return Ok(CartMutation::Ignored);
        };
        let _loading = InFlight::start(&self.inner.in_flight);

        if let Err(e) = self.inner.backend.remove_cart_item(&cart_id, item).await {
            warn!(error = %e, "Failed to remove cart item");
            if surfaces_notice(&e) {
                self.inner.events.notify_error(REMOVE_FAILED);
            }
            return Err(e);
        }

        let _ = self.refresh().await;
        self.inner.events.notify_success(ITEM_REMOVED);
        Ok(CartMutation::Applied)
    }

    /// Abandon the current cart and start a new, empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the new cart cannot be loaded.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart> {
        self.inner.identity.discard()?;
        self.inner.state.write().await.snapshot = None;
        self.refresh().await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn fetch(&self) -> Result<Cart> {
        let cart_id = self.inner.identity.resolve().await?;
        match self.inner.backend.get_cart(&cart_id).await {
            Err(e) if e.is_not_found() => {
                warn!(cart_id = %cart_id, "Stored cart no longer exists, replacing");
                let fresh = self.inner.identity.replace(&cart_id).await?;
                self.inner.backend.get_cart(&fresh).await
            }
            other => other,
        }
    }

    async fn snapshot_id(&self) -> Option<shopfront_core::CartId> {
        self.inner
            .state
            .read()
            .await
            .snapshot
            .as_ref()
            .map(|cart| cart.id.clone())
    }
}

impl std::fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSynchronizer")
            .field("identity", &self.inner.identity)
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}

/// Quantities below 1 are never sent.
fn positive_quantity(quantity: i64) -> Option<u32> {
    u32::try_from(quantity).ok().filter(|q| *q >= 1)
}

/// Authorization failures are handled globally and cancellations are
/// caller-initiated; neither gets a per-call notification.
const fn surfaces_notice(err: &ClientError) -> bool {
    !matches!(
        err,
        ClientError::Unauthorized { .. } | ClientError::Cancelled
    )
}

/// Counts a cart request as in flight for as long as it is alive.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Releases the update flag on drop.
struct UpdateFlag<'a>(&'a AtomicBool);

impl Drop for UpdateFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
