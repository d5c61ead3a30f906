//! Cart endpoints. Carts are never cached.

use shopfront_core::{CartId, CartItemId, ProductId};
use tracing::instrument;

use super::BackendClient;
use super::types::{AddToCart, Cart, UpdateCartItem};
use crate::error::Result;

impl BackendClient {
    /// Create an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart> {
        self.gateway
            .post("store/carts/", &serde_json::json!({}))
            .await
    }

    /// Fetch a cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Server` with status 404 if the cart is gone.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Cart> {
        self.gateway.get(&format!("store/carts/{cart_id}/")).await
    }

    /// Add a product line to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product))]
    pub async fn add_cart_item(
        &self,
        cart_id: &CartId,
        product: ProductId,
        quantity: u32,
    ) -> Result<serde_json::Value> {
        self.gateway
            .post(
                &format!("store/carts/{cart_id}/items/"),
                &AddToCart { product, quantity },
            )
            .await
    }

    /// Change the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        cart_id: &CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<serde_json::Value> {
        self.gateway
            .patch(
                &format!("store/carts/{cart_id}/items/{item_id}/"),
                &UpdateCartItem { quantity },
            )
            .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, item_id = %item_id))]
    pub async fn remove_cart_item(&self, cart_id: &CartId, item_id: CartItemId) -> Result<()> {
        self.gateway
            .delete(&format!("store/carts/{cart_id}/items/{item_id}/"))
            .await
    }
}
