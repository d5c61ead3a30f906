//! Order endpoints.

use shopfront_core::{CartId, OrderId, PaymentStatus};
use tracing::instrument;

use super::BackendClient;
use super::types::{CreateOrder, Order, Page, UpdateOrderStatus};
use crate::error::Result;

impl BackendClient {
    /// Orders of the authenticated customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>> {
        let value: serde_json::Value = self.gateway.get("store/orders/").await?;
        Ok(Page::<Order>::from_value(value).results)
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: OrderId) -> Result<Order> {
        self.gateway.get(&format!("store/orders/{id}/")).await
    }

    /// Place an order from the contents of a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn create_order(&self, cart_id: &CartId) -> Result<Order> {
        self.gateway
            .post(
                "store/orders/",
                &CreateOrder {
                    cart_id: cart_id.clone(),
                },
            )
            .await
    }

    /// Set the payment status of an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %id, status = status.code()))]
    pub async fn update_order_status(&self, id: OrderId, status: PaymentStatus) -> Result<Order> {
        self.gateway
            .patch(
                &format!("store/orders/{id}/"),
                &UpdateOrderStatus {
                    payment_status: status,
                },
            )
            .await
    }
}
