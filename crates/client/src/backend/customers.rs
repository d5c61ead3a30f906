//! Customer profile endpoints.

use tracing::instrument;

use super::types::{Customer, CustomerUpdate};
use super::{BackendClient, first_element};
use crate::error::Result;

impl BackendClient {
    /// Customer profile of the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no profile exists.
    #[instrument(skip(self))]
    pub async fn current_customer(&self) -> Result<Customer> {
        let value: serde_json::Value = self.gateway.get("store/customers/me/").await?;
        first_element(value, "customer")
    }

    /// Update the authenticated user's customer profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update))]
    pub async fn update_customer(&self, update: &CustomerUpdate) -> Result<Customer> {
        self.gateway.patch("store/customers/me/", update).await
    }

    /// Create a customer profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, data))]
    pub async fn create_customer(&self, data: &CustomerUpdate) -> Result<Customer> {
        self.gateway.post("store/customers/", data).await
    }
}
