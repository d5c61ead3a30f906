//! Authentication endpoints.

use tracing::instrument;

use super::types::{Credentials, ProfileUpdate, RegisterData, TokenPair, User};
use super::{BackendClient, first_element};
use crate::error::Result;

impl BackendClient {
    /// Exchange credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` for rejected credentials, or any
    /// transport error.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn create_token(&self, credentials: &Credentials) -> Result<TokenPair> {
        self.gateway.post("auth/jwt/create/", credentials).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Server` with the field errors in the body when
    /// the backend rejects the registration.
    #[instrument(skip(self, data), fields(username = %data.username))]
    pub async fn register_user(&self, data: &RegisterData) -> Result<User> {
        self.gateway.post("auth/users/", data).await
    }

    /// Fetch the authenticated user (first element of the identity list).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the list is empty.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User> {
        let value: serde_json::Value = self.gateway.get("auth/users/me/").await?;
        first_element(value, "identity")
    }

    /// Update the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update))]
    pub async fn update_current_user(&self, update: &ProfileUpdate) -> Result<User> {
        self.gateway.patch("auth/users/me/", update).await
    }
}
