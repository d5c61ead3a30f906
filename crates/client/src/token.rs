//! Credential persistence and expiry checks.
//!
//! The access token is a JWT issued by the backend. The client never
//! verifies its signature; it only reads the `exp` claim to decide whether a
//! stored token is still worth sending.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::storage::{KeyValueStore, StorageError, keys};

/// The subset of JWT claims the client cares about.
#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Persists the credential pair in durable storage.
///
/// Cheap to clone; all clones share the same storage backend.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a token store over a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Overwrite both halves of the credential pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be written.
    pub fn save(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        self.storage.set(keys::ACCESS_TOKEN, access)?;
        self.storage.set(keys::REFRESH_TOKEN, refresh)
    }

    /// Current access token, without any validation.
    ///
    /// An unreadable backend is treated the same as an absent token.
    #[must_use]
    pub fn read(&self) -> Option<String> {
        self.storage
            .get(keys::ACCESS_TOKEN)
            .inspect_err(|e| warn!(error = %e, "Failed to read access token"))
            .ok()
            .flatten()
    }

    /// Current refresh token, without any validation.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.storage
            .get(keys::REFRESH_TOKEN)
            .inspect_err(|e| warn!(error = %e, "Failed to read refresh token"))
            .ok()
            .flatten()
    }

    /// Remove both tokens. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::ACCESS_TOKEN)?;
        self.storage.remove(keys::REFRESH_TOKEN)
    }

    /// Whether a token is present and its expiry claim lies in the future.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_some_and(|token| !Self::is_expired(&token))
    }

    /// Whether `token` is expired right now.
    ///
    /// Fails closed: malformed tokens and tokens without an `exp` claim are
    /// reported as expired.
    #[must_use]
    pub fn is_expired(token: &str) -> bool {
        Self::is_expired_at(token, Utc::now())
    }

    /// Whether `token` is expired at `now`.
    #[must_use]
    pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
        decode_expiry(token).is_none_or(|exp| exp.saturating_mul(1000) < now.timestamp_millis())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_token", &self.read().is_some())
            .finish_non_exhaustive()
    }
}

/// Decode the `exp` claim (seconds since the epoch) from a JWT payload.
fn decode_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok()?.exp
}
