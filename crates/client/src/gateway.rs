//! Single egress point to the store backend.
//!
//! Every backend request goes through [`HttpGateway`], which:
//! - joins the request path onto the configured base URL
//! - applies the configured timeout
//! - attaches `Authorization: <scheme> <token>` whenever a token is stored
//! - on 401/403 clears the token store and publishes
//!   [`StoreEvent::SessionInvalidated`] before returning
//!   [`ClientError::Unauthorized`]
//! - resolves with [`ClientError::Cancelled`] when its cancellation token fires

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{EventBus, StoreEvent};
use crate::token::TokenStore;

/// HTTP gateway to the store backend.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<GatewayInner>,
    cancel: Option<CancellationToken>,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: Url,
    auth_scheme: String,
    tokens: TokenStore,
    events: EventBus,
}

impl HttpGateway {
    /// Build a gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, tokens: TokenStore, events: EventBus) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: config.backend_url.clone(),
                auth_scheme: config.auth_scheme.clone(),
                tokens,
                events,
            }),
            cancel: None,
        })
    }

    /// A gateway whose requests resolve with `Cancelled` once `token` fires.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: Some(token),
        }
    }

    /// Base URL every request path is joined onto.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Token store consulted for the `Authorization` header.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Resolve a backend path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if the path cannot be joined.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    /// `GET` a path and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] produced by the request or decoding.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.execute(Method::GET, path, &[], None).await?;
        decode(&text)
    }

    /// `GET` a path with query parameters and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] produced by the request or decoding.
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let text = self.execute(Method::GET, path, query, None).await?;
        decode(&text)
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] produced by the request or decoding.
    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = encode(body)?;
        let text = self.execute(Method::POST, path, &[], Some(body)).await?;
        decode(&text)
    }

    /// `PATCH` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] produced by the request or decoding.
    pub async fn patch<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = encode(body)?;
        let text = self.execute(Method::PATCH, path, &[], Some(body)).await?;
        decode(&text)
    }

    /// `DELETE` a path, discarding any response body.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] produced by the request.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Dispatch a request and return the raw body of a 2xx response.
    #[instrument(skip(self, query, body), fields(method = %method, path = %path))]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = self.url(path)?;
        let mut request = self.inner.client.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.inner.tokens.read() {
            request = request.header(
                reqwest::header::AUTHORIZATION,
                format!("{} {token}", self.inner.auth_scheme),
            );
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let round_trip = async {
            let response = request.send().await.map_err(ClientError::from_transport)?;
            let status = response.status();
            let text = response.text().await.map_err(ClientError::from_transport)?;
            Ok::<_, ClientError>((status, text))
        };

        let (status, text) = match &self.cancel {
            Some(cancel) => tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Request cancelled");
                    return Err(ClientError::Cancelled);
                }
                result = round_trip => result?,
            },
            None => round_trip.await?,
        };

        self.handle_status(status, text)
    }

    /// Response interceptor.
    fn handle_status(&self, status: StatusCode, text: String) -> Result<String> {
        if status.is_success() {
            debug!(status = %status, "Backend request succeeded");
            return Ok(text);
        }

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!(status = %status, "Backend rejected credentials, clearing session");
            if let Err(e) = self.inner.tokens.clear() {
                error!(error = %e, "Failed to clear tokens after authorization failure");
            }
            self.inner.events.publish(StoreEvent::SessionInvalidated {
                status: status.as_u16(),
            });
            return Err(ClientError::Unauthorized {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(
            status = %status,
            body = %text.chars().take(500).collect::<String>(),
            "Backend returned non-success status"
        );
        Err(ClientError::Server {
            status: status.as_u16(),
            body: text,
        })
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.inner.base_url.as_str())
            .field("auth_scheme", &self.inner.auth_scheme)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

fn encode<B: Serialize>(body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Decode a JSON body; an empty body decodes as `null`.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| {
        error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        ClientError::Decode(e.to_string())
    })
}
