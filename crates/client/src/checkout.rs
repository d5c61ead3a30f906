//! Hosted checkout handoff.
//!
//! Payment happens entirely on the processor's hosted page. The client only
//! asks the payment-session endpoint for a redirect URL and hands the user
//! over; the processor returns them to `/checkout/success` or
//! `/checkout/cancel` on the configured site.

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shopfront_core::{CheckoutMode, Price};
use tracing::{error, info, instrument};
use url::Url;

use crate::config::{CheckoutConfig, ClientConfig};
use crate::error::{ClientError, Result};
use crate::events::Route;

const SESSION_FAILED: &str = "Failed to create checkout session";

/// A product purchasable through hosted checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutProduct {
    /// Registry key.
    pub key: &'static str,
    /// Processor price identifier.
    pub price_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mode: CheckoutMode,
}

/// Every product configured for hosted checkout.
pub const PRODUCTS: &[CheckoutProduct] = &[CheckoutProduct {
    key: "test",
    price_id: "price_1RMNN6IiDKGueWGHRbcFHOzD",
    name: "Test",
    description: "Test product for $1.00",
    mode: CheckoutMode::Payment,
}];

/// Look up a registry product by key.
#[must_use]
pub fn product(key: &str) -> Option<&'static CheckoutProduct> {
    PRODUCTS.iter().find(|p| p.key == key)
}

/// Display totals for the cart summary.
///
/// Shipping and tax are flat display values; the processor computes the
/// amount actually charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEstimate {
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub total: Price,
}

impl OrderEstimate {
    /// Flat shipping fee.
    pub const SHIPPING_CENTS: u32 = 599;
    /// Sales tax rate, in percent.
    pub const TAX_PERCENT: i64 = 7;

    /// Estimate totals for a subtotal.
    #[must_use]
    pub fn for_subtotal(subtotal: Price) -> Self {
        let shipping = Price::from_cents(Self::SHIPPING_CENTS);
        let tax = (subtotal.amount() * Decimal::new(Self::TAX_PERCENT, 2)).round_dp(2);
        let total = subtotal.amount() + shipping.amount() + tax;
        Self {
            subtotal,
            shipping,
            tax: Price::new(tax).unwrap_or(Price::ZERO),
            total: Price::new(total).unwrap_or(Price::ZERO),
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    price_id: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
    mode: CheckoutMode,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: Url,
}

#[derive(Debug, Deserialize)]
struct SessionFailure {
    error: Option<String>,
}

/// Client for the payment-session endpoint.
#[derive(Clone)]
pub struct CheckoutClient {
    inner: Arc<CheckoutInner>,
}

struct CheckoutInner {
    client: reqwest::Client,
    config: CheckoutConfig,
    site_url: Url,
}

impl CheckoutClient {
    /// Build a checkout client, or `None` when checkout is not configured.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be constructed.
    pub fn from_config(config: &ClientConfig) -> Result<Option<Self>> {
        let Some(checkout) = config.checkout.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Some(Self {
            inner: Arc::new(CheckoutInner {
                client,
                config: checkout,
                site_url: config.site_url.clone(),
            }),
        }))
    }

    /// Absolute URL of a site route.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if the route cannot be joined.
    pub fn site_url(&self, route: Route) -> Result<Url> {
        Ok(self.inner.site_url.join(route.path())?)
    }

    /// Create a hosted checkout session for a registry product, returning
    /// the processor's redirect URL.
    ///
    /// # Errors
    ///
    /// Same as [`CheckoutClient::create_checkout_session`].
    pub async fn start(&self, product: &CheckoutProduct) -> Result<Url> {
        let success = self.site_url(Route::CheckoutSuccess)?;
        let cancel = self.site_url(Route::CheckoutCancel)?;
        self.create_checkout_session(product.price_id, &success, &cancel, product.mode)
            .await
    }

    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Checkout` with the endpoint's `error` message
    /// (or a generic one) on a non-2xx response, or a transport error.
    #[instrument(skip(self, success_url, cancel_url), fields(price_id = %price_id, mode = ?mode))]
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        success_url: &Url,
        cancel_url: &Url,
        mode: CheckoutMode,
    ) -> Result<Url> {
        let response = self
            .inner
            .client
            .post(self.inner.config.endpoint.clone())
            .bearer_auth(self.inner.config.api_key.expose_secret())
            .json(&SessionRequest {
                price_id,
                success_url: success_url.as_str(),
                cancel_url: cancel_url.as_str(),
                mode,
            })
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(ClientError::from_transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<SessionFailure>(&text)
                .ok()
                .and_then(|f| f.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| SESSION_FAILED.to_string());
            error!(status = %status, message = %message, "Checkout session rejected");
            return Err(ClientError::Checkout(message));
        }

        let session: SessionResponse =
            serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))?;
        info!(host = session.url.host_str().unwrap_or_default(), "Checkout session created");
        Ok(session.url)
    }
}

impl std::fmt::Debug for CheckoutClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutClient")
            .field("config", &self.inner.config)
            .field("site_url", &self.inner.site_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let test = product("test").unwrap();
        assert_eq!(test.price_id, "price_1RMNN6IiDKGueWGHRbcFHOzD");
        assert_eq!(test.mode, CheckoutMode::Payment);
        assert!(product("missing").is_none());
    }

    #[test]
    fn test_session_response_decodes_url() {
        let body = r#"{"url":"https://checkout.example.com/c/pay/cs_test_123"}"#;
        let response: SessionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.url.host_str(), Some("checkout.example.com"));

        let invalid = serde_json::from_str::<SessionResponse>(r#"{"url":"not a url"}"#);
        assert!(invalid.is_err());
    }

    #[test]
    fn test_order_estimate() {
        let estimate = OrderEstimate::for_subtotal("100.00".parse().unwrap());
        assert_eq!(estimate.shipping.to_string(), "5.99");
        assert_eq!(estimate.tax.to_string(), "7.00");
        assert_eq!(estimate.total.to_string(), "112.99");

        let empty = OrderEstimate::for_subtotal(Price::ZERO);
        assert_eq!(empty.total.to_string(), "5.99");
    }

    #[test]
    fn test_disabled_without_config() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert!(CheckoutClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_callback_urls() {
        let config = ClientConfig::from_lookup(|key| match key {
            "SHOPFRONT_CHECKOUT_URL" => Some("https://pay.example.com/checkout".into()),
            "SHOPFRONT_CHECKOUT_KEY" => Some("key".into()),
            "SHOPFRONT_SITE_URL" => Some("https://shop.example.com".into()),
            _ => None,
        })
        .unwrap();
        let client = CheckoutClient::from_config(&config).unwrap().unwrap();
        assert_eq!(
            client.site_url(Route::CheckoutSuccess).unwrap().as_str(),
            "https://shop.example.com/checkout/success"
        );
        assert_eq!(
            client.site_url(Route::CheckoutCancel).unwrap().as_str(),
            "https://shop.example.com/checkout/cancel"
        );
    }
}
