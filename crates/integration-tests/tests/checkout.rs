//! Hosted checkout handoff against the mock payment-session endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use shopfront_client::events::{Notice, NoticeLevel, Route};
use shopfront_client::{CheckoutOutcome, ClientConfig, ClientError, StoreEvent, Storefront};
use shopfront_core::{CheckoutMode, ProductId};
use shopfront_integration_tests::{CHECKOUT_REDIRECT, Endpoint, MockBackend, drain_events};

async fn logged_in(backend: &MockBackend) -> Storefront {
    backend.add_user("alice", "correct-horse");
    let store = backend.storefront();
    store.session().login("alice", "correct-horse").await.unwrap();
    store
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let mut rx = store.events().subscribe();

    let outcome = store.begin_checkout("test").await.unwrap();

    assert_eq!(outcome, CheckoutOutcome::LoginRequired);
    assert_eq!(backend.hits(Endpoint::Checkout), 0);
    assert_eq!(
        drain_events(&mut rx),
        vec![StoreEvent::Navigate(Route::Login)]
    );
}

#[tokio::test]
async fn test_checkout_redirects() {
    let backend = MockBackend::start().await;
    let store = logged_in(&backend).await;
    let mut rx = store.events().subscribe();

    let outcome = store.begin_checkout("test").await.unwrap();

    let CheckoutOutcome::Redirect(url) = outcome else {
        panic!("expected a redirect");
    };
    assert_eq!(url.as_str(), CHECKOUT_REDIRECT);
    assert_eq!(drain_events(&mut rx), vec![StoreEvent::Redirect(url)]);
}

#[tokio::test]
async fn test_checkout_error_is_surfaced() {
    let backend = MockBackend::start().await;
    let store = logged_in(&backend).await;
    let mut rx = store.events().subscribe();
    let client = store.checkout().expect("checkout configured");

    let success = client.site_url(Route::CheckoutSuccess).unwrap();
    let cancel = client.site_url(Route::CheckoutCancel).unwrap();
    let err = client
        .create_checkout_session("price_unknown", &success, &cancel, CheckoutMode::Payment)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Checkout(ref m) if m == "No such price"));

    backend.fail_next(Endpoint::Checkout, 502);
    let err = store.begin_checkout("test").await.unwrap_err();
    assert!(matches!(err, ClientError::Checkout(_)));
    assert!(drain_events(&mut rx).iter().any(|e| matches!(
        e,
        StoreEvent::Notice(Notice { level: NoticeLevel::Error, .. })
    )));
}

#[tokio::test]
async fn test_unknown_product_is_rejected() {
    let backend = MockBackend::start().await;
    let store = logged_in(&backend).await;

    let err = store.begin_checkout("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(backend.hits(Endpoint::Checkout), 0);
}

#[tokio::test]
async fn test_checkout_disabled_without_config() {
    let backend = MockBackend::start().await;
    backend.add_user("alice", "correct-horse");
    let config = ClientConfig::for_backend(&backend.url()).unwrap();
    let store = Storefront::new(config, MockBackend::storage()).unwrap();
    store.session().login("alice", "correct-horse").await.unwrap();

    assert!(store.checkout().is_none());
    let err = store.begin_checkout("test").await.unwrap_err();
    assert!(matches!(err, ClientError::CheckoutDisabled));
}

#[tokio::test]
async fn test_order_estimate_tracks_cart() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    assert!(store.order_estimate().await.is_none());

    store.cart().add_item(ProductId::new(43), 1).await.unwrap();
    let estimate = store.order_estimate().await.unwrap();

    assert_eq!(estimate.subtotal.to_string(), "39.99");
    assert_eq!(estimate.shipping.to_string(), "5.99");
    assert_eq!(estimate.tax.to_string(), "2.80");
    assert_eq!(estimate.total.to_string(), "48.78");
}
