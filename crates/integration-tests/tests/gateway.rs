//! Transport behavior: timeouts, unreachable backends, cancellation and
//! the authorization header.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use shopfront_client::error::ErrorClass;
use shopfront_client::events::{Notice, NoticeLevel};
use shopfront_client::{ClientConfig, ClientError, StoreEvent, Storefront};
use shopfront_integration_tests::{Endpoint, MockBackend, drain_events};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_timeout_is_classified() {
    let backend = MockBackend::start().await;
    let mut config = backend.config();
    config.request_timeout = Duration::from_secs(1);
    let store = Storefront::new(config, MockBackend::storage()).unwrap();
    let cart_id = store.cart().identity().resolve().await.unwrap();

    backend.delay_cart_fetches([Duration::from_millis(1500)]);
    let err = store.backend().get_cart(&cart_id).await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout));
    assert_eq!(err.classify(), ErrorClass::Timeout);
    assert_eq!(err.user_message("x"), "Request timed out. Please try again.");
}

#[tokio::test]
async fn test_unreachable_backend_notifies() {
    let config = ClientConfig::for_backend("http://127.0.0.1:9/").unwrap();
    let store = Storefront::new(config, MockBackend::storage()).unwrap();
    let mut rx = store.events().subscribe();

    let err = store.cart().refresh().await.unwrap_err();

    assert_eq!(err.classify(), ErrorClass::NoResponse);
    let expected = "Unable to reach the server. Please check if the server is running.";
    assert_eq!(store.cart().error().await.as_deref(), Some(expected));
    assert!(drain_events(&mut rx).contains(&StoreEvent::Notice(Notice {
        level: NoticeLevel::Error,
        message: expected.into(),
    })));
}

#[tokio::test]
async fn test_server_error_message() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    backend.fail_next(Endpoint::Collections, 503);
    let err = store.backend().collections().await.unwrap_err();

    assert_eq!(err.classify(), ErrorClass::Response(503));
    assert_eq!(
        err.user_message("x"),
        "Server error: 503. Please try again later."
    );
    assert_eq!(err.json_body().unwrap()["detail"], "Injected failure.");
}

#[tokio::test]
async fn test_cancellation_resolves_immediately() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let cart_id = store.cart().identity().resolve().await.unwrap();
    let token = CancellationToken::new();
    let client = store.backend().with_cancellation(token.clone());

    backend.delay_cart_fetches([Duration::from_secs(5)]);
    let pending = tokio::spawn(async move { client.get_cart(&cart_id).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let err = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("cancelled request should resolve promptly")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
}

#[tokio::test]
async fn test_cancelled_refresh_is_silent() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let mut rx = store.events().subscribe();
    let token = CancellationToken::new();
    token.cancel();

    let err = store
        .backend()
        .with_cancellation(token)
        .products(&shopfront_client::backend::types::ProductQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(drain_events(&mut rx).is_empty());
}

#[tokio::test]
async fn test_auth_scheme_is_configurable() {
    let backend = MockBackend::start().await;
    backend.add_user("alice", "correct-horse");
    let mut config = backend.config();
    config.auth_scheme = "Bearer".to_string();
    let store = Storefront::new(config, MockBackend::storage()).unwrap();

    // The mock only accepts `JWT`, so identity confirmation fails.
    let err = store.session().login("alice", "correct-horse").await.unwrap_err();
    assert!(err.source.is_unauthorized());
    assert!(!store.session().is_authenticated());
}
