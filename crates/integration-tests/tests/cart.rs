//! Cart synchronization against the mock backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::time::Duration;

use shopfront_client::cart::CartMutation;
use shopfront_client::events::{Notice, NoticeLevel};
use shopfront_client::{ClientError, StoreEvent};
use shopfront_core::{CartItemId, ProductId};
use shopfront_integration_tests::{Endpoint, MockBackend, drain_events};

const MUG: ProductId = ProductId::new(42);
const KETTLE: ProductId = ProductId::new(43);

#[tokio::test]
async fn test_fresh_cart_is_empty() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    let cart = store.cart().refresh().await.unwrap();

    assert!(cart.items.is_empty());
    assert_eq!(cart.total_price.to_string(), "0.00");
    assert_eq!(store.cart().total_item_count().await, 0);
    assert_eq!(backend.cart_ids(), vec![cart.id.as_str().to_string()]);
    assert_eq!(
        store.cart().identity().current().unwrap(),
        Some(cart.id.clone())
    );
}

#[tokio::test]
async fn test_concurrent_resolve_creates_one_cart() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let identity = store.cart().identity().clone();

    let (a, b) = tokio::join!(identity.resolve(), store.cart().identity().resolve());

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(backend.hits(Endpoint::CreateCart), 1);
}

#[tokio::test]
async fn test_add_item_increases_count() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    store.cart().refresh().await.unwrap();
    let before = store.cart().total_item_count().await;
    let mut rx = store.events().subscribe();

    store.cart().add_item(MUG, 2).await.unwrap();

    assert_eq!(store.cart().total_item_count().await, before + 2);
    let cart = store.cart().snapshot().await.unwrap();
    assert_eq!(cart.total_price.to_string(), "25.00");
    assert_eq!(cart.line_for(MUG).unwrap().quantity, 2);
    assert!(drain_events(&mut rx).contains(&StoreEvent::Notice(Notice {
        level: NoticeLevel::Success,
        message: "Item added to cart!".into(),
    })));
}

#[tokio::test]
async fn test_add_item_rejects_non_positive_quantity() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    for quantity in [0, -1] {
        let err = store.cart().add_item(MUG, quantity).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn test_update_below_one_makes_no_request() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    store.cart().add_item(MUG, 1).await.unwrap();
    let item = store.cart().snapshot().await.unwrap().items[0].id;
    let before = backend.total_hits();

    for quantity in [0, -1] {
        let outcome = store.cart().update_item(item, quantity).await.unwrap();
        assert_eq!(outcome, CartMutation::Ignored);
    }

    assert_eq!(backend.total_hits(), before);
    assert_eq!(store.cart().total_item_count().await, 1);
}

#[tokio::test]
async fn test_update_and_remove_items() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    store.cart().add_item(MUG, 1).await.unwrap();
    store.cart().add_item(KETTLE, 1).await.unwrap();
    let cart = store.cart().snapshot().await.unwrap();
    let mug = cart.line_for(MUG).unwrap().id;
    let kettle = cart.line_for(KETTLE).unwrap().id;

    let outcome = store.cart().update_item(mug, 3).await.unwrap();
    assert_eq!(outcome, CartMutation::Applied);
    assert_eq!(store.cart().total_item_count().await, 4);

    let outcome = store.cart().remove_item(kettle).await.unwrap();
    assert_eq!(outcome, CartMutation::Applied);
    let cart = store.cart().snapshot().await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_price.to_string(), "37.50");
}

#[tokio::test]
async fn test_overlapping_update_is_ignored() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    store.cart().add_item(MUG, 1).await.unwrap();
    let item = store.cart().snapshot().await.unwrap().items[0].id;

    backend.delay_cart_fetches([Duration::from_millis(300)]);
    let (first, second) = tokio::join!(
        store.cart().update_item(item, 3),
        store.cart().update_item(item, 5)
    );

    assert_eq!(first.unwrap(), CartMutation::Applied);
    assert_eq!(second.unwrap(), CartMutation::Ignored);
    assert_eq!(backend.hits(Endpoint::UpdateItem), 1);
    assert_eq!(store.cart().total_item_count().await, 3);
}

#[tokio::test]
async fn test_mutations_without_snapshot_are_ignored() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    let item = CartItemId::new(1);
    assert_eq!(
        store.cart().update_item(item, 2).await.unwrap(),
        CartMutation::Ignored
    );
    assert_eq!(
        store.cart().remove_item(item).await.unwrap(),
        CartMutation::Ignored
    );
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn test_stale_cart_is_replaced() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let stale = store.cart().refresh().await.unwrap().id;
    backend.delete_cart(stale.as_str());

    let cart = store.cart().refresh().await.unwrap();

    assert_ne!(cart.id, stale);
    assert!(cart.items.is_empty());
    assert_eq!(store.cart().identity().current().unwrap(), Some(cart.id));
    assert_eq!(backend.hits(Endpoint::CreateCart), 2);
    assert!(store.cart().error().await.is_none());
}

#[tokio::test]
async fn test_concurrent_stale_recovery_keeps_one_cart() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let stale = store.cart().refresh().await.unwrap().id;
    backend.delete_cart(stale.as_str());

    // The slow refresh sees the 404 only after the fast one has recovered.
    backend.delay_cart_fetches([Duration::from_millis(300)]);
    let slow = {
        let cart = store.cart().clone();
        tokio::spawn(async move { cart.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fast = store.cart().refresh().await.unwrap();
    slow.await.unwrap().unwrap();

    let stored = store.cart().identity().current().unwrap().unwrap();
    assert_eq!(fast.id, stored);
    assert_eq!(store.cart().snapshot().await.unwrap().id, stored);
    assert_eq!(backend.hits(Endpoint::CreateCart), 2);
    assert_eq!(backend.cart_ids(), vec![stored.as_str().to_string()]);
}

#[tokio::test]
async fn test_out_of_order_response_is_discarded() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let cart_id = store.cart().refresh().await.unwrap().id;

    // The first fetch captures the empty cart, then stalls.
    backend.delay_cart_fetches([Duration::from_millis(300)]);
    let slow = {
        let cart = store.cart().clone();
        tokio::spawn(async move { cart.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    store.backend().add_cart_item(&cart_id, MUG, 1).await.unwrap();
    store.cart().refresh().await.unwrap();
    assert_eq!(store.cart().total_item_count().await, 1);

    let stale = slow.await.unwrap().unwrap();
    assert!(stale.items.is_empty(), "slow response predates the add");
    assert_eq!(store.cart().total_item_count().await, 1);
}

#[tokio::test]
async fn test_load_failure_keeps_snapshot_and_notifies() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    store.cart().add_item(MUG, 1).await.unwrap();
    let mut rx = store.events().subscribe();

    backend.fail_next(Endpoint::GetCart, 500);
    let err = store.cart().refresh().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(store.cart().total_item_count().await, 1);
    let message = store.cart().error().await.expect("error recorded");
    let events = drain_events(&mut rx);
    assert!(events.contains(&StoreEvent::Notice(Notice {
        level: NoticeLevel::Error,
        message: message.clone(),
    })));

    store.cart().retry().await.unwrap();
    assert!(store.cart().error().await.is_none());
}

#[tokio::test]
async fn test_failed_add_notifies() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let mut rx = store.events().subscribe();

    backend.fail_next(Endpoint::AddItem, 500);
    store.cart().add_item(MUG, 1).await.unwrap_err();

    assert!(drain_events(&mut rx).contains(&StoreEvent::Notice(Notice {
        level: NoticeLevel::Error,
        message: "Failed to add item to cart. Please try again.".into(),
    })));
}

#[tokio::test]
async fn test_clear_starts_new_cart() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    store.cart().add_item(MUG, 2).await.unwrap();
    let old = store.cart().snapshot().await.unwrap().id;

    let cart = store.cart().clear().await.unwrap();

    assert_ne!(cart.id, old);
    assert_eq!(store.cart().total_item_count().await, 0);
}

#[tokio::test]
async fn test_cart_survives_login() {
    let backend = MockBackend::start().await;
    backend.add_user("alice", "correct-horse");
    let store = backend.storefront();
    store.cart().add_item(MUG, 1).await.unwrap();
    let cart_id = store.cart().identity().current().unwrap();

    store.session().login("alice", "correct-horse").await.unwrap();
    store.cart().refresh().await.unwrap();

    assert_eq!(store.cart().identity().current().unwrap(), cart_id);
    assert_eq!(store.cart().total_item_count().await, 1);
}
