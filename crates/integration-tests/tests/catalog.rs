//! Catalog, customer and order endpoints against the mock backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use shopfront_client::backend::types::{CustomerUpdate, ProductQuery};
use shopfront_core::{CollectionId, Membership, PaymentStatus, ProductId};
use shopfront_integration_tests::{Endpoint, MockBackend};

#[tokio::test]
async fn test_product_listing_is_cached() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let query = ProductQuery::default();

    let first = store.backend().products(&query).await.unwrap();
    let second = store.backend().products(&query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.count, 3);
    assert_eq!(backend.hits(Endpoint::Products), 1);

    store.backend().invalidate_catalog();
    store.backend().products(&query).await.unwrap();
    assert_eq!(backend.hits(Endpoint::Products), 2);
}

#[tokio::test]
async fn test_search_is_not_cached() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();
    let query = ProductQuery {
        search: Some("mug".into()),
        ..ProductQuery::default()
    };

    let page = store.backend().products(&query).await.unwrap();
    store.backend().products(&query).await.unwrap();

    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, ProductId::new(42));
    assert_eq!(backend.hits(Endpoint::Products), 2);
}

#[tokio::test]
async fn test_filters_and_ordering() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    let page = store
        .backend()
        .products(&ProductQuery {
            collection_id: Some(CollectionId::new(3)),
            ordering: Some("-unit_price".into()),
            ..ProductQuery::default()
        })
        .await
        .unwrap();

    let titles: Vec<&str> = page.results.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Tea Kettle", "Coffee Mug"]);
}

#[tokio::test]
async fn test_product_detail_and_media() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    let product = store.backend().product(ProductId::new(42)).await.unwrap();
    assert_eq!(product.unit_price.to_string(), "12.50");
    let image = product.images.first().map(|i| i.image.as_str());
    assert_eq!(
        store.media_url(image),
        format!("{}media/store/images/42.jpg", backend.url())
    );

    let err = store.backend().product(ProductId::new(999)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_collections() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    let collections = store.backend().collections().await.unwrap();
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0].product_count, 2);
    assert_eq!(collections[0].featured_product, Some(ProductId::new(42)));

    let cutlery = store.backend().collection(CollectionId::new(4)).await.unwrap();
    assert_eq!(cutlery.title, "Cutlery");
}

#[tokio::test]
async fn test_customer_profile_lifecycle() {
    let backend = MockBackend::start().await;
    backend.add_user("alice", "correct-horse");
    let store = backend.storefront();
    store.session().login("alice", "correct-horse").await.unwrap();

    assert!(store.backend().current_customer().await.is_err());

    let created = store
        .backend()
        .create_customer(&CustomerUpdate {
            phone_number: Some("555-0100".into()),
            ..CustomerUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(created.membership, Membership::Bronze);

    let updated = store
        .backend()
        .update_customer(&CustomerUpdate {
            membership: Some(Membership::Gold),
            ..CustomerUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.membership, Membership::Gold);
    assert_eq!(updated.phone_number, "555-0100");
    assert_eq!(store.backend().current_customer().await.unwrap(), updated);
}

#[tokio::test]
async fn test_place_order_from_cart() {
    let backend = MockBackend::start().await;
    backend.add_user("alice", "correct-horse");
    let store = backend.storefront();
    store.session().login("alice", "correct-horse").await.unwrap();
    store.cart().add_item(ProductId::new(42), 2).await.unwrap();
    let cart_id = store.cart().identity().current().unwrap().unwrap();

    let order = store.backend().create_order(&cart_id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.total().to_string(), "25.00");
    assert!(order.placed_at.is_some());

    let orders = store.backend().orders().await.unwrap();
    assert_eq!(orders, vec![order.clone()]);

    let paid = store
        .backend()
        .update_order_status(order.id, PaymentStatus::Complete)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Complete);
    assert_eq!(
        store.backend().order(order.id).await.unwrap().payment_status,
        PaymentStatus::Complete
    );
}

#[tokio::test]
async fn test_orders_require_session() {
    let backend = MockBackend::start().await;
    let store = backend.storefront();

    let err = store.backend().orders().await.unwrap_err();
    assert!(err.is_unauthorized());
}
