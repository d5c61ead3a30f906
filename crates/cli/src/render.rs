//! Plain-text rendering of client state and events.

use shopfront_client::backend::types::{Cart, Collection, Order, Page, Product, User};
use shopfront_client::checkout::OrderEstimate;
use shopfront_client::events::{Notice, NoticeLevel, StoreEvent};
use tokio::sync::broadcast;

/// Print every event published so far.
pub fn drain_events(events: &mut broadcast::Receiver<StoreEvent>) {
    loop {
        match events.try_recv() {
            Ok(StoreEvent::Notice(Notice { level, message })) => match level {
                NoticeLevel::Success => println!("✓ {message}"),
                NoticeLevel::Error => println!("✗ {message}"),
            },
            Ok(StoreEvent::Redirect(url)) => println!("Continue checkout at: {url}"),
            Ok(StoreEvent::Navigate(route)) => tracing::debug!(path = route.path(), "Navigate"),
            Ok(StoreEvent::SessionInvalidated { status }) => {
                println!("Session expired ({status}); please log in again.");
            }
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
}

pub fn user(user: &User) {
    let name = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    println!("{} (#{})", user.username, user.id);
    if !user.email.is_empty() {
        println!("  email: {}", user.email);
    }
    if !name.is_empty() {
        println!("  name:  {name}");
    }
}

pub fn product_page(page: &Page<Product>) {
    if page.results.is_empty() {
        println!("No products found.");
        return;
    }
    for product in &page.results {
        println!(
            "{:>6}  {:<40} {:>12}  ({} in stock)",
            product.id,
            product.title,
            product.unit_price.format_usd(),
            product.inventory
        );
    }
    println!(
        "{} product(s){}{}",
        page.count,
        if page.previous.is_some() { ", has previous page" } else { "" },
        if page.next.is_some() { ", has next page" } else { "" },
    );
}

pub fn product(product: &Product, image_urls: &[String]) {
    println!("{} (#{})", product.title, product.id);
    println!("  price:     {}", product.unit_price.format_usd());
    if let Some(with_tax) = product.price_with_tax {
        println!("  with tax:  {}", with_tax.format_usd());
    }
    println!("  inventory: {}", product.inventory);
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  {description}");
    }
    for url in image_urls {
        println!("  image: {url}");
    }
}

pub fn collections(collections: &[Collection]) {
    if collections.is_empty() {
        println!("No collections.");
        return;
    }
    for collection in collections {
        println!(
            "{:>6}  {:<40} {} product(s)",
            collection.id, collection.title, collection.product_count
        );
    }
}

pub fn cart(cart: &Cart, estimate: &OrderEstimate) {
    if cart.items.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for item in &cart.items {
        println!(
            "{:>6}  {:<40} x{:<3} {:>12}",
            item.id,
            item.product.title,
            item.quantity,
            item.total_price.format_usd()
        );
    }
    println!("Items:    {}", cart.total_item_count());
    order_estimate(estimate);
}

pub fn order_estimate(estimate: &OrderEstimate) {
    println!("Subtotal: {}", estimate.subtotal.format_usd());
    println!("Shipping: {}", estimate.shipping.format_usd());
    println!("Tax (7%): {}", estimate.tax.format_usd());
    println!("Total:    {}", estimate.total.format_usd());
}

pub fn order(order: &Order) {
    let placed = order
        .placed_at
        .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
    println!(
        "Order #{}  placed {}  payment {}  total {}",
        order.id,
        placed,
        order.payment_status,
        order.total().format_usd()
    );
    for item in &order.items {
        println!(
            "    {:<40} x{:<3} {:>12}",
            item.product.title,
            item.quantity,
            item.unit_price.format_usd()
        );
    }
}
