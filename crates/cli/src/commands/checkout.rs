//! Hosted checkout command.

use shopfront_client::{CheckoutOutcome, Storefront};

use super::CommandResult;
use crate::render;

pub async fn run(storefront: &Storefront, product: &str, estimate_only: bool) -> CommandResult {
    if let Err(e) = storefront.cart().refresh().await {
        tracing::debug!(error = %e, "Cart unavailable for estimate");
    }
    if let Some(estimate) = storefront.order_estimate().await {
        render::order_estimate(&estimate);
    }
    if estimate_only {
        return Ok(());
    }

    match storefront.begin_checkout(product).await? {
        CheckoutOutcome::LoginRequired => {
            println!("Log in to check out: shopfront login -u <username>");
        }
        // Printed from the published redirect event.
        CheckoutOutcome::Redirect(_) => {}
    }
    Ok(())
}
