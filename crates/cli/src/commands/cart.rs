//! Cart commands.

use clap::Subcommand;
use shopfront_client::Storefront;
use shopfront_client::cart::CartMutation;
use shopfront_client::checkout::OrderEstimate;
use shopfront_core::{CartItemId, ProductId};

use super::CommandResult;
use crate::render;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product: i64,

        #[arg(short, long, default_value_t = 1, allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Change the quantity of a cart line
    Update {
        item: i64,

        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove a cart line
    Remove { item: i64 },
    /// Abandon the cart and start an empty one
    Clear,
}

pub async fn run(storefront: &Storefront, action: CartAction) -> CommandResult {
    let cart = storefront.cart();
    // Every action works against a loaded snapshot.
    cart.refresh().await?;

    match action {
        CartAction::Show => {}
        CartAction::Add { product, quantity } => {
            cart.add_item(ProductId::new(product), quantity).await?;
        }
        CartAction::Update { item, quantity } => {
            if cart.update_item(CartItemId::new(item), quantity).await? == CartMutation::Ignored {
                println!("Nothing to update.");
            }
        }
        CartAction::Remove { item } => {
            cart.remove_item(CartItemId::new(item)).await?;
        }
        CartAction::Clear => {
            cart.clear().await?;
        }
    }

    if let Some(snapshot) = cart.snapshot().await {
        render::cart(&snapshot, &OrderEstimate::for_subtotal(snapshot.total_price));
    }
    Ok(())
}
