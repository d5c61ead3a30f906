//! Customer and order commands.

use clap::{Subcommand, ValueEnum};
use shopfront_client::Storefront;
use shopfront_client::backend::types::CustomerUpdate;
use shopfront_core::{Membership, OrderId, PaymentStatus};

use super::{CommandResult, login_required};
use crate::render;

#[derive(Subcommand)]
pub enum CustomerAction {
    /// Show the customer profile
    Show,
    /// Update the customer profile
    Update {
        #[arg(long)]
        phone: Option<String>,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,
    },
    /// Create a customer profile
    Create {
        #[arg(long)]
        phone: String,

        #[arg(long)]
        birth_date: Option<String>,

        #[arg(long, value_enum, default_value_t = Tier::Bronze)]
        membership: Tier,
    },
}

#[derive(Subcommand)]
pub enum OrderAction {
    /// List orders
    List,
    /// Show one order
    Show { id: i64 },
    /// Place an order from the current cart
    Place,
    /// Set the payment status of an order
    Status {
        id: i64,

        #[arg(value_enum)]
        status: Status,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl From<Tier> for Membership {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Bronze => Self::Bronze,
            Tier::Silver => Self::Silver,
            Tier::Gold => Self::Gold,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Status {
    Pending,
    Complete,
    Failed,
}

impl From<Status> for PaymentStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Complete => Self::Complete,
            Status::Failed => Self::Failed,
        }
    }
}

async fn require_login(storefront: &Storefront) -> CommandResult {
    if storefront.session().current_user().await.is_none() {
        return Err(login_required());
    }
    Ok(())
}

pub async fn customer(storefront: &Storefront, action: CustomerAction) -> CommandResult {
    require_login(storefront).await?;
    let backend = storefront.backend();

    let customer = match action {
        CustomerAction::Show => backend.current_customer().await?,
        CustomerAction::Update { phone, birth_date } => {
            backend
                .update_customer(&CustomerUpdate {
                    phone_number: phone,
                    birth_date,
                    membership: None,
                })
                .await?
        }
        CustomerAction::Create {
            phone,
            birth_date,
            membership,
        } => {
            backend
                .create_customer(&CustomerUpdate {
                    phone_number: Some(phone),
                    birth_date,
                    membership: Some(membership.into()),
                })
                .await?
        }
    };

    println!("Customer #{} (user #{})", customer.id, customer.user_id);
    println!("  phone:      {}", customer.phone_number);
    if let Some(birth_date) = &customer.birth_date {
        println!("  birth date: {birth_date}");
    }
    println!("  membership: {}", customer.membership);
    Ok(())
}

pub async fn orders(storefront: &Storefront, action: OrderAction) -> CommandResult {
    require_login(storefront).await?;
    let backend = storefront.backend();

    match action {
        OrderAction::List => {
            let orders = backend.orders().await?;
            if orders.is_empty() {
                println!("No orders yet.");
            }
            for order in &orders {
                render::order(order);
            }
        }
        OrderAction::Show { id } => render::order(&backend.order(OrderId::new(id)).await?),
        OrderAction::Place => {
            let cart_id = storefront.cart().identity().resolve().await?;
            let order = backend.create_order(&cart_id).await?;
            render::order(&order);
            // The next cart action starts a fresh cart.
            storefront.cart().identity().discard()?;
        }
        OrderAction::Status { id, status } => {
            let order = backend
                .update_order_status(OrderId::new(id), status.into())
                .await?;
            render::order(&order);
        }
    }
    Ok(())
}
