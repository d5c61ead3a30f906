//! Shopfront CLI - a command-line shell over the storefront client core.
//!
//! # Usage
//!
//! ```bash
//! # Log in (tokens persist in SHOPFRONT_STORAGE_PATH)
//! shopfront login -u ada -p 'correct horse'
//!
//! # Browse the catalog
//! shopfront products list --search mug --ordering -unit_price
//! shopfront collections list
//!
//! # Work with the cart
//! shopfront cart add 42 -q 2
//! shopfront cart show
//!
//! # Hand off to hosted checkout
//! shopfront checkout
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the default filter); command
//! output goes to stdout.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_client::storage::FileStore;
use shopfront_client::{ClientConfig, Storefront};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront shell")]
struct Cli {
    /// Backend base URL (overrides `SHOPFRONT_BACKEND_URL`)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log into it
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Update the logged-in user's profile
    Profile {
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },
    /// Browse products
    Products {
        #[command(subcommand)]
        action: commands::catalog::ProductAction,
    },
    /// Browse collections
    Collections {
        #[command(subcommand)]
        action: commands::catalog::CollectionAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Manage the customer profile
    Customer {
        #[command(subcommand)]
        action: commands::orders::CustomerAction,
    },
    /// Place and inspect orders
    Orders {
        #[command(subcommand)]
        action: commands::orders::OrderAction,
    },
    /// Start hosted checkout
    Checkout {
        /// Checkout product key
        #[arg(default_value = "test")]
        product: String,

        /// Only show the order estimate for the current cart
        #[arg(long)]
        estimate: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    if let Some(url) = cli.backend_url.as_deref() {
        match ClientConfig::for_backend(url) {
            Ok(overridden) => config.backend_url = overridden.backend_url,
            Err(e) => {
                eprintln!("Invalid --backend-url: {e}");
                std::process::exit(2);
            }
        }
    }

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_client=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: ClientConfig) -> commands::CommandResult {
    let storage = Arc::new(FileStore::open(&config.storage_path)?);
    let storefront = Storefront::new(config, storage)?;
    let mut events = storefront.events().subscribe();

    storefront.session().bootstrap().await;

    let result = match command {
        Commands::Login { username, password } => {
            commands::auth::login(&storefront, &username, &password).await
        }
        Commands::Register {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            commands::auth::register(
                &storefront,
                shopfront_client::session::RegistrationForm {
                    username,
                    email,
                    password,
                    first_name,
                    last_name,
                },
            )
            .await
        }
        Commands::Logout => {
            commands::auth::logout(&storefront).await;
            Ok(())
        }
        Commands::Whoami => commands::auth::whoami(&storefront).await,
        Commands::Profile {
            email,
            first_name,
            last_name,
        } => commands::auth::update_profile(&storefront, email, first_name, last_name).await,
        Commands::Products { action } => commands::catalog::products(&storefront, action).await,
        Commands::Collections { action } => {
            commands::catalog::collections(&storefront, action).await
        }
        Commands::Cart { action } => commands::cart::run(&storefront, action).await,
        Commands::Customer { action } => commands::orders::customer(&storefront, action).await,
        Commands::Orders { action } => commands::orders::orders(&storefront, action).await,
        Commands::Checkout { product, estimate } => {
            commands::checkout::run(&storefront, &product, estimate).await
        }
    };

    render::drain_events(&mut events);
    storefront.shutdown();
    result
}
