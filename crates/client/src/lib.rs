//! Shopfront storefront client core.
//!
//! Typed, async state and synchronization layer between a view layer and
//! the store backend's REST API:
//!
//! - [`token`] - credential persistence and JWT expiry checks
//! - [`gateway`] - the single HTTP egress point (auth header, 401/403 handling)
//! - [`session`] - login, registration, logout and session bootstrap
//! - [`cart`] - cart identity and snapshot synchronization
//! - [`checkout`] - hosted checkout handoff
//! - [`state`] - the [`Storefront`] container wiring it all together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod media;
pub mod session;
pub mod state;
pub mod storage;
pub mod token;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::{EventBus, Route, StoreEvent};
pub use state::{CheckoutOutcome, Storefront};
