//! Server-side cart tracking.
//!
//! - [`CartIdentityResolver`] owns the persisted cart identifier
//! - [`CartSynchronizer`] owns the in-memory snapshot and every cart write

mod identity;
mod sync;

pub use identity::CartIdentityResolver;
pub use sync::{CartMutation, CartSynchronizer};
