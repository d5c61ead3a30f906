//! Shopfront Core - Shared domain types.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `client` - Storefront client core (session, cart, gateway)
//! - `cli` - Command-line shell over the client core
//! - `integration-tests` - Mock backend and end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight enough for the CLI and the test crate to share
//! with the client.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
