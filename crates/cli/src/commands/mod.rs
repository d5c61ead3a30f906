//! Command implementations.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

/// Result of a CLI command.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Error for commands that need a logged-in user.
pub fn login_required() -> Box<dyn std::error::Error> {
    "Not logged in. Run `shopfront login` first.".into()
}
