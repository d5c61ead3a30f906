//! Single-letter status codes used by the store backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "P")]
    Pending,
    #[serde(rename = "C")]
    Complete,
    #[serde(rename = "F")]
    Failed,
}

impl PaymentStatus {
    /// The wire code (`P`, `C` or `F`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pending => "P",
            Self::Complete => "C",
            Self::Failed => "F",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        })
    }
}

/// Customer loyalty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Membership {
    #[default]
    #[serde(rename = "B")]
    Bronze,
    #[serde(rename = "S")]
    Silver,
    #[serde(rename = "G")]
    Gold,
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
        })
    }
}

/// Billing mode of a hosted checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    #[default]
    Payment,
    Subscription,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_codes() {
        let s: PaymentStatus = serde_json::from_str("\"C\"").unwrap();
        assert_eq!(s, PaymentStatus::Complete);
        assert_eq!(serde_json::to_string(&PaymentStatus::Failed).unwrap(), "\"F\"");
        assert_eq!(PaymentStatus::Pending.code(), "P");
        assert!(serde_json::from_str::<PaymentStatus>("\"X\"").is_err());
    }

    #[test]
    fn test_membership_codes() {
        let m: Membership = serde_json::from_str("\"G\"").unwrap();
        assert_eq!(m, Membership::Gold);
        assert_eq!(Membership::default().to_string(), "bronze");
    }

    #[test]
    fn test_checkout_mode_wire_names() {
        assert_eq!(serde_json::to_string(&CheckoutMode::Subscription).unwrap(), "\"subscription\"");
    }
}
