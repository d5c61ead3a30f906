//! Newtype IDs for type-safe entity references.
//!
//! Backend resources use integer primary keys, except carts which are named
//! by an opaque string (a UUID on the reference backend). Use the
//! `define_id!` macro to create integer wrappers that cannot be mixed up.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe integer ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Display`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use shopfront_core::define_id;
/// define_id!(ReviewId);
/// define_id!(TagId);
///
/// let review = ReviewId::new(7);
/// assert_eq!(review.as_i64(), 7);
///
/// // These are different types, so this won't compile:
/// // let _: ReviewId = TagId::new(7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Backend entity IDs
define_id!(UserId);
define_id!(CustomerId);
define_id!(ProductId);
define_id!(CollectionId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(ImageId);

/// Identifier of a server-side cart resource.
///
/// Opaque to the client: it is only ever persisted, echoed back in URLs,
/// and compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(String);

impl CartId {
    /// Wrap a cart identifier received from the backend or from storage.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CartId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CartId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CartId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CartId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_id_parses_and_displays() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id, ProductId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("forty-two".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_integer_id_is_transparent_on_the_wire() {
        let json = serde_json::to_string(&CartItemId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: CartItemId = serde_json::from_str("9").unwrap();
        assert_eq!(back.as_i64(), 9);
    }

    #[test]
    fn test_cart_id_is_an_opaque_string() {
        let raw = "5b1f4c52-9f55-4f1b-9c6a-0e4dbe0d5d11";
        let id: CartId = serde_json::from_str(&format!("\"{raw}\"")).unwrap();
        assert_eq!(id.as_str(), raw);
        assert_eq!(format!("/store/carts/{id}/"), format!("/store/carts/{raw}/"));
    }
}
