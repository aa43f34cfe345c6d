//! Newtype IDs for type-safe entity references.
//!
//! Orders and return requests live in a document database whose identifiers
//! are opaque strings. Use the `define_id!` macro to create type-safe wrappers
//! so an order id can never be passed where a return request id is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use lustre_core::define_id;
/// define_id!(WishlistId);
/// define_id!(CartId);
///
/// let wishlist_id = WishlistId::new("665f1c2e9b1d4a0012ab34cd");
/// let cart_id = CartId::from("665f1c2e9b1d4a0012ab34cd");
///
/// assert_eq!(wishlist_id.as_str(), cart_id.as_str());
/// // These are different types, so this won't compile:
/// // let _: WishlistId = cart_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(ReturnRequestId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_raw_string() {
        let id = OrderId::new("665f1c2e9b1d4a0012ab34cd");
        assert_eq!(id.to_string(), "665f1c2e9b1d4a0012ab34cd");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ReturnRequestId::from("rr_42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"rr_42\"");

        let parsed: ReturnRequestId = serde_json::from_str("\"rr_42\"").unwrap();
        assert_eq!(parsed, id);
    }
}
