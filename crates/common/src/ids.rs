use serde::{Deserialize, Serialize};

/// Declares an integer-backed identifier newtype.
///
/// Every row in the system is keyed by a database-assigned `BIGINT`. Wrapping
/// each key in its own type keeps a `ProductId` from being passed where a
/// `CartItemId` is expected.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw database key.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw database key.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
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

entity_id!(
    /// Identity of an authenticated user, resolved by the access gate.
    UserId
);
entity_id!(
    /// Catalog product key.
    ProductId
);
entity_id!(
    /// Optional product category key.
    CategoryId
);
entity_id!(
    /// A user's cart. One per user, reused across orders.
    CartId
);
entity_id!(
    /// A single line in a cart.
    CartItemId
);
entity_id!(
    /// A placed order.
    OrderId
);
entity_id!(
    /// A single line in a placed order.
    OrderItemId
);
