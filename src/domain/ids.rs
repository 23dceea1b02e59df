use std::fmt;
use uuid::Uuid;

/// Defines a typed id newtype over a UUID.
///
/// Ids are generated with `now_v7`, so they sort by creation time.
macro_rules! entity_id {
    ($(#[$docs:meta])* $name:ident) => {
        $(#[$docs])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id! {
    /// Identifies a product in the catalog.
    ProductId
}

entity_id! {
    /// Identifies a registered user.
    UserId
}

entity_id! {
    /// Identifies a purchase order.
    OrderId
}

entity_id! {
    /// Identifies a single line within an order.
    OrderItemId
}
