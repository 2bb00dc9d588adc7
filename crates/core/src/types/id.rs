//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different commerce entities.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` (`WooCommerce` IDs are 64-bit) with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
/// - `FromStr` so IDs can be parsed from command-line arguments
///
/// # Example
///
/// ```rust
/// # use streetgasm_core::define_id;
/// define_id!(MemberId);
/// define_id!(InvoiceId);
///
/// let member_id = MemberId::new(1);
/// let invoice_id = InvoiceId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: MemberId = invoice_id;
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
            Hash,
            PartialOrd,
            Ord,
            Default,
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

// Commerce entity IDs
define_id!(SubscriptionId);
define_id!(CustomerId);
define_id!(OrderId);
define_id!(ProductId);
define_id!(LineItemId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = SubscriptionId::new(4211);
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("4211"));

        let parsed: OrderId = serde_json::from_str("77").unwrap_or_default();
        assert_eq!(parsed.as_i64(), 77);
    }

    #[test]
    fn test_id_from_str_trims_input() {
        let id: CustomerId = " 42 ".parse().unwrap_or_default();
        assert_eq!(id, CustomerId::new(42));
        assert!("abc".parse::<CustomerId>().is_err());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ProductId::new(9).to_string(), "9");
    }
}
