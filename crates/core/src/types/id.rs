//! Newtype IDs for type-safe entity references.
//!
//! The backend hands out plain integer identifiers for users and roles. The
//! `define_id!` macro wraps them so a `RoleId` can never be passed where a
//! `UserId` is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use talent_ops_core::define_id;
/// define_id!(TalentId);
/// define_id!(JobId);
///
/// let talent = TalentId::new(7);
/// let job = JobId::new(7);
/// assert_eq!(talent.as_i64(), job.as_i64());
///
/// // These are different types, so this won't compile:
/// // let _: TalentId = job;
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

define_id!(UserId);
define_id!(RoleId);

impl RoleId {
    /// Highest id reserved for the built-in roles.
    pub const MAX_RESERVED: i64 = 5;

    /// Built-in roles occupy ids `1..=5` and can never be deleted.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        self.0 >= 1 && self.0 <= Self::MAX_RESERVED
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversion() {
        let id = UserId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i64::from(id), 42);
        assert_eq!(UserId::from(42), id);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&RoleId::new(3)).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn test_reserved_role_ids() {
        assert!(RoleId::new(1).is_reserved());
        assert!(RoleId::new(5).is_reserved());
        assert!(!RoleId::new(6).is_reserved());
        assert!(!RoleId::new(0).is_reserved());
        assert!(!RoleId::new(1_700_000_000_000).is_reserved());
    }
}
