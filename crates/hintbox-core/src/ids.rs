//! Typed ID wrappers providing compile-time safety for entity identifiers.
//!
//! Track and meta-item IDs are small integers assigned monotonically by the
//! owning movie and never reused within its lifetime, so the newtypes wrap
//! `u32` rather than a random identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a newtype ID wrapper over `u32`.
///
/// The macro produces a struct with:
/// - `new(raw)` and `as_u32()` accessors
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`,
///   `Serialize`, `Deserialize`
/// - `Display` delegating to the inner value
/// - `From<u32>` and `Into<u32>` conversions
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
                Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(u32);

            impl $name {
                /// Wrap a raw numeric ID.
                #[must_use]
                pub const fn new(raw: u32) -> Self {
                    Self(raw)
                }

                /// Return the raw numeric value.
                #[must_use]
                pub const fn as_u32(&self) -> u32 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u32> for $name {
                fn from(raw: u32) -> Self {
                    Self(raw)
                }
            }

            impl From<$name> for u32 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

typed_id! {
    /// Stable identifier of a track within one movie, assigned at track
    /// creation and never reused.
    TrackId,
    /// Identifier of an item inside a meta store.
    ItemId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_id_roundtrip() {
        let id = TrackId::new(4);
        assert_eq!(id.as_u32(), 4);
        assert_eq!(u32::from(id), 4);
        assert_eq!(TrackId::from(4u32), id);
        assert_eq!(id.to_string(), "4");
    }

    #[test]
    fn ids_are_distinct_types() {
        // Compile-time property; just exercise both constructors.
        let t = TrackId::new(1);
        let i = ItemId::new(1);
        assert_eq!(t.as_u32(), i.as_u32());
    }

    #[test]
    fn serde_transparent() {
        let id = TrackId::new(9);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "9");
        let back: TrackId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(TrackId::new(1) < TrackId::new(2));
    }
}
