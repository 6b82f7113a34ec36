//! Arena indices for model nodes.
//!
//! Every cross-node link in the model (parent, origin, resolved reference,
//! include) is one of these indices, never an owning pointer, so cyclic
//! graphs are represented without shared ownership.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Index of an artifact (definition or member) in [`Model`](super::Model).
    ArtifactId,
    "art"
);
arena_id!(
    /// Index of a reference (path expression) in the model's reference arena.
    RefId,
    "ref"
);
arena_id!(
    /// Index of a pending `extend`/`annotate` statement.
    ExtensionId,
    "ext"
);
