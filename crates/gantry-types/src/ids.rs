//! Arena handles for simulation objects.
//!
//! All cross-references in the kernel are index handles into owning arenas
//! rather than pointers, so teardown order never matters and reference
//! cycles cannot leak.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident, $display:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            /// Create a handle from a raw arena index.
            #[must_use]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Get the raw arena index.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($display, "({})"), self.0)
            }
        }
    };
}

handle_type!(
    /// Handle to a rigid body in the physics world.
    BodyHandle,
    "Body"
);

handle_type!(
    /// Handle to a collision geom in the physics world.
    GeomHandle,
    "Geom"
);

handle_type!(
    /// Handle to a joint in the physics world.
    JointHandle,
    "Joint"
);

handle_type!(
    /// Identifier of a node in the parsed scene element tree.
    ElementId,
    "Element"
);
