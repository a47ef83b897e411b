//! Strongly-typed identifiers used across the engine.
//!
//! Downstream crates (translate, operators, exec) should *not* use raw integers for IDs.
//! Ids are dense per-pipeline (or per-plan) counters, so they double as arena indices.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
            pub const fn index(self) -> usize {
                self.0 as usize
            }
            /// Id for the next slot of an arena that currently holds `len` entries.
            pub const fn from_index(len: usize) -> Self {
                Self(len as u64)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(
    /// Identity of a logical collection inside one `Pipeline`.
    CollectionId
);
new_id!(
    /// Identity of an applied transform inside one `Pipeline`.
    TransformId
);
new_id!(
    /// Handle to a physical node; only meaningful within the plan that minted it.
    NodeId
);
