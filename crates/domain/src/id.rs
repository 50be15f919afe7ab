//! Typed global identifiers backed by UUIDs.
//!
//! Global ids are unique system-wide and never reused. Local ids (the
//! addresses a hub uses on the wire) are plain strings scoped to their
//! owning device and live on the entities themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            ///
            /// UUID v4, so two calls never collide in practice.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Global, system-wide identifier for a [`Device`](crate::device::Device).
    DeviceId
);

define_id!(
    /// Global identifier for a [`Zone`](crate::zone::Zone).
    ZoneId
);

define_id!(
    /// Global identifier for a [`Button`](crate::button::Button).
    ButtonId
);

define_id!(
    /// Identifier for a [`RecipeDefinition`](crate::recipe::RecipeDefinition).
    RecipeId
);

define_id!(
    /// Identifier for an [`Event`](crate::event::Event).
    EventId
);
