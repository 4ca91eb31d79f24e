//! Handle types for entities living in the simulation world.
//!
//! Entities never hold references to each other. A pet stores the
//! [`EntityId`] of its owner and its target and resolves them through a
//! registry every tick, so a destroyed entity simply stops resolving.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an entity in the simulation world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(0);

    /// Creates an entity ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid (non-null) entity ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequential, deterministic allocator for entity IDs.
///
/// Two simulations that spawn in the same order hand out the same IDs,
/// which keeps replays and tests reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIdAllocator {
    next: u64,
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityIdAllocator {
    /// Creates an allocator whose first ID is `#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Hands out the next unused ID.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Makes sure `id` will never be handed out again.
    pub fn reserve(&mut self, id: EntityId) {
        self.next = self.next.max(id.0 + 1);
    }
}
