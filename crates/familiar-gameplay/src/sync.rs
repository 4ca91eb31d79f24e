//! Write-through of live pet state into the owner's pet item.
//!
//! Pets are stored as items in their owner's inventory. The live entity
//! copies its health, level and experience into that item at checkpoints
//! (level-up, death, destruction) so a crash loses as little as possible.

use std::sync::Arc;

use ahash::AHashMap;
use familiar_common::EntityId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for owner item synchronization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Owner has no inventory in the store
    #[error("Owner {0} not found")]
    OwnerNotFound(EntityId),
    /// Owner has no item for this pet
    #[error("Owner {owner} has no item for pet {pet}")]
    SlotNotFound {
        /// Owner entity
        owner: EntityId,
        /// Pet entity
        pet: EntityId,
    },
    /// Revive requested for a living pet
    #[error("Pet {0} is not dead")]
    NotDead(EntityId),
    /// Owner cannot pay the revive price
    #[error("Insufficient gold: need {needed}, have {have}")]
    InsufficientGold {
        /// Price
        needed: u64,
        /// Owner's gold
        have: u64,
    },
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// State copied into the owner's pet item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PetSnapshot {
    /// Current health
    pub health: i32,
    /// Level
    pub level: u32,
    /// Experience toward the next level
    pub experience: i64,
}

/// Destination of pet checkpoints.
pub trait OwnerSyncBridge {
    /// Stores `snapshot` in the owner's item for `pet`.
    fn sync_to_owner_item(
        &mut self,
        owner: EntityId,
        pet: EntityId,
        snapshot: PetSnapshot,
    ) -> SyncResult<()>;
}

/// One pet item in an owner's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetItemSlot {
    /// Pet the item summons
    pub pet: EntityId,
    /// Last synchronized state
    pub snapshot: PetSnapshot,
}

/// Per-owner pet items shared with the rest of the simulation.
///
/// Clones share the same storage. All writes go through the inner lock, so
/// checkpoints never interleave with other inventory edits.
#[derive(Debug, Clone, Default)]
pub struct PetItemStore {
    inner: Arc<Mutex<AHashMap<EntityId, Vec<PetItemSlot>>>>,
}

impl PetItemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an owner with no pet items.
    pub fn add_owner(&self, owner: EntityId) {
        self.inner.lock().entry(owner).or_default();
    }

    /// Adds a pet item to an owner's inventory.
    pub fn add_pet_item(&self, owner: EntityId, pet: EntityId, snapshot: PetSnapshot) {
        self.inner
            .lock()
            .entry(owner)
            .or_default()
            .push(PetItemSlot { pet, snapshot });
    }

    /// Copy of a pet item.
    #[must_use]
    pub fn slot(&self, owner: EntityId, pet: EntityId) -> Option<PetItemSlot> {
        self.inner
            .lock()
            .get(&owner)?
            .iter()
            .find(|slot| slot.pet == pet)
            .cloned()
    }

    /// Removes a pet item, e.g. to rebind it to a newly summoned pet.
    pub fn take_pet_item(&self, owner: EntityId, pet: EntityId) -> Option<PetItemSlot> {
        let mut inventories = self.inner.lock();
        let items = inventories.get_mut(&owner)?;
        let index = items.iter().position(|slot| slot.pet == pet)?;
        Some(items.remove(index))
    }

    /// Number of pet items an owner holds.
    #[must_use]
    pub fn item_count(&self, owner: EntityId) -> usize {
        self.inner.lock().get(&owner).map_or(0, Vec::len)
    }

    /// Revives a dead pet item, charging `price` from `gold`.
    ///
    /// Health is restored to `health_max`. Nothing is charged on error.
    pub fn revive(
        &self,
        owner: EntityId,
        pet: EntityId,
        health_max: i32,
        price: u64,
        gold: &mut u64,
    ) -> SyncResult<()> {
        let mut inventories = self.inner.lock();
        let slot = inventories
            .get_mut(&owner)
            .ok_or(SyncError::OwnerNotFound(owner))?
            .iter_mut()
            .find(|slot| slot.pet == pet)
            .ok_or(SyncError::SlotNotFound { owner, pet })?;

        if slot.snapshot.health > 0 {
            return Err(SyncError::NotDead(pet));
        }
        if *gold < price {
            return Err(SyncError::InsufficientGold {
                needed: price,
                have: *gold,
            });
        }

        *gold -= price;
        slot.snapshot.health = health_max;
        tracing::info!("Owner {owner} revived pet {pet} for {price} gold");
        Ok(())
    }
}

impl OwnerSyncBridge for PetItemStore {
    fn sync_to_owner_item(
        &mut self,
        owner: EntityId,
        pet: EntityId,
        snapshot: PetSnapshot,
    ) -> SyncResult<()> {
        let mut inventories = self.inner.lock();
        let slot = inventories
            .get_mut(&owner)
            .ok_or(SyncError::OwnerNotFound(owner))?
            .iter_mut()
            .find(|slot| slot.pet == pet)
            .ok_or(SyncError::SlotNotFound { owner, pet })?;

        slot.snapshot = snapshot;
        Ok(())
    }
}
