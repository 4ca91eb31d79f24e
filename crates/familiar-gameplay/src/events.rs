//! Event bus carrying simulation notifications out of the pet systems.
//!
//! Gameplay code publishes into the bus without blocking; the owning
//! simulation drains it once per tick and reacts (despawns entities, hands
//! out rewards, flags murderers, replicates level-ups).

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use familiar_common::EntityId;

/// Category of a combatant hit by damage a pet dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VictimCategory {
    /// Hostile NPC
    Hostile,
    /// Another player
    Player,
    /// Another pet
    Pet,
}

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Entity asked to be removed from the world
    DestroyRequested {
        /// Entity ID
        entity_id: EntityId,
    },
    /// Pet reached a new level
    PetLeveledUp {
        /// Pet entity
        pet: EntityId,
        /// Level after the increment
        level: u32,
    },
    /// Pet died
    PetDied {
        /// Pet entity
        pet: EntityId,
        /// When the corpse may be removed
        death_time_end: f64,
    },
    /// Damage dealt by an owner's pet, for the owner's reward systems
    OwnerPetDamage {
        /// Owner of the pet
        owner: EntityId,
        /// Pet that dealt the damage
        pet: EntityId,
        /// Combatant that was hit
        victim: EntityId,
        /// What kind of combatant was hit
        category: VictimCategory,
    },
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<SimEvent>,
    /// Receiver for collecting events
    receiver: Receiver<SimEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: SimEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::warn!("Event bus full ({} pending), dropping event", self.capacity);
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<SimEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<SimEvent> {
        self.sender.clone()
    }
}
