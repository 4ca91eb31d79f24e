//! # Familiar Gameplay
//!
//! Server-side companion systems for Project Familiar.
//!
//! This crate provides the pet controller and the world layer it runs on:
//! - Combatants, the arena registry and generic damage resolution
//! - Pet state machine driven by per-state rule tables
//! - Aggro rules and target selection
//! - Leveling ledger and level tables
//! - Skills with cast windows and cooldowns
//! - Mover boundary for pathing
//! - Owner item checkpoints and revives
//! - Lifecycle hooks and an event bus for inter-system communication

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod aggro;
pub mod combat;
pub mod config;
pub mod entity;
pub mod events;
pub mod fsm;
pub mod hooks;
pub mod leveling;
pub mod mover;
pub mod pet;
pub mod skill;
pub mod sync;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggro::*;
    pub use crate::combat::*;
    pub use crate::config::*;
    pub use crate::entity::*;
    pub use crate::events::*;
    pub use crate::fsm::*;
    pub use crate::hooks::*;
    pub use crate::leveling::*;
    pub use crate::mover::*;
    pub use crate::pet::*;
    pub use crate::skill::*;
    pub use crate::sync::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use familiar_common::EntityId;
    use glam::Vec3;

    #[test]
    fn test_pet_hunts_and_levels_up() {
        let mut world = CombatantArena::new();
        let store = PetItemStore::new();
        let bus_notifier = BusOwnerNotifier::new(world.events().sender());

        let owner = world.spawn(Combatant::new(CombatantKind::Player, Vec3::ZERO));
        let mut pet = Pet::summon(&mut world, owner, Vec3::X, PetConfig::default())
            .expect("default config is valid");
        store.add_pet_item(owner, pet.id(), PetSnapshot::default());

        let wolf = world.spawn(
            Combatant::new(CombatantKind::HOSTILE_NPC, Vec3::new(2.5, 0.0, 0.0))
                .with_health(Health::new(20)),
        );
        assert!(pet.on_owner_attacked(wolf, &world));

        let mut mover = MockMover::new();
        let mut sync = store.clone();
        let mut notifier = bus_notifier;
        let mut now = 0.0;
        for _ in 0..8 {
            let mut ctx = TickContext {
                now,
                world: &mut world,
                mover: &mut mover,
                owner_sync: &mut sync,
                owner_combat: &mut notifier,
            };
            pet.tick(&mut ctx);
            now += 0.5;
        }

        assert!(!world.get(wolf).expect("corpse stays until removed").is_alive());
        assert_eq!(pet.target(), None);
        assert_eq!(pet.state(), PetState::Idle);

        let hits: Vec<EntityId> = world
            .events()
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                SimEvent::OwnerPetDamage { victim, .. } => Some(victim),
                _ => None,
            })
            .collect();
        assert_eq!(hits, vec![wolf, wolf]);

        let reward = pet.config().levels.experience_max(1);
        assert_eq!(pet.grant_experience(reward, &mut world, &mut sync), 1);
        let slot = store.slot(owner, pet.id()).expect("pet item");
        assert_eq!(slot.snapshot.level, 2);
    }
}
