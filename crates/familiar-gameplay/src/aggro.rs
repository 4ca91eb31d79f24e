//! Target selection.
//!
//! Who may attack whom, and when an incoming attacker takes over as the
//! pet's target. A challenger only replaces the current target when it is
//! clearly closer, so two enemies at similar range do not make the pet
//! flip between them every hit.

use familiar_common::EntityId;
use glam::Vec3;
use tracing::debug;

use crate::config::AGGRO_SWITCH_RATIO;
use crate::entity::{Combatant, CombatantKind, CombatantRegistry};
use crate::pet::Pet;

/// Whether `attacker` may damage `victim`.
///
/// Both must be alive and distinct. Pets may attack hostile NPCs, players
/// other than their owner and pets of other owners. Players may attack
/// hostile NPCs, other players and pets they do not own. Hostile NPCs attack
/// players and pets.
#[must_use]
pub fn can_attack(attacker: &Combatant, victim: &Combatant) -> bool {
    if attacker.id() == victim.id() || !attacker.is_alive() || !victim.is_alive() {
        return false;
    }

    match (attacker.kind(), victim.kind()) {
        (CombatantKind::Pet { owner }, CombatantKind::Player) => owner != Some(victim.id()),
        (CombatantKind::Pet { owner }, CombatantKind::Pet { owner: other }) => owner != other,
        (CombatantKind::Player, CombatantKind::Player) => true,
        (CombatantKind::Player, CombatantKind::Pet { owner }) => owner != Some(attacker.id()),
        (CombatantKind::Pet { .. } | CombatantKind::Player, CombatantKind::Npc { hostile }) => {
            hostile
        },
        (
            CombatantKind::Npc { hostile },
            CombatantKind::Player | CombatantKind::Pet { .. },
        ) => hostile,
        (CombatantKind::Npc { .. }, CombatantKind::Npc { .. }) => false,
    }
}

/// Whether a challenger at `challenger` should replace the target at
/// `current`, both seen from `origin`.
#[must_use]
pub fn should_switch_target(origin: Vec3, current: Vec3, challenger: Vec3) -> bool {
    origin.distance(challenger) < AGGRO_SWITCH_RATIO * origin.distance(current)
}

impl Pet {
    /// Reacts to being attacked by `attacker`.
    ///
    /// Returns whether the attacker became the target.
    pub fn on_aggro(&mut self, attacker: EntityId, world: &dyn CombatantRegistry) -> bool {
        let Some(me) = world.combatant(self.id) else {
            return false;
        };
        let Some(challenger) = world.combatant(attacker) else {
            return false;
        };
        if !can_attack(me, challenger) {
            return false;
        }

        let adopt = match self.target.and_then(|id| world.combatant(id)) {
            None => true,
            Some(current) if current.id() == attacker => false,
            Some(current) => {
                should_switch_target(me.position(), current.position(), challenger.position())
            },
        };

        if adopt {
            debug!("Pet {} targets {attacker}", self.id);
            self.target = Some(attacker);
        }
        adopt
    }

    /// Reacts to the owner being attacked.
    pub fn on_owner_attacked(&mut self, attacker: EntityId, world: &dyn CombatantRegistry) -> bool {
        self.config.defend_owner && self.on_aggro(attacker, world)
    }

    /// Reacts to the owner attacking `victim`.
    pub fn on_owner_attacking(&mut self, victim: EntityId, world: &dyn CombatantRegistry) -> bool {
        self.config.auto_attack && self.on_aggro(victim, world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PetConfig;
    use crate::entity::CombatantArena;

    struct Scene {
        world: CombatantArena,
        owner: EntityId,
        pet: Pet,
    }

    fn scene(config: PetConfig) -> Scene {
        let mut world = CombatantArena::new();
        let owner = world.spawn(Combatant::new(CombatantKind::Player, Vec3::new(0.0, 0.0, -2.0)));
        let pet = Pet::summon(&mut world, owner, Vec3::ZERO, config).expect("valid config");
        Scene { world, owner, pet }
    }

    fn hostile(world: &mut CombatantArena, x: f32) -> EntityId {
        world.spawn(Combatant::new(CombatantKind::HOSTILE_NPC, Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_can_attack_rejects_friends_and_corpses() {
        let Scene {
            mut world,
            owner,
            pet,
        } = scene(PetConfig::default());
        let sibling = world.spawn(Combatant::new(
            CombatantKind::Pet { owner: Some(owner) },
            Vec3::X,
        ));
        let wolf = hostile(&mut world, 3.0);

        let me = world.get(pet.id()).expect("pet");
        assert!(!can_attack(me, me));
        assert!(!can_attack(me, world.get(owner).expect("owner")));
        assert!(!can_attack(me, world.get(sibling).expect("sibling")));
        assert!(can_attack(me, world.get(wolf).expect("wolf")));

        world.get_mut(wolf).expect("wolf").health_mut().damage(1_000);
        let me = world.get(pet.id()).expect("pet");
        assert!(!can_attack(me, world.get(wolf).expect("wolf")));
    }

    #[test]
    fn test_can_attack_strangers() {
        let mut world = CombatantArena::new();
        let owner = world.spawn(Combatant::new(CombatantKind::Player, Vec3::ZERO));
        let stranger = world.spawn(Combatant::new(CombatantKind::Player, Vec3::X));
        let pet = world.spawn(Combatant::new(CombatantKind::Pet { owner: Some(owner) }, Vec3::Y));
        let other_pet = world.spawn(Combatant::new(
            CombatantKind::Pet {
                owner: Some(stranger),
            },
            Vec3::Z,
        ));
        let villager = world.spawn(Combatant::new(CombatantKind::Npc { hostile: false }, Vec3::ONE));

        let get = |id| world.get(id).expect("spawned");
        assert!(can_attack(get(pet), get(stranger)));
        assert!(can_attack(get(pet), get(other_pet)));
        assert!(!can_attack(get(pet), get(villager)));
        assert!(!can_attack(get(owner), get(pet)));
        assert!(can_attack(get(stranger), get(pet)));
        assert!(!can_attack(get(villager), get(owner)));
    }

    #[test]
    fn test_switch_hysteresis() {
        let origin = Vec3::ZERO;
        let current = Vec3::new(10.0, 0.0, 0.0);
        assert!(!should_switch_target(origin, current, Vec3::new(9.0, 0.0, 0.0)));
        assert!(should_switch_target(origin, current, Vec3::new(7.0, 0.0, 0.0)));
    }

    #[test]
    fn test_on_aggro_adopts_then_keeps_or_replaces() {
        let Scene {
            mut world, mut pet, ..
        } = scene(PetConfig::default());
        let far = hostile(&mut world, 10.0);
        let near = hostile(&mut world, 9.0);
        let close = hostile(&mut world, 7.0);

        assert!(pet.on_aggro(far, &world));
        assert_eq!(pet.target(), Some(far));

        assert!(!pet.on_aggro(near, &world));
        assert_eq!(pet.target(), Some(far));

        assert!(pet.on_aggro(close, &world));
        assert_eq!(pet.target(), Some(close));
    }

    #[test]
    fn test_on_aggro_ignores_invalid_attackers() {
        let Scene {
            world,
            owner,
            mut pet,
        } = scene(PetConfig::default());

        assert!(!pet.on_aggro(EntityId::from_raw(999), &world));
        assert!(!pet.on_aggro(owner, &world));
        assert_eq!(pet.target(), None);
    }

    #[test]
    fn test_on_aggro_replaces_vanished_target() {
        let Scene {
            mut world, mut pet, ..
        } = scene(PetConfig::default());
        let first = hostile(&mut world, 5.0);
        let second = hostile(&mut world, 50.0);

        assert!(pet.on_aggro(first, &world));
        world.despawn(first).expect("despawn");
        assert!(pet.on_aggro(second, &world));
        assert_eq!(pet.target(), Some(second));
    }

    #[test]
    fn test_owner_driven_aggro_respects_flags() {
        let config = PetConfig {
            defend_owner: false,
            auto_attack: true,
            ..PetConfig::default()
        };
        let Scene {
            mut world, mut pet, ..
        } = scene(config);
        let wolf = hostile(&mut world, 4.0);

        assert!(!pet.on_owner_attacked(wolf, &world));
        assert_eq!(pet.target(), None);

        assert!(pet.on_owner_attacking(wolf, &world));
        assert_eq!(pet.target(), Some(wolf));
    }
}
