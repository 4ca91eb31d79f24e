//! Damage resolution for pet attacks and owner notifications.
//!
//! Damage itself is resolved by the world registry. This module adds the
//! pet-specific part: every combatant hit by a pet is reported to the pet's
//! owner, split by what kind of combatant it was, so the owner's reward and
//! reputation systems can react as if the owner had struck the blow.

use crossbeam_channel::Sender;
use familiar_common::EntityId;

use crate::entity::{CombatantKind, CombatantRegistry};
use crate::events::{SimEvent, VictimCategory};

/// Damage left after flat defense.
#[must_use]
pub fn mitigate(amount: i32, defense: i32) -> i32 {
    (amount - defense).max(0)
}

/// Owner-side reactions to damage dealt by the owner's pet.
pub trait OwnerCombatHandler {
    /// A hostile NPC was hit.
    fn on_damage_dealt_to_hostile(&mut self, owner: EntityId, pet: EntityId, victim: EntityId);

    /// Another player was hit.
    fn on_damage_dealt_to_player(&mut self, owner: EntityId, pet: EntityId, victim: EntityId);

    /// Another pet was hit.
    fn on_damage_dealt_to_pet(&mut self, owner: EntityId, pet: EntityId, victim: EntityId);
}

/// Category of a combatant kind as seen by owner notifications.
///
/// Peaceful NPCs have no owner notification.
#[must_use]
pub const fn victim_category(kind: CombatantKind) -> Option<VictimCategory> {
    match kind {
        CombatantKind::Npc { hostile: true } => Some(VictimCategory::Hostile),
        CombatantKind::Npc { hostile: false } => None,
        CombatantKind::Player => Some(VictimCategory::Player),
        CombatantKind::Pet { .. } => Some(VictimCategory::Pet),
    }
}

/// Deals pet damage through `world` and notifies the owner per victim.
///
/// Victims that vanished during resolution are skipped. Without an owner the
/// damage still lands but nobody is notified.
pub fn deal_pet_damage(
    world: &mut dyn CombatantRegistry,
    owner_combat: &mut dyn OwnerCombatHandler,
    pet: EntityId,
    owner: Option<EntityId>,
    target: EntityId,
    amount: i32,
    aoe_radius: f32,
) -> Vec<EntityId> {
    let affected = world.deal_damage_at(pet, target, amount, aoe_radius);

    let Some(owner) = owner else {
        return affected;
    };

    for &victim in &affected {
        let Some(category) = world.combatant(victim).and_then(|c| victim_category(c.kind())) else {
            continue;
        };
        match category {
            VictimCategory::Hostile => owner_combat.on_damage_dealt_to_hostile(owner, pet, victim),
            VictimCategory::Player => owner_combat.on_damage_dealt_to_player(owner, pet, victim),
            VictimCategory::Pet => owner_combat.on_damage_dealt_to_pet(owner, pet, victim),
        }
    }

    affected
}

/// Forwards owner notifications onto the simulation event bus.
#[derive(Debug, Clone)]
pub struct BusOwnerNotifier {
    sender: Sender<SimEvent>,
}

impl BusOwnerNotifier {
    /// Creates a notifier publishing through `sender`.
    #[must_use]
    pub const fn new(sender: Sender<SimEvent>) -> Self {
        Self { sender }
    }

    fn publish(&self, owner: EntityId, pet: EntityId, victim: EntityId, category: VictimCategory) {
        let event = SimEvent::OwnerPetDamage {
            owner,
            pet,
            victim,
            category,
        };
        if self.sender.try_send(event).is_err() {
            tracing::warn!("Dropped owner damage notification for {owner}");
        }
    }
}

impl OwnerCombatHandler for BusOwnerNotifier {
    fn on_damage_dealt_to_hostile(&mut self, owner: EntityId, pet: EntityId, victim: EntityId) {
        self.publish(owner, pet, victim, VictimCategory::Hostile);
    }

    fn on_damage_dealt_to_player(&mut self, owner: EntityId, pet: EntityId, victim: EntityId) {
        self.publish(owner, pet, victim, VictimCategory::Player);
    }

    fn on_damage_dealt_to_pet(&mut self, owner: EntityId, pet: EntityId, victim: EntityId) {
        self.publish(owner, pet, victim, VictimCategory::Pet);
    }
}

/// Handler that records notifications for inspection.
#[derive(Debug, Default)]
pub struct RecordingOwnerCombat {
    /// `(owner, pet, victim, category)` in call order
    pub calls: Vec<(EntityId, EntityId, EntityId, VictimCategory)>,
}

impl OwnerCombatHandler for RecordingOwnerCombat {
    fn on_damage_dealt_to_hostile(&mut self, owner: EntityId, pet: EntityId, victim: EntityId) {
        self.calls.push((owner, pet, victim, VictimCategory::Hostile));
    }

    fn on_damage_dealt_to_player(&mut self, owner: EntityId, pet: EntityId, victim: EntityId) {
        self.calls.push((owner, pet, victim, VictimCategory::Player));
    }

    fn on_damage_dealt_to_pet(&mut self, owner: EntityId, pet: EntityId, victim: EntityId) {
        self.calls.push((owner, pet, victim, VictimCategory::Pet));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Combatant, CombatantArena};
    use crate::events::EventBus;
    use glam::Vec3;

    #[test]
    fn test_mitigate_never_negative() {
        assert_eq!(mitigate(10, 3), 7);
        assert_eq!(mitigate(2, 5), 0);
    }

    #[test]
    fn test_victim_category() {
        assert_eq!(
            victim_category(CombatantKind::HOSTILE_NPC),
            Some(VictimCategory::Hostile)
        );
        assert_eq!(victim_category(CombatantKind::Npc { hostile: false }), None);
        assert_eq!(
            victim_category(CombatantKind::Player),
            Some(VictimCategory::Player)
        );
        assert_eq!(
            victim_category(CombatantKind::Pet { owner: None }),
            Some(VictimCategory::Pet)
        );
    }

    #[test]
    fn test_pet_damage_notifies_per_victim() {
        let mut world = CombatantArena::new();
        let owner = world.spawn(Combatant::new(CombatantKind::Player, Vec3::new(-10.0, 0.0, 0.0)));
        let pet = world.spawn(Combatant::new(
            CombatantKind::Pet { owner: Some(owner) },
            Vec3::ZERO,
        ));
        let rival = world.spawn(Combatant::new(CombatantKind::Player, Vec3::new(3.0, 0.0, 0.0)));
        let rival_pet = world.spawn(Combatant::new(
            CombatantKind::Pet { owner: Some(rival) },
            Vec3::new(3.5, 0.0, 0.0),
        ));
        let wolf = world.spawn(Combatant::new(CombatantKind::HOSTILE_NPC, Vec3::new(2.5, 0.0, 0.0)));

        let mut recorder = RecordingOwnerCombat::default();
        let hit = deal_pet_damage(&mut world, &mut recorder, pet, Some(owner), wolf, 5, 2.0);

        assert_eq!(hit, vec![wolf, rival, rival_pet]);
        assert_eq!(
            recorder.calls,
            vec![
                (owner, pet, wolf, VictimCategory::Hostile),
                (owner, pet, rival, VictimCategory::Player),
                (owner, pet, rival_pet, VictimCategory::Pet),
            ]
        );
    }

    #[test]
    fn test_ownerless_pet_damage_is_silent() {
        let mut world = CombatantArena::new();
        let pet = world.spawn(Combatant::new(CombatantKind::Pet { owner: None }, Vec3::ZERO));
        let wolf = world.spawn(Combatant::new(CombatantKind::HOSTILE_NPC, Vec3::X));

        let mut recorder = RecordingOwnerCombat::default();
        let hit = deal_pet_damage(&mut world, &mut recorder, pet, None, wolf, 5, 0.0);
        assert_eq!(hit, vec![wolf]);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_bus_notifier_publishes() {
        let bus = EventBus::new(4);
        let mut notifier = BusOwnerNotifier::new(bus.sender());
        let (owner, pet, victim) = (
            EntityId::from_raw(1),
            EntityId::from_raw(2),
            EntityId::from_raw(3),
        );

        notifier.on_damage_dealt_to_player(owner, pet, victim);
        assert_eq!(
            bus.drain(),
            vec![SimEvent::OwnerPetDamage {
                owner,
                pet,
                victim,
                category: VictimCategory::Player,
            }]
        );
    }
}
