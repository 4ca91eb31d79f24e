//! Combatants and the arena-backed world registry.
//!
//! This is the generic entity layer the pet systems build on: health and
//! mana pools, buffs, positions and basic damage resolution. Pets, owners and
//! their enemies all live in a [`CombatantRegistry`] and refer to each other
//! only through [`EntityId`] handles.

use ahash::AHashMap;
use familiar_common::{Bounds, EntityId, EntityIdAllocator, Timestamp};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggro::can_attack;
use crate::combat::mitigate;
use crate::events::{EventBus, SimEvent};

/// Error types for arena operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Entity not found
    #[error("Combatant not found: {0}")]
    NotFound(EntityId),
    /// Entity already despawned
    #[error("Combatant already despawned: {0}")]
    AlreadyDespawned(EntityId),
}

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Type of combatant in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    /// Player character
    Player,
    /// Non-player character
    Npc {
        /// Whether the NPC fights players
        hostile: bool,
    },
    /// Companion summoned by a player
    Pet {
        /// Summoning player, if it still exists
        owner: Option<EntityId>,
    },
}

impl CombatantKind {
    /// Shorthand for a hostile NPC.
    pub const HOSTILE_NPC: Self = Self::Npc { hostile: true };

    /// Returns the owner handle for pets.
    #[must_use]
    pub const fn owner(self) -> Option<EntityId> {
        match self {
            Self::Pet { owner } => owner,
            _ => None,
        }
    }
}

/// Health component for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health
    current: i32,
    /// Maximum health
    max: i32,
}

impl Health {
    /// Creates a full health pool.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Creates a pool with explicit current value, clamped to `0..=max`.
    #[must_use]
    pub fn with_current(current: i32, max: i32) -> Self {
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// Returns current health.
    #[must_use]
    pub const fn current(&self) -> i32 {
        self.current
    }

    /// Returns maximum health.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Applies damage.
    pub fn damage(&mut self, amount: i32) {
        self.current = (self.current - amount).max(0);
    }

    /// Applies healing.
    pub fn heal(&mut self, amount: i32) {
        self.current = (self.current + amount).min(self.max);
    }

    /// Changes the maximum, keeping current health within it.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.min(self.max);
    }

    /// Checks if dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current <= 0
    }
}

/// Mana pool for casters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mana {
    current: i32,
    max: i32,
}

impl Mana {
    /// Creates a full mana pool.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Returns current mana.
    #[must_use]
    pub const fn current(&self) -> i32 {
        self.current
    }

    /// Returns maximum mana.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Whether `cost` can be paid.
    #[must_use]
    pub const fn can_afford(&self, cost: i32) -> bool {
        self.current >= cost
    }

    /// Pays `cost`, never dropping below zero.
    pub fn spend(&mut self, cost: i32) {
        self.current = (self.current - cost).max(0);
    }

    /// Changes the maximum, keeping current mana within it.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.min(self.max);
    }
}

/// Timed effect on a combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    /// Display name
    pub name: String,
    /// When the buff wears off
    pub expires_at: Timestamp,
}

/// A combatant in the simulation world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    /// Unique identifier, assigned by the registry
    id: EntityId,
    /// Combatant type
    kind: CombatantKind,
    /// Display name
    name: String,
    /// Health pool
    health: Health,
    /// Mana pool
    mana: Mana,
    /// Flat damage reduction
    defense: i32,
    /// Collider volume; its center is the combatant position
    bounds: Bounds,
    /// Where the combatant is heading (its position when standing still)
    destination: Vec3,
    /// Heading around the Y axis, radians
    yaw: f32,
    /// Active buffs
    buffs: Vec<Buff>,
}

impl Combatant {
    /// Creates a combatant of the given kind standing at `position`.
    #[must_use]
    pub fn new(kind: CombatantKind, position: Vec3) -> Self {
        Self {
            id: EntityId::NULL,
            kind,
            name: String::new(),
            health: Health::new(100),
            mana: Mana::default(),
            defense: 0,
            bounds: Bounds::new(position, Vec3::splat(0.5)),
            destination: position,
            yaw: 0.0,
            buffs: Vec::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the health pool.
    #[must_use]
    pub const fn with_health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    /// Sets the mana pool.
    #[must_use]
    pub const fn with_mana(mut self, mana: Mana) -> Self {
        self.mana = mana;
        self
    }

    /// Sets flat damage reduction.
    #[must_use]
    pub const fn with_defense(mut self, defense: i32) -> Self {
        self.defense = defense;
        self
    }

    /// Sets collider half extents.
    #[must_use]
    pub const fn with_half_extents(mut self, half_extents: Vec3) -> Self {
        self.bounds.half_extents = half_extents;
        self
    }

    /// Returns the combatant's ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the combatant type.
    #[must_use]
    pub const fn kind(&self) -> CombatantKind {
        self.kind
    }

    /// Replaces the combatant type (e.g. a pet whose owner left).
    pub fn set_kind(&mut self, kind: CombatantKind) {
        self.kind = kind;
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the health pool.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Returns the health pool mutably.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Returns the mana pool.
    #[must_use]
    pub const fn mana(&self) -> &Mana {
        &self.mana
    }

    /// Returns the mana pool mutably.
    pub fn mana_mut(&mut self) -> &mut Mana {
        &mut self.mana
    }

    /// Returns flat damage reduction.
    #[must_use]
    pub const fn defense(&self) -> i32 {
        self.defense
    }

    /// Sets flat damage reduction.
    pub fn set_defense(&mut self, defense: i32) {
        self.defense = defense;
    }

    /// Whether health is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Returns the world position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.bounds.center
    }

    /// Moves the combatant.
    pub fn set_position(&mut self, position: Vec3) {
        self.bounds.center = position;
    }

    /// Returns the collider volume.
    #[must_use]
    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Returns the navigation destination.
    #[must_use]
    pub const fn destination(&self) -> Vec3 {
        self.destination
    }

    /// Sets the navigation destination.
    pub fn set_destination(&mut self, destination: Vec3) {
        self.destination = destination;
    }

    /// Returns the heading in radians.
    #[must_use]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Sets the heading in radians.
    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    /// Returns the active buffs.
    #[must_use]
    pub fn buffs(&self) -> &[Buff] {
        &self.buffs
    }

    /// Adds a buff.
    pub fn add_buff(&mut self, buff: Buff) {
        self.buffs.push(buff);
    }

    /// Removes every buff.
    pub fn clear_buffs(&mut self) {
        self.buffs.clear();
    }

    /// Drops buffs that expired at or before `now`.
    pub fn expire_buffs(&mut self, now: Timestamp) {
        self.buffs.retain(|buff| buff.expires_at > now);
    }
}

/// Handle-based view of the simulation world.
///
/// Lookups return `None` once an entity has been destroyed; callers treat
/// that as an ordinary event rather than an error.
pub trait CombatantRegistry {
    /// Resolves a handle.
    fn combatant(&self, id: EntityId) -> Option<&Combatant>;

    /// Resolves a handle mutably.
    fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant>;

    /// Deals `amount` to `target` and to attackable combatants within
    /// `aoe_radius` of it. Returns every combatant that was hit.
    fn deal_damage_at(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        amount: i32,
        aoe_radius: f32,
    ) -> Vec<EntityId>;

    /// Asks the simulation to remove an entity. Removal happens later.
    fn request_destroy(&mut self, id: EntityId);
}

/// Arena-based combatant storage.
///
/// Uses a free list for O(1) allocation and deallocation and a hash map for
/// O(1) handle lookup. Iteration follows slot order, so it is deterministic
/// for a given spawn/despawn sequence.
#[derive(Debug, Default)]
pub struct CombatantArena {
    /// Storage slots for combatants
    slots: Vec<Option<Combatant>>,
    /// Free slot indices for reuse
    free_list: Vec<usize>,
    /// Map from EntityId to slot index for fast lookup
    id_to_index: AHashMap<EntityId, usize>,
    /// ID source
    ids: EntityIdAllocator,
    /// Destruction requests not yet applied
    pending_destroy: Vec<EntityId>,
    /// Outgoing notifications
    events: EventBus,
}

impl CombatantArena {
    /// Creates a new empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new arena with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            id_to_index: AHashMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Returns the number of live combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_index.len()
    }

    /// Returns true if there are no live combatants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_index.is_empty()
    }

    /// Returns the total slot count (including free slots).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Event bus fed by this arena.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Spawns a combatant and returns its new ID.
    pub fn spawn(&mut self, mut combatant: Combatant) -> EntityId {
        let id = self.ids.allocate();
        combatant.id = id;

        let index = if let Some(free_index) = self.free_list.pop() {
            self.slots[free_index] = Some(combatant);
            free_index
        } else {
            let index = self.slots.len();
            self.slots.push(Some(combatant));
            index
        };

        self.id_to_index.insert(id, index);
        id
    }

    /// Despawns a combatant by ID.
    pub fn despawn(&mut self, id: EntityId) -> ArenaResult<Combatant> {
        let index = self
            .id_to_index
            .remove(&id)
            .ok_or(ArenaError::NotFound(id))?;

        let combatant = self.slots[index]
            .take()
            .ok_or(ArenaError::AlreadyDespawned(id))?;

        self.free_list.push(index);
        Ok(combatant)
    }

    /// Gets a combatant by ID.
    pub fn get(&self, id: EntityId) -> ArenaResult<&Combatant> {
        let index = self.id_to_index.get(&id).ok_or(ArenaError::NotFound(id))?;
        self.slots[*index].as_ref().ok_or(ArenaError::NotFound(id))
    }

    /// Gets a combatant mutably by ID.
    pub fn get_mut(&mut self, id: EntityId) -> ArenaResult<&mut Combatant> {
        let index = self.id_to_index.get(&id).ok_or(ArenaError::NotFound(id))?;
        self.slots[*index].as_mut().ok_or(ArenaError::NotFound(id))
    }

    /// Checks if a combatant with the given ID exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    /// Returns an iterator over all live combatants.
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Returns a mutable iterator over all live combatants.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Combatant> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Destruction requests waiting to be applied.
    #[must_use]
    pub fn pending_destroy(&self) -> &[EntityId] {
        &self.pending_destroy
    }

    /// Removes every combatant whose destruction was requested.
    ///
    /// Returns the removed combatants in request order.
    pub fn apply_destroy_requests(&mut self) -> Vec<Combatant> {
        let pending = std::mem::take(&mut self.pending_destroy);
        pending
            .into_iter()
            .filter_map(|id| self.despawn(id).ok())
            .collect()
    }
}

impl CombatantRegistry for CombatantArena {
    fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.get(id).ok()
    }

    fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.get_mut(id).ok()
    }

    fn deal_damage_at(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        amount: i32,
        aoe_radius: f32,
    ) -> Vec<EntityId> {
        let Ok(source) = self.get(attacker).cloned() else {
            return Vec::new();
        };
        let Ok(center) = self.get(target).map(Combatant::position) else {
            return Vec::new();
        };

        let mut victims = vec![target];
        if aoe_radius > 0.0 {
            victims.extend(
                self.iter()
                    .filter(|c| c.id != target && c.position().distance(center) <= aoe_radius)
                    .filter(|c| can_attack(&source, c))
                    .map(Combatant::id),
            );
        }

        for &victim in &victims {
            if let Ok(combatant) = self.get_mut(victim) {
                let dealt = mitigate(amount, combatant.defense);
                combatant.health.damage(dealt);
                tracing::trace!(
                    "{attacker} hit {victim} for {dealt} ({} left)",
                    combatant.health.current
                );
            }
        }

        victims
    }

    fn request_destroy(&mut self, id: EntityId) {
        if !self.pending_destroy.contains(&id) {
            self.pending_destroy.push(id);
            self.events.publish(SimEvent::DestroyRequested { entity_id: id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hostile_at(x: f32) -> Combatant {
        Combatant::new(CombatantKind::HOSTILE_NPC, Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_health_clamps() {
        let mut health = Health::new(50);
        health.damage(80);
        assert_eq!(health.current(), 0);
        assert!(health.is_dead());

        health.heal(500);
        assert_eq!(health.current(), 50);

        health.set_max(20);
        assert_eq!(health.current(), 20);
        assert_eq!(Health::with_current(-4, 10).current(), 0);
    }

    #[test]
    fn test_mana_spend() {
        let mut mana = Mana::new(30);
        assert!(mana.can_afford(30));
        mana.spend(25);
        assert!(!mana.can_afford(10));
        mana.spend(25);
        assert_eq!(mana.current(), 0);
    }

    #[test]
    fn test_kind_owner() {
        let owner = EntityId::from_raw(7);
        assert_eq!(CombatantKind::Pet { owner: Some(owner) }.owner(), Some(owner));
        assert_eq!(CombatantKind::Player.owner(), None);
    }

    #[test]
    fn test_arena_spawn_and_get() {
        let mut arena = CombatantArena::new();

        let id = arena.spawn(Combatant::new(CombatantKind::Player, Vec3::ZERO).with_name("Ayla"));
        assert!(id.is_valid());
        assert_eq!(arena.len(), 1);

        let combatant = arena.get(id).expect("Combatant should exist");
        assert_eq!(combatant.id(), id);
        assert_eq!(combatant.name(), "Ayla");
        assert_eq!(combatant.kind(), CombatantKind::Player);
    }

    #[test]
    fn test_arena_reuse_slot() {
        let mut arena = CombatantArena::new();

        let id1 = arena.spawn(hostile_at(0.0));
        arena.despawn(id1).expect("Despawn should succeed");
        assert_eq!(arena.capacity(), 1);
        assert!(arena.is_empty());

        let id2 = arena.spawn(hostile_at(1.0));
        assert_eq!(arena.capacity(), 1);
        assert_ne!(id1, id2);
        assert!(arena.combatant(id1).is_none());
    }

    #[test]
    fn test_arena_despawn_nonexistent() {
        let mut arena = CombatantArena::new();
        assert!(matches!(
            arena.despawn(EntityId::NULL),
            Err(ArenaError::NotFound(_))
        ));
    }

    #[test]
    fn test_deal_damage_single_target() {
        let mut arena = CombatantArena::new();
        let attacker = arena.spawn(Combatant::new(CombatantKind::Player, Vec3::ZERO));
        let target = arena.spawn(hostile_at(2.0).with_defense(3));
        let bystander = arena.spawn(hostile_at(2.5));

        let hit = arena.deal_damage_at(attacker, target, 10, 0.0);
        assert_eq!(hit, vec![target]);
        assert_eq!(arena.get(target).expect("target").health().current(), 93);
        assert_eq!(arena.get(bystander).expect("bystander").health().current(), 100);
    }

    #[test]
    fn test_deal_damage_aoe_skips_friends() {
        let mut arena = CombatantArena::new();
        let owner = arena.spawn(Combatant::new(CombatantKind::Player, Vec3::new(5.0, 0.0, 0.5)));
        let pet = arena.spawn(Combatant::new(
            CombatantKind::Pet { owner: Some(owner) },
            Vec3::ZERO,
        ));
        let target = arena.spawn(hostile_at(5.0));
        let near = arena.spawn(hostile_at(6.0));
        let far = arena.spawn(hostile_at(20.0));

        let hit = arena.deal_damage_at(pet, target, 10, 2.0);
        assert_eq!(hit, vec![target, near]);
        assert_eq!(arena.get(owner).expect("owner").health().current(), 100);
        assert_eq!(arena.get(far).expect("far").health().current(), 100);
    }

    #[test]
    fn test_deal_damage_missing_target() {
        let mut arena = CombatantArena::new();
        let attacker = arena.spawn(Combatant::new(CombatantKind::Player, Vec3::ZERO));
        assert!(arena
            .deal_damage_at(attacker, EntityId::from_raw(99), 10, 5.0)
            .is_empty());
    }

    #[test]
    fn test_request_destroy_once() {
        let mut arena = CombatantArena::new();
        let id = arena.spawn(hostile_at(0.0));

        arena.request_destroy(id);
        arena.request_destroy(id);
        assert_eq!(arena.pending_destroy(), &[id]);
        assert_eq!(
            arena.events().drain(),
            vec![SimEvent::DestroyRequested { entity_id: id }]
        );

        // Still resolvable until the simulation applies the request
        assert!(arena.contains(id));
        let removed = arena.apply_destroy_requests();
        assert_eq!(removed.len(), 1);
        assert!(!arena.contains(id));
        assert!(arena.pending_destroy().is_empty());
    }

    #[test]
    fn test_buff_expiry() {
        let mut combatant = hostile_at(0.0);
        combatant.add_buff(Buff {
            name: "Haste".into(),
            expires_at: 5.0,
        });
        combatant.add_buff(Buff {
            name: "Shield".into(),
            expires_at: 10.0,
        });

        combatant.expire_buffs(5.0);
        assert_eq!(combatant.buffs().len(), 1);

        combatant.clear_buffs();
        assert!(combatant.buffs().is_empty());
    }
}
