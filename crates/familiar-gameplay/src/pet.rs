//! The pet aggregate.
//!
//! A [`Pet`] is the controller state of a companion: its level ledger,
//! selected skill, target and lifecycle bookkeeping. Health, mana and
//! position live on the pet's [`Combatant`] in the world registry; the pet
//! only holds handles.

use familiar_common::{ConfigResult, EntityId, Timestamp};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PetConfig;
use crate::entity::{Combatant, CombatantArena, CombatantKind, CombatantRegistry, Health, Mana};
use crate::fsm::TickContext;
use crate::hooks::{Died, LevelUp, PetHooks};
use crate::leveling::{Ledger, LevelStats};
use crate::skill::SkillBook;
use crate::sync::{OwnerSyncBridge, PetSnapshot};

/// Behavior state of a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PetState {
    /// Standing by, choosing what to do next
    #[default]
    Idle,
    /// Following a path
    Moving,
    /// Inside a cast window
    Casting,
    /// Waiting to be destroyed
    Dead,
}

/// Companion controlled by the server.
#[derive(Debug)]
pub struct Pet {
    pub(crate) id: EntityId,
    pub(crate) owner: Option<EntityId>,
    pub(crate) ledger: Ledger,
    pub(crate) state: PetState,
    pub(crate) current_skill: Option<usize>,
    pub(crate) target: Option<EntityId>,
    pub(crate) death_time_end: Timestamp,
    pub(crate) destroy_requested: bool,
    pub(crate) skills: SkillBook,
    pub(crate) config: PetConfig,
    /// Lifecycle observers
    pub hooks: PetHooks,
}

impl Pet {
    /// Creates the controller for an already spawned combatant.
    ///
    /// Fails if `config` is invalid.
    pub fn new(id: EntityId, owner: Option<EntityId>, config: PetConfig) -> ConfigResult<Self> {
        config.validate()?;
        let ledger = Ledger::new(config.start_level, 0, &config.levels)?;
        Ok(Self {
            id,
            owner,
            ledger,
            state: PetState::Idle,
            current_skill: None,
            target: None,
            death_time_end: 0.0,
            destroy_requested: false,
            skills: SkillBook::new(config.skills.clone()),
            config,
            hooks: PetHooks::default(),
        })
    }

    /// Spawns a pet combatant for `owner` at `position` and returns its
    /// controller. Nothing is spawned if `config` is invalid.
    pub fn summon(
        arena: &mut CombatantArena,
        owner: EntityId,
        position: Vec3,
        config: PetConfig,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let mut combatant = Combatant::new(CombatantKind::Pet { owner: Some(owner) }, position);
        if let Some(stats) = config.levels.get(config.start_level) {
            combatant = combatant
                .with_health(Health::new(stats.health_max))
                .with_mana(Mana::new(stats.mana_max))
                .with_defense(stats.base_defense);
        }

        let id = arena.spawn(combatant);
        info!("Owner {owner} summoned pet {id}");
        Self::new(id, Some(owner), config)
    }

    /// Returns the pet's entity ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the summoning player, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    /// Returns the current behavior state.
    #[must_use]
    pub const fn state(&self) -> PetState {
        self.state
    }

    /// Returns the current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.ledger.level()
    }

    /// Returns experience toward the next level.
    #[must_use]
    pub const fn experience(&self) -> i64 {
        self.ledger.experience()
    }

    /// Returns the selected skill index.
    #[must_use]
    pub const fn current_skill(&self) -> Option<usize> {
        self.current_skill
    }

    /// Returns the combat target.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Replaces the combat target without any checks.
    pub fn set_target(&mut self, target: Option<EntityId>) {
        self.target = target;
    }

    /// When a dead pet may be destroyed.
    #[must_use]
    pub const fn death_time_end(&self) -> Timestamp {
        self.death_time_end
    }

    /// Whether destruction has already been requested.
    #[must_use]
    pub const fn destroy_requested(&self) -> bool {
        self.destroy_requested
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PetConfig {
        &self.config
    }

    /// Returns the known skills.
    #[must_use]
    pub const fn skills(&self) -> &SkillBook {
        &self.skills
    }

    /// Stats of the current level.
    #[must_use]
    pub fn level_stats(&self) -> Option<&LevelStats> {
        self.config.levels.get(self.ledger.level())
    }

    /// Pets keep updating with nobody around so they follow their owner.
    #[must_use]
    pub const fn is_worth_updating(&self) -> bool {
        true
    }

    /// State written into the owner's pet item.
    #[must_use]
    pub fn snapshot(&self, world: &dyn CombatantRegistry) -> PetSnapshot {
        PetSnapshot {
            health: world
                .combatant(self.id)
                .map_or(0, |c| c.health().current()),
            level: self.ledger.level(),
            experience: self.ledger.experience(),
        }
    }

    /// Writes a checkpoint through the owner sync bridge.
    ///
    /// Misses are logged and otherwise ignored.
    pub fn sync_owner_item(&self, world: &dyn CombatantRegistry, owner_sync: &mut dyn OwnerSyncBridge) {
        self.write_checkpoint(self.snapshot(world), owner_sync);
    }

    fn write_checkpoint(&self, snapshot: PetSnapshot, owner_sync: &mut dyn OwnerSyncBridge) {
        let Some(owner) = self.owner else {
            warn!("Pet {} has no owner, checkpoint skipped", self.id);
            return;
        };
        if let Err(e) = owner_sync.sync_to_owner_item(owner, self.id, snapshot) {
            warn!("Pet {} checkpoint failed: {e}", self.id);
        }
    }

    /// Adds `delta` experience, leveling up as needed.
    ///
    /// Every level gained updates the combatant's maxima and defense, writes
    /// a checkpoint and fires the `level_up` hook. Returns levels gained.
    pub fn grant_experience(
        &mut self,
        delta: i64,
        world: &mut dyn CombatantRegistry,
        owner_sync: &mut dyn OwnerSyncBridge,
    ) -> u32 {
        let target = self.ledger.experience().saturating_add(delta);
        self.set_experience(target, world, owner_sync)
    }

    /// Assigns experience, leveling up as needed.
    pub fn set_experience(
        &mut self,
        value: i64,
        world: &mut dyn CombatantRegistry,
        owner_sync: &mut dyn OwnerSyncBridge,
    ) -> u32 {
        let mut increments = Vec::new();
        let gained = self
            .ledger
            .set_experience(value, &self.config.levels, |level, experience| {
                increments.push((level, experience));
            });

        for (level, experience) in increments {
            if let Some(stats) = self.config.levels.get(level).copied() {
                if let Some(combatant) = world.combatant_mut(self.id) {
                    apply_level_stats(combatant, &stats);
                }
            }

            let health = world
                .combatant(self.id)
                .map_or(0, |c| c.health().current());
            self.write_checkpoint(
                PetSnapshot {
                    health,
                    level,
                    experience,
                },
                owner_sync,
            );

            info!("Pet {} reached level {level}", self.id);
            self.hooks.level_up.emit(&LevelUp {
                pet: self.id,
                level,
                experience,
            });
        }

        gained
    }

    /// Runs the death procedure.
    ///
    /// Starts the death timer, removes all buffs, drops the target and
    /// writes a checkpoint.
    pub fn on_death(&mut self, ctx: &mut TickContext<'_>) {
        self.death_time_end = ctx.now + self.config.death_duration;
        if let Some(combatant) = ctx.world.combatant_mut(self.id) {
            combatant.clear_buffs();
        }
        self.target = None;
        self.sync_owner_item(&*ctx.world, &mut *ctx.owner_sync);

        debug!("Pet {} died, removable at {}", self.id, self.death_time_end);
        self.hooks.died.emit(&Died {
            pet: self.id,
            death_time_end: self.death_time_end,
        });
    }

    /// Writes the final checkpoint before the pet leaves the world.
    pub fn on_destroy(&self, world: &dyn CombatantRegistry, owner_sync: &mut dyn OwnerSyncBridge) {
        self.sync_owner_item(world, owner_sync);
        debug!("Pet {} destroyed", self.id);
    }
}

/// Applies a level row to a pet combatant.
fn apply_level_stats(combatant: &mut Combatant, stats: &LevelStats) {
    combatant.health_mut().set_max(stats.health_max);
    combatant.mana_mut().set_max(stats.mana_max);
    combatant.set_defense(stats.base_defense);
}
