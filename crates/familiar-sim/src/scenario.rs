//! Seeded headless scenario.
//!
//! One owner wanders around an open square with its pet while hostiles close
//! in. Hostiles attack the owner and the pet, the owner picks fights, and the
//! pet reacts through its state machine. Dead hostiles are replaced, and a
//! destroyed pet is revived from its item as long as the owner can pay.

use familiar_common::{ConfigResult, EntityId};
use familiar_gameplay::prelude::*;
use glam::Vec3;
use tracing::{debug, info, warn};

use crate::config::SimConfig;

const OWNER_SPEED: f32 = 4.0;
const PET_SPEED: f32 = 6.0;
const HOSTILE_SPEED: f32 = 2.5;
const HOSTILE_SIGHT: f32 = 12.0;
const HOSTILE_REACH: f32 = 2.0;
const HOSTILE_HIT: i32 = 6;
const HOSTILE_ATTACK_CHANCE: f32 = 0.1;
const OWNER_ENGAGE_RANGE: f32 = 8.0;
const OWNER_ENGAGE_CHANCE: f32 = 0.05;
const KILL_EXPERIENCE: i64 = 15;

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Steps simulated
    pub ticks: u32,
    /// Pet state transitions
    pub transitions: u32,
    /// Hostiles killed by the pet
    pub hostiles_slain: u32,
    /// Times the pet died
    pub pet_deaths: u32,
    /// Times the pet item was revived
    pub revives: u32,
    /// Final pet level
    pub level: u32,
    /// Final pet experience
    pub experience: i64,
}

/// World state of a running scenario.
pub struct Scenario {
    world: CombatantArena,
    store: PetItemStore,
    notifier: BusOwnerNotifier,
    pet_config: PetConfig,
    pet: Option<Pet>,
    pet_mover: LinearMover,
    owner: EntityId,
    owner_mover: LinearMover,
    hostiles: Vec<EntityId>,
    rng: fastrand::Rng,
    arena_radius: f32,
    now: f64,
    dt: f64,
    gold: u64,
    report: ScenarioReport,
}

impl Scenario {
    /// Builds the scenario. Fails if the pet configuration is invalid.
    pub fn new(config: &SimConfig, pet_config: PetConfig) -> ConfigResult<Self> {
        pet_config.validate()?;

        let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
        info!("Scenario seed: {seed}");

        let mut world = CombatantArena::with_capacity(config.hostile_count as usize + 2);
        let owner = world.spawn(
            Combatant::new(CombatantKind::Player, Vec3::ZERO)
                .with_name("Owner")
                .with_health(Health::new(i32::MAX / 2)),
        );
        let notifier = BusOwnerNotifier::new(world.events().sender());

        let mut scenario = Self {
            world,
            store: PetItemStore::new(),
            notifier,
            pet_config,
            pet: None,
            pet_mover: LinearMover::new(Vec3::X, PET_SPEED),
            owner,
            owner_mover: LinearMover::new(Vec3::ZERO, OWNER_SPEED),
            hostiles: Vec::new(),
            rng: fastrand::Rng::with_seed(seed),
            arena_radius: config.arena_radius,
            now: 0.0,
            dt: config.tick_duration(),
            gold: config.starting_gold,
            report: ScenarioReport::default(),
        };

        scenario.summon_pet(Vec3::X, None)?;
        for _ in 0..config.hostile_count {
            scenario.spawn_hostile();
        }

        Ok(scenario)
    }

    /// Runs `ticks` steps and returns the summary.
    pub fn run(&mut self, ticks: u32) -> ScenarioReport {
        for _ in 0..ticks {
            self.step();
        }
        self.report()
    }

    /// Summary so far.
    #[must_use]
    pub fn report(&self) -> ScenarioReport {
        let mut report = self.report;
        if let Some(pet) = &self.pet {
            report.level = pet.level();
            report.experience = pet.experience();
        }
        report
    }

    /// The live pet, if any.
    #[must_use]
    #[allow(dead_code)]
    pub fn pet(&self) -> Option<&Pet> {
        self.pet.as_ref()
    }

    /// Advances the whole scenario by one step.
    pub fn step(&mut self) {
        self.now += self.dt;
        let dt = self.dt as f32;

        self.move_owner(dt);
        self.run_hostiles(dt);
        self.run_owner();
        self.tick_pet(dt);
        self.process_events();
        self.world.apply_destroy_requests();

        self.report.ticks += 1;
    }

    fn summon_pet(&mut self, position: Vec3, revived: Option<PetSnapshot>) -> ConfigResult<()> {
        let mut config = self.pet_config.clone();
        if let Some(snapshot) = revived {
            config.start_level = snapshot.level;
        }

        let mut pet = Pet::summon(&mut self.world, self.owner, position, config)?;
        let mut snapshot = pet.snapshot(&self.world);
        if let Some(revived) = revived {
            pet.set_experience(revived.experience, &mut self.world, &mut self.store);
            snapshot = PetSnapshot {
                health: revived.health,
                ..pet.snapshot(&self.world)
            };
        }
        self.store.add_pet_item(self.owner, pet.id(), snapshot);

        let sender = self.world.events().sender();
        pet.hooks.level_up.register(move |event| {
            let published = sender.try_send(SimEvent::PetLeveledUp {
                pet: event.pet,
                level: event.level,
            });
            if published.is_err() {
                warn!("Dropped level-up event for {}", event.pet);
            }
        });
        let sender = self.world.events().sender();
        pet.hooks.died.register(move |event| {
            let published = sender.try_send(SimEvent::PetDied {
                pet: event.pet,
                death_time_end: event.death_time_end,
            });
            if published.is_err() {
                warn!("Dropped death event for {}", event.pet);
            }
        });
        pet.hooks
            .state_changed
            .register(|event| debug!("{} is now {:?}", event.pet, event.to));

        self.pet_mover = LinearMover::new(position, PET_SPEED);
        self.pet = Some(pet);
        Ok(())
    }

    fn random_point(&mut self) -> Vec3 {
        let r = self.arena_radius;
        Vec3::new(
            (self.rng.f32() * 2.0 - 1.0) * r,
            0.0,
            (self.rng.f32() * 2.0 - 1.0) * r,
        )
    }

    fn spawn_hostile(&mut self) {
        let position = self.random_point();
        let id = self.world.spawn(
            Combatant::new(CombatantKind::HOSTILE_NPC, position)
                .with_name("Wolf")
                .with_health(Health::new(40))
                .with_defense(1),
        );
        self.hostiles.push(id);
    }

    fn move_owner(&mut self, dt: f32) {
        if !self.owner_mover.is_moving() {
            let waypoint = self.random_point();
            self.owner_mover.set_destination(waypoint, 0.0);
            if let Ok(owner) = self.world.get_mut(self.owner) {
                owner.set_destination(waypoint);
            }
        }

        self.owner_mover.step(dt);
        if let Ok(owner) = self.world.get_mut(self.owner) {
            owner.set_position(self.owner_mover.position());
        }
    }

    fn run_hostiles(&mut self, dt: f32) {
        let Ok(owner_position) = self.world.get(self.owner).map(Combatant::position) else {
            return;
        };
        let pet_position = self
            .pet
            .as_ref()
            .and_then(|pet| self.world.get(pet.id()).ok())
            .filter(|pet| pet.is_alive())
            .map(Combatant::position);

        for index in 0..self.hostiles.len() {
            let hostile = self.hostiles[index];
            let Ok(position) = self.world.get(hostile).map(Combatant::position) else {
                continue;
            };
            if !self.world.get(hostile).is_ok_and(Combatant::is_alive) {
                continue;
            }

            let to_owner = position.distance(owner_position);
            if to_owner <= HOSTILE_SIGHT && to_owner > HOSTILE_REACH {
                let step = (owner_position - position).normalize_or_zero() * HOSTILE_SPEED * dt;
                if let Ok(combatant) = self.world.get_mut(hostile) {
                    combatant.set_position(position + step);
                    combatant.set_destination(owner_position);
                }
            }

            if self.rng.f32() >= HOSTILE_ATTACK_CHANCE {
                continue;
            }

            let Some(pet) = self.pet.as_mut() else {
                continue;
            };
            if pet_position.is_some_and(|p| p.distance(position) <= HOSTILE_REACH) {
                self.world.deal_damage_at(hostile, pet.id(), HOSTILE_HIT, 0.0);
                pet.on_aggro(hostile, &self.world);
            } else if to_owner <= HOSTILE_REACH {
                pet.on_owner_attacked(hostile, &self.world);
            }
        }
    }

    fn run_owner(&mut self) {
        if self.rng.f32() >= OWNER_ENGAGE_CHANCE {
            return;
        }
        let Ok(owner_position) = self.world.get(self.owner).map(Combatant::position) else {
            return;
        };

        let victim = self
            .hostiles
            .iter()
            .filter_map(|&id| self.world.get(id).ok())
            .filter(|c| c.is_alive())
            .map(|c| (c.id(), c.position().distance(owner_position)))
            .filter(|&(_, distance)| distance <= OWNER_ENGAGE_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id);

        if let (Some(victim), Some(pet)) = (victim, self.pet.as_mut()) {
            if pet.on_owner_attacking(victim, &self.world) {
                debug!("Owner engaged {victim}, pet follows");
            }
        }
    }

    fn tick_pet(&mut self, dt: f32) {
        let Some(pet) = self.pet.as_mut() else {
            return;
        };

        let before = pet.state();
        let mut ctx = TickContext {
            now: self.now,
            world: &mut self.world,
            mover: &mut self.pet_mover,
            owner_sync: &mut self.store,
            owner_combat: &mut self.notifier,
        };
        if pet.tick(&mut ctx) != before {
            self.report.transitions += 1;
        }

        self.pet_mover.step(dt);
        if let Ok(combatant) = self.world.get_mut(pet.id()) {
            combatant.set_position(self.pet_mover.position());
        }
    }

    fn process_events(&mut self) {
        for event in self.world.events().drain() {
            match event {
                SimEvent::DestroyRequested { entity_id } => self.on_destroy_requested(entity_id),
                SimEvent::PetLeveledUp { pet, level } => {
                    info!("Pet {pet} leveled up to {level}");
                },
                SimEvent::PetDied {
                    pet,
                    death_time_end,
                } => {
                    self.report.pet_deaths += 1;
                    info!("Pet {pet} died, corpse stays until {death_time_end:.1}");
                },
                SimEvent::OwnerPetDamage {
                    victim, category, ..
                } => self.on_pet_damage(victim, category),
            }
        }
    }

    fn on_pet_damage(&mut self, victim: EntityId, category: VictimCategory) {
        if category != VictimCategory::Hostile
            || self.world.get(victim).is_ok_and(Combatant::is_alive)
            || self.world.pending_destroy().contains(&victim)
        {
            return;
        }

        self.report.hostiles_slain += 1;
        self.world.request_destroy(victim);
        if let Some(pet) = self.pet.as_mut() {
            pet.grant_experience(KILL_EXPERIENCE, &mut self.world, &mut self.store);
        }
    }

    fn on_destroy_requested(&mut self, entity: EntityId) {
        if let Some(index) = self.hostiles.iter().position(|&id| id == entity) {
            self.hostiles.swap_remove(index);
            self.spawn_hostile();
            return;
        }

        if self.pet.as_ref().map(Pet::id) != Some(entity) {
            return;
        }
        let Some(pet) = self.pet.take() else {
            return;
        };
        pet.on_destroy(&self.world, &mut self.store);
        self.revive(&pet);
    }

    fn revive(&mut self, pet: &Pet) {
        let health_max = pet.level_stats().map_or(1, |stats| stats.health_max);
        let price = pet.config().revive_price;

        if let Err(e) = self
            .store
            .revive(self.owner, pet.id(), health_max, price, &mut self.gold)
        {
            warn!("Could not revive pet {}: {e}", pet.id());
            return;
        }
        let Some(item) = self.store.take_pet_item(self.owner, pet.id()) else {
            return;
        };

        let position = self.owner_mover.position() + Vec3::X;
        match self.summon_pet(position, Some(item.snapshot)) {
            Ok(()) => {
                self.report.revives += 1;
                info!("Pet revived, {} gold left", self.gold);
            },
            Err(e) => warn!("Could not summon revived pet: {e}"),
        }
    }
}
