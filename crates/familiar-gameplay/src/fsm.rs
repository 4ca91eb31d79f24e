//! Per-tick pet state machine.
//!
//! Every state owns an ordered table of rules. Each rule pairs an event
//! name with a predicate and an effect. [`Pet::tick`] evaluates the table of
//! the current state top to bottom and runs the effect of the first rule
//! whose predicate holds; that effect returns the next state. When nothing
//! matches, the pet stays where it is. Events missing from a table are
//! ignored in that state.

use std::fmt;

use familiar_common::{yaw_towards, Timestamp};
use glam::Vec3;
use tracing::{debug, error, warn};

use crate::aggro::can_attack;
use crate::combat::{deal_pet_damage, OwnerCombatHandler};
use crate::config::CAST_APPROACH_FACTOR;
use crate::entity::{Combatant, CombatantRegistry};
use crate::hooks::StateChanged;
use crate::mover::Mover;
use crate::pet::{Pet, PetState};
use crate::skill::{Skill, SkillEffect};
use crate::sync::OwnerSyncBridge;

/// Collaborators a pet needs during one tick.
pub struct TickContext<'a> {
    /// Simulation time of this tick
    pub now: Timestamp,
    /// World registry resolving entity handles
    pub world: &'a mut dyn CombatantRegistry,
    /// Pathing agent of this pet
    pub mover: &'a mut dyn Mover,
    /// Checkpoint destination
    pub owner_sync: &'a mut dyn OwnerSyncBridge,
    /// Owner reactions to pet damage
    pub owner_combat: &'a mut dyn OwnerCombatHandler,
}

impl fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickContext").field("now", &self.now).finish_non_exhaustive()
    }
}

/// Conditions the state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PetEvent {
    /// Own health reached zero
    Died,
    /// Target handle resolves to a dead combatant
    TargetDied,
    /// Target handle no longer resolves
    TargetDisappeared,
    /// Owner's destination is beyond the teleport distance
    TeleportDistanceExceeded,
    /// Owner's destination is beyond the return distance
    ReturnDistanceExceeded,
    /// Target is too far from the owner's destination to keep chasing
    TargetOutOfFollowRange,
    /// Target is beyond the selected skill's cast range
    TargetOutOfCastRange,
    /// Selected skill can be cast at the target
    SkillRequest,
    /// A living target is waiting for a skill
    Aggro,
    /// Mover finished its path
    Arrived,
    /// Cast window elapsed
    SkillFinished,
    /// Corpse may be removed
    DeathTimerElapsed,
}

impl PetEvent {
    /// Every event, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Died,
        Self::TargetDied,
        Self::TargetDisappeared,
        Self::TeleportDistanceExceeded,
        Self::ReturnDistanceExceeded,
        Self::TargetOutOfFollowRange,
        Self::TargetOutOfCastRange,
        Self::SkillRequest,
        Self::Aggro,
        Self::Arrived,
        Self::SkillFinished,
        Self::DeathTimerElapsed,
    ];
}

/// One row of a state's rule table.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Event this rule reacts to
    pub event: PetEvent,
    /// Whether the event is present this tick
    pub when: fn(&Pet, &TickContext<'_>) -> bool,
    /// Reaction; returns the next state
    pub then: fn(&mut Pet, &mut TickContext<'_>) -> PetState,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("event", &self.event).finish_non_exhaustive()
    }
}

#[rustfmt::skip]
const IDLE_RULES: &[Rule] = &[
    Rule { event: PetEvent::Died, when: is_dead, then: die },
    Rule { event: PetEvent::TargetDied, when: target_is_dead, then: drop_target },
    Rule { event: PetEvent::TeleportDistanceExceeded, when: beyond_teleport, then: warp_to_owner },
    Rule { event: PetEvent::ReturnDistanceExceeded, when: beyond_return, then: travel_to_owner },
    Rule { event: PetEvent::TargetOutOfFollowRange, when: target_beyond_follow, then: travel_to_owner },
    Rule { event: PetEvent::TargetOutOfCastRange, when: target_beyond_cast, then: approach_target },
    Rule { event: PetEvent::SkillRequest, when: target_within_cast, then: begin_cast },
    Rule { event: PetEvent::Aggro, when: target_is_alive, then: select_first_skill },
];

#[rustfmt::skip]
const MOVING_RULES: &[Rule] = &[
    Rule { event: PetEvent::Died, when: is_dead, then: stop_and_die },
    Rule { event: PetEvent::Arrived, when: has_arrived, then: become_idle },
    Rule { event: PetEvent::TargetDied, when: target_is_dead, then: stop_and_drop_target },
    Rule { event: PetEvent::TeleportDistanceExceeded, when: beyond_teleport, then: warp_to_owner },
    Rule { event: PetEvent::TargetOutOfFollowRange, when: target_beyond_follow, then: travel_to_owner },
    Rule { event: PetEvent::TargetOutOfCastRange, when: target_beyond_cast, then: approach_target },
    Rule { event: PetEvent::Aggro, when: target_is_alive, then: stop_and_select_first_skill },
];

#[rustfmt::skip]
const CASTING_RULES: &[Rule] = &[
    Rule { event: PetEvent::Died, when: is_dead, then: die },
    Rule { event: PetEvent::TargetDisappeared, when: target_is_gone, then: drop_target },
    Rule { event: PetEvent::TargetDied, when: target_is_dead, then: drop_target },
    Rule { event: PetEvent::SkillFinished, when: cast_elapsed, then: finish_cast },
];

#[rustfmt::skip]
const DEAD_RULES: &[Rule] = &[
    Rule { event: PetEvent::DeathTimerElapsed, when: death_timer_elapsed, then: request_destroy },
];

/// Rule table of a state, in evaluation order.
#[must_use]
pub const fn rules_for(state: PetState) -> &'static [Rule] {
    match state {
        PetState::Idle => IDLE_RULES,
        PetState::Moving => MOVING_RULES,
        PetState::Casting => CASTING_RULES,
        PetState::Dead => DEAD_RULES,
    }
}

/// Events a state does not react to.
#[must_use]
pub fn ignored_events(state: PetState) -> Vec<PetEvent> {
    let rules = rules_for(state);
    PetEvent::ALL
        .into_iter()
        .filter(|event| rules.iter().all(|rule| rule.event != *event))
        .collect()
}

impl Pet {
    /// Advances the pet by one simulation step and returns the new state.
    ///
    /// At most one rule fires. Expected conditions such as vanished owners
    /// or targets never fail the tick.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> PetState {
        let from = self.state;

        if ctx.world.combatant(self.id).is_none() {
            warn!("Pet {} is not in the world, skipping tick", self.id);
            return from;
        }

        // Casting reacts to a vanished target itself
        if from != PetState::Casting
            && self.target.is_some()
            && target_combatant(self, ctx).is_none()
        {
            debug!("Pet {} lost its target", self.id);
            self.target = None;
            self.current_skill = None;
        }

        let fired = rules_for(from).iter().find(|rule| (rule.when)(&*self, &*ctx));
        if let Some(rule) = fired {
            let to = (rule.then)(self, ctx);
            debug!("Pet {} {:?}: {:?} -> {:?}", self.id, rule.event, from, to);
            self.state = to;
        }

        if self.state == PetState::Casting {
            face_target(self, ctx);
        }

        if self.state != from {
            self.hooks.state_changed.emit(&StateChanged {
                pet: self.id,
                from,
                to: self.state,
            });
        }

        self.state
    }
}

// Lookups

fn own_combatant<'c>(pet: &Pet, ctx: &'c TickContext<'_>) -> Option<&'c Combatant> {
    ctx.world.combatant(pet.id)
}

fn target_combatant<'c>(pet: &Pet, ctx: &'c TickContext<'_>) -> Option<&'c Combatant> {
    pet.target.and_then(|id| ctx.world.combatant(id))
}

fn owner_destination(pet: &Pet, ctx: &TickContext<'_>) -> Option<Vec3> {
    pet.owner
        .and_then(|id| ctx.world.combatant(id))
        .map(Combatant::destination)
}

fn owner_distance(pet: &Pet, ctx: &TickContext<'_>) -> Option<f32> {
    let position = own_combatant(pet, ctx)?.position();
    Some(owner_destination(pet, ctx)?.distance(position))
}

fn selected_skill(pet: &Pet) -> Option<&Skill> {
    pet.current_skill.and_then(|index| pet.skills.get(index))
}

/// Distance from the pet to the target's bounds and the selected skill's
/// range.
fn cast_geometry(pet: &Pet, ctx: &TickContext<'_>) -> Option<(f32, f32)> {
    let skill = selected_skill(pet)?;
    let position = own_combatant(pet, ctx)?.position();
    let distance = target_combatant(pet, ctx)?.bounds().distance_to(position);
    Some((distance, skill.cast_range))
}

// Predicates

fn is_dead(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    own_combatant(pet, ctx).is_some_and(|c| !c.is_alive())
}

fn target_is_dead(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    target_combatant(pet, ctx).is_some_and(|c| !c.is_alive())
}

fn target_is_alive(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    target_combatant(pet, ctx).is_some_and(Combatant::is_alive)
}

fn target_is_gone(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    pet.target.is_some() && target_combatant(pet, ctx).is_none()
}

fn beyond_teleport(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    owner_distance(pet, ctx).is_some_and(|d| d > pet.config.teleport_distance)
}

fn beyond_return(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    owner_distance(pet, ctx).is_some_and(|d| d > pet.config.return_distance)
}

fn target_beyond_follow(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    let destination = owner_destination(pet, ctx);
    let (Some(destination), Some(target)) = (destination, target_combatant(pet, ctx)) else {
        return false;
    };
    target.bounds().distance_to(destination) > pet.config.follow_distance
}

fn target_beyond_cast(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    cast_geometry(pet, ctx).is_some_and(|(distance, range)| distance > range)
}

fn target_within_cast(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    cast_geometry(pet, ctx).is_some_and(|(distance, range)| distance <= range)
}

fn has_arrived(_pet: &Pet, ctx: &TickContext<'_>) -> bool {
    !ctx.mover.is_moving()
}

fn cast_elapsed(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    selected_skill(pet).map_or(true, |skill| skill.cast_time_remaining(ctx.now) <= 0.0)
}

fn death_timer_elapsed(pet: &Pet, ctx: &TickContext<'_>) -> bool {
    !pet.destroy_requested && ctx.now >= pet.death_time_end
}

// Effects

fn die(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    pet.on_death(ctx);
    pet.current_skill = None;
    PetState::Dead
}

fn stop_and_die(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    ctx.mover.reset_path();
    die(pet, ctx)
}

fn become_idle(_pet: &mut Pet, _ctx: &mut TickContext<'_>) -> PetState {
    PetState::Idle
}

fn drop_target(pet: &mut Pet, _ctx: &mut TickContext<'_>) -> PetState {
    pet.target = None;
    pet.current_skill = None;
    PetState::Idle
}

fn stop_and_drop_target(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    ctx.mover.reset_path();
    drop_target(pet, ctx)
}

fn warp_to_owner(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    if let Some(destination) = owner_destination(pet, ctx) {
        ctx.mover.warp(destination);
    }
    PetState::Idle
}

fn travel_to_owner(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    pet.target = None;
    pet.current_skill = None;
    match owner_destination(pet, ctx) {
        Some(destination) => {
            ctx.mover.set_destination(destination, 0.0);
            PetState::Moving
        },
        None => PetState::Idle,
    }
}

fn approach_target(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    let lookup = (
        own_combatant(pet, ctx),
        target_combatant(pet, ctx),
        selected_skill(pet),
    );
    let approach = match lookup {
        (Some(me), Some(target), Some(skill)) => Some((
            target.bounds().closest_point(me.position()),
            skill.cast_range * CAST_APPROACH_FACTOR,
        )),
        _ => None,
    };

    match approach {
        Some((point, stopping_distance)) => {
            ctx.mover.set_destination(point, stopping_distance);
            PetState::Moving
        },
        None => pet.state,
    }
}

fn begin_cast(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    let lookup = (
        own_combatant(pet, ctx),
        target_combatant(pet, ctx),
        selected_skill(pet),
    );
    let ready = match lookup {
        (Some(me), Some(target), Some(skill)) => {
            let caster_ok =
                me.is_alive() && me.mana().can_afford(skill.mana_cost) && skill.is_ready(ctx.now);
            let target_ok = target.is_alive() && can_attack(me, target);
            caster_ok && target_ok
        },
        _ => false,
    };

    if !ready {
        return drop_target(pet, ctx);
    }

    let now = ctx.now;
    if let Some(skill) = pet.current_skill.and_then(|index| pet.skills.get_mut(index)) {
        skill.start_cast(now);
    }
    PetState::Casting
}

fn select_first_skill(pet: &mut Pet, _ctx: &mut TickContext<'_>) -> PetState {
    if pet.skills.is_empty() {
        error!("Pet {} has no skills to fight with", pet.id);
        pet.current_skill = None;
    } else {
        pet.current_skill = Some(0);
    }
    PetState::Idle
}

fn stop_and_select_first_skill(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    ctx.mover.reset_path();
    select_first_skill(pet, ctx)
}

fn finish_cast(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    let now = ctx.now;
    let Some(skill) = pet.current_skill.and_then(|index| pet.skills.get_mut(index)) else {
        return drop_target(pet, ctx);
    };
    skill.finish_cast(now);
    let (mana_cost, effect) = (skill.mana_cost, skill.effect);

    if let Some(me) = ctx.world.combatant_mut(pet.id) {
        me.mana_mut().spend(mana_cost);
    }

    if let Some(target) = pet.target {
        let base_damage = pet.level_stats().map_or(0, |stats| stats.base_damage);
        match effect {
            SkillEffect::Damage { amount, aoe_radius } => {
                deal_pet_damage(
                    &mut *ctx.world,
                    &mut *ctx.owner_combat,
                    pet.id,
                    pet.owner,
                    target,
                    amount.saturating_add(base_damage),
                    aoe_radius,
                );
            },
        }

        if !ctx.world.combatant(target).is_some_and(Combatant::is_alive) {
            pet.target = None;
        }
    }

    pet.current_skill = None;
    PetState::Idle
}

fn request_destroy(pet: &mut Pet, ctx: &mut TickContext<'_>) -> PetState {
    pet.destroy_requested = true;
    ctx.world.request_destroy(pet.id);
    pet.hooks.destroy_requested.emit(&pet.id);
    debug!("Pet {} asked to be destroyed", pet.id);
    PetState::Dead
}

fn face_target(pet: &Pet, ctx: &mut TickContext<'_>) {
    let (Some(me), Some(target)) = (own_combatant(pet, ctx), target_combatant(pet, ctx)) else {
        return;
    };
    let Some(yaw) = yaw_towards(me.position(), target.position()) else {
        return;
    };
    if let Some(me) = ctx.world.combatant_mut(pet.id) {
        me.set_yaw(yaw);
    }
}

/// Rule table lookup by event, for diagnostics.
#[must_use]
pub fn rule_index(state: PetState, event: PetEvent) -> Option<usize> {
    rules_for(state).iter().position(|rule| rule.event == event)
}
