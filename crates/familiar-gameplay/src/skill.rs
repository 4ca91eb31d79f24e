//! Skills a pet can cast.
//!
//! Skills are value objects: the pet picks one by index, opens its cast
//! window and, when the window elapses, applies the effect in one step.

use familiar_common::{Seconds, Timestamp};
use serde::{Deserialize, Serialize};

/// What a skill does when its cast completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SkillEffect {
    /// Damage to the target and everything attackable around it
    Damage {
        /// Damage before the caster's level bonus and defense
        amount: i32,
        /// Splash radius around the target, 0 for single target
        aoe_radius: f32,
    },
}

impl Default for SkillEffect {
    fn default() -> Self {
        Self::Damage {
            amount: 10,
            aoe_radius: 0.0,
        }
    }
}

/// A castable ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    /// Display name
    pub name: String,
    /// Seconds between cast start and effect
    pub cast_time: Seconds,
    /// Maximum distance to the target's bounds
    pub cast_range: f32,
    /// Seconds after a cast before the skill is ready again
    pub cooldown: Seconds,
    /// Mana paid when the cast completes
    pub mana_cost: i32,
    /// Applied when the cast completes
    pub effect: SkillEffect,
    #[serde(skip)]
    cast_time_end: Timestamp,
    #[serde(skip)]
    cooldown_end: Timestamp,
}

impl Default for Skill {
    fn default() -> Self {
        Self {
            name: "Bite".to_string(),
            cast_time: 1.0,
            cast_range: 2.0,
            cooldown: 0.0,
            mana_cost: 0,
            effect: SkillEffect::default(),
            cast_time_end: 0.0,
            cooldown_end: 0.0,
        }
    }
}

impl Skill {
    /// Creates a damage skill.
    #[must_use]
    pub fn damage(name: impl Into<String>, amount: i32, cast_range: f32, cast_time: Seconds) -> Self {
        Self {
            name: name.into(),
            cast_time,
            cast_range,
            effect: SkillEffect::Damage {
                amount,
                aoe_radius: 0.0,
            },
            ..Self::default()
        }
    }

    /// Sets the splash radius of a damage skill.
    #[must_use]
    pub fn with_aoe(mut self, radius: f32) -> Self {
        let SkillEffect::Damage { amount, .. } = self.effect;
        self.effect = SkillEffect::Damage {
            amount,
            aoe_radius: radius,
        };
        self
    }

    /// Sets cooldown and mana cost.
    #[must_use]
    pub fn with_cost(mut self, cooldown: Seconds, mana_cost: i32) -> Self {
        self.cooldown = cooldown;
        self.mana_cost = mana_cost;
        self
    }

    /// When the current cast completes.
    #[must_use]
    pub const fn cast_time_end(&self) -> Timestamp {
        self.cast_time_end
    }

    /// Seconds left in the cast window, never negative.
    #[must_use]
    pub fn cast_time_remaining(&self, now: Timestamp) -> Seconds {
        (self.cast_time_end - now).max(0.0)
    }

    /// Whether the cooldown has elapsed.
    #[must_use]
    pub fn is_ready(&self, now: Timestamp) -> bool {
        now >= self.cooldown_end
    }

    /// Opens the cast window.
    pub fn start_cast(&mut self, now: Timestamp) {
        self.cast_time_end = now + self.cast_time;
    }

    /// Starts the cooldown after a completed cast.
    pub fn finish_cast(&mut self, now: Timestamp) {
        self.cooldown_end = now + self.cooldown;
    }
}

/// Ordered skills known by a pet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillBook {
    skills: Vec<Skill>,
}

impl SkillBook {
    /// Creates a book from skills in priority order.
    #[must_use]
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    /// Number of skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Skill at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Skill> {
        self.skills.get(index)
    }

    /// Skill at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Skill> {
        self.skills.get_mut(index)
    }

    /// Iterates in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.iter()
    }
}
