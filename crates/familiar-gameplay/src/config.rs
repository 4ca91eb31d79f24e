//! Pet configuration.
//!
//! Configuration is fixed once a pet spawns. It can be loaded from a TOML
//! file; a missing or broken file falls back to defaults with a warning.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use familiar_common::{ConfigError, ConfigResult, Seconds};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::leveling::LevelTable;
use crate::skill::{Skill, SkillEffect};

/// Fraction of a skill's cast range used as stopping distance when
/// approaching a target.
pub const CAST_APPROACH_FACTOR: f32 = 0.8;

/// A challenger must be closer than this fraction of the current target's
/// distance to take over as target.
pub const AGGRO_SWITCH_RATIO: f32 = 0.8;

/// Largest damage amount a configured skill may carry.
pub const MAX_SKILL_DAMAGE: i32 = 1_000_000;

/// Pet configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    /// Owner distance at which the pet walks back
    pub return_distance: f32,
    /// Owner-to-target distance at which the pet gives up a chase
    pub follow_distance: f32,
    /// Owner distance at which the pet warps to its owner
    pub teleport_distance: f32,
    /// Seconds a dead pet lingers before it is destroyed
    pub death_duration: Seconds,
    /// Gold charged to revive the pet item
    pub revive_price: u64,
    /// Attack whoever attacks the owner
    pub defend_owner: bool,
    /// Attack whatever the owner attacks
    pub auto_attack: bool,
    /// Level the pet spawns at
    pub start_level: u32,
    /// Skills in priority order
    pub skills: Vec<Skill>,
    /// Level rows
    pub levels: LevelTable,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            return_distance: 10.0,
            follow_distance: 20.0,
            teleport_distance: 30.0,
            death_duration: 60.0,
            revive_price: 10,
            defend_owner: true,
            auto_attack: true,
            start_level: 1,
            skills: vec![Skill::default()],
            levels: LevelTable::default(),
        }
    }
}

impl PetConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Pet config not found at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read pet config: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded pet config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse pet config: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open pet config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved pet config to {}", path.display());
        Ok(())
    }

    /// Checks the configuration before a pet is spawned with it.
    pub fn validate(&self) -> ConfigResult<()> {
        let ordered = self.return_distance >= 0.0
            && self.return_distance < self.follow_distance
            && self.follow_distance < self.teleport_distance;
        if !ordered {
            return Err(ConfigError::NonMonotonicDistances {
                return_distance: self.return_distance,
                follow_distance: self.follow_distance,
                teleport_distance: self.teleport_distance,
            });
        }

        if self.death_duration.is_nan() || self.death_duration < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "death_duration",
                reason: format!("must be a non-negative number, got {}", self.death_duration),
            });
        }

        for skill in &self.skills {
            if skill.cast_time < 0.0 || skill.cast_range < 0.0 || skill.cooldown < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "skills",
                    reason: format!("skill '{}' has a negative timing or range", skill.name),
                });
            }
            let SkillEffect::Damage { amount, .. } = skill.effect;
            if !(0..=MAX_SKILL_DAMAGE).contains(&amount) {
                return Err(ConfigError::InvalidValue {
                    field: "skills",
                    reason: format!(
                        "skill '{}' damage {amount} outside 0..={MAX_SKILL_DAMAGE}",
                        skill.name
                    ),
                });
            }
        }

        self.levels.validate()?;

        let max_level = self.levels.max_level();
        if self.start_level == 0 || self.start_level > max_level {
            return Err(ConfigError::LevelOutOfRange {
                level: self.start_level,
                max_level,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leveling::LevelStats;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = PetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.revive_price, 10);
        assert!(config.defend_owner && config.auto_attack);
    }

    #[test]
    fn test_distances_must_increase() {
        let config = PetConfig {
            return_distance: 25.0,
            follow_distance: 20.0,
            ..PetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonMonotonicDistances {
                return_distance: 25.0,
                follow_distance: 20.0,
                teleport_distance: 30.0,
            })
        );

        let equal = PetConfig {
            follow_distance: 30.0,
            ..PetConfig::default()
        };
        assert!(equal.validate().is_err());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let config = PetConfig {
            death_duration: -1.0,
            ..PetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "death_duration",
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_skill_damage_rejected() {
        let config = PetConfig {
            skills: vec![Skill::damage("Maul", i32::MAX, 2.0, 1.0)],
            ..PetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "skills", .. })
        ));
    }

    #[test]
    fn test_start_level_checked() {
        let config = PetConfig {
            start_level: 11,
            ..PetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LevelOutOfRange {
                level: 11,
                max_level: 10
            })
        );
    }

    #[test]
    fn test_empty_level_table_rejected() {
        let config = PetConfig {
            levels: LevelTable::new(Vec::new()),
            ..PetConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyLevelTable));
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config_path = dir.path().join("pets").join("wolf.toml");

        let config = PetConfig {
            teleport_distance: 45.0,
            auto_attack: false,
            skills: vec![Skill::damage("Howl", 6, 8.0, 0.5).with_aoe(2.5).with_cost(4.0, 3)],
            levels: LevelTable::new(vec![LevelStats {
                health_max: 50,
                mana_max: 10,
                base_damage: 1,
                base_defense: 0,
                base_block_chance: 0.5,
                base_critical_chance: 0.25,
                experience_max: 40,
            }]),
            ..PetConfig::default()
        };

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = PetConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = PetConfig::load_from("/nonexistent/path/pet.toml");
        assert_eq!(config, PetConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "return_distance = \"far\"").expect("write");

        assert_eq!(PetConfig::load_from(&path), PetConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("partial.toml");
        fs::write(&path, "death_duration = 5.0\ndefend_owner = false\n").expect("write");

        let config = PetConfig::load_from(&path);
        assert!((config.death_duration - 5.0).abs() < f64::EPSILON);
        assert!(!config.defend_owner);
        assert_eq!(config.skills, PetConfig::default().skills);
    }
}
