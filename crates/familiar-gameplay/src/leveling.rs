//! Level table and the experience ledger.
//!
//! A pet's level selects one row of [`LevelStats`]. Experience accumulates
//! toward the row's `experience_max`; crossing it consumes the cap and
//! advances the level, possibly several times for one large grant.

use std::fs;
use std::path::Path;

use familiar_common::{ConfigError, ConfigResult, FamiliarError, FamiliarResult};
use serde::{Deserialize, Serialize};

/// Level-scaled stats of one level row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Maximum health
    pub health_max: i32,
    /// Maximum mana
    pub mana_max: i32,
    /// Damage added to every skill hit
    pub base_damage: i32,
    /// Flat damage reduction
    pub base_defense: i32,
    /// Chance to block (0.0-1.0)
    pub base_block_chance: f32,
    /// Chance to crit (0.0-1.0)
    pub base_critical_chance: f32,
    /// Experience needed to leave this level
    pub experience_max: i64,
}

/// Ordered level rows; row 0 is level 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelTable {
    rows: Vec<LevelStats>,
}

impl Default for LevelTable {
    fn default() -> Self {
        let rows = (1..=10_i32)
            .map(|level| LevelStats {
                health_max: 60 + level * 15,
                mana_max: 20 + level * 5,
                base_damage: 2 + level * 2,
                base_defense: level,
                base_block_chance: 0.02 * level as f32,
                base_critical_chance: 0.01 * level as f32,
                experience_max: 10 * i64::from(level) * i64::from(level) + 10,
            })
            .collect();
        Self { rows }
    }
}

impl LevelTable {
    /// Creates a table from explicit rows.
    #[must_use]
    pub fn new(rows: Vec<LevelStats>) -> Self {
        Self { rows }
    }

    /// Parses a RON list of rows.
    pub fn from_ron_str(source: &str) -> FamiliarResult<Self> {
        let table: Self =
            ron::from_str(source).map_err(|e| FamiliarError::Serialization(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Loads a RON level table from disk.
    pub fn load_ron<P: AsRef<Path>>(path: P) -> FamiliarResult<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    /// Number of levels.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Stats of a 1-based level, if it exists.
    #[must_use]
    pub fn get(&self, level: u32) -> Option<&LevelStats> {
        level
            .checked_sub(1)
            .and_then(|index| self.rows.get(index as usize))
    }

    /// Experience cap of a level, or 0 outside the table.
    #[must_use]
    pub fn experience_max(&self, level: u32) -> i64 {
        self.get(level).map_or(0, |stats| stats.experience_max)
    }

    /// Checks that the table is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.rows.is_empty() {
            return Err(ConfigError::EmptyLevelTable);
        }
        for (index, stats) in self.rows.iter().enumerate() {
            if stats.experience_max <= 0 {
                return Err(ConfigError::InvalidExperienceMax {
                    level: index as u32 + 1,
                    experience_max: stats.experience_max,
                });
            }
        }
        Ok(())
    }
}

/// Level and experience of one pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    level: u32,
    experience: i64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
        }
    }
}

impl Ledger {
    /// Creates a ledger at `level`, checked against `table`.
    pub fn new(level: u32, experience: i64, table: &LevelTable) -> ConfigResult<Self> {
        let max_level = table.max_level();
        if level == 0 || level > max_level {
            return Err(ConfigError::LevelOutOfRange { level, max_level });
        }
        Ok(Self {
            level,
            experience: experience.min(table.experience_max(level)).max(0),
        })
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Current experience.
    #[must_use]
    pub const fn experience(&self) -> i64 {
        self.experience
    }

    /// Assigns a new experience value, leveling up as needed.
    ///
    /// A value not above the current one is floored at 0 and assigned
    /// without any level-up logic. A larger value may cross several caps;
    /// `on_level_up(level, experience)` runs once per increment. At the
    /// highest level the remainder is clamped to that level's cap before
    /// the last notification.
    ///
    /// Returns the number of levels gained.
    pub fn set_experience(
        &mut self,
        value: i64,
        table: &LevelTable,
        mut on_level_up: impl FnMut(u32, i64),
    ) -> u32 {
        if value <= self.experience {
            self.experience = value.max(0);
            return 0;
        }

        self.experience = value;
        let max_level = table.max_level();
        let mut gained = 0;

        while self.level < max_level {
            let cap = table.experience_max(self.level);
            if self.experience < cap {
                break;
            }
            self.experience -= cap;
            self.level += 1;
            gained += 1;
            self.clamp_at_max_level(table);
            on_level_up(self.level, self.experience);
        }

        self.clamp_at_max_level(table);

        gained
    }

    fn clamp_at_max_level(&mut self, table: &LevelTable) {
        if self.level >= table.max_level() {
            self.experience = self.experience.min(table.experience_max(self.level));
        }
    }

    /// Adds `delta` experience (which may be negative).
    pub fn grant_experience(
        &mut self,
        delta: i64,
        table: &LevelTable,
        on_level_up: impl FnMut(u32, i64),
    ) -> u32 {
        self.set_experience(self.experience.saturating_add(delta), table, on_level_up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(experience_max: i64) -> LevelStats {
        LevelStats {
            health_max: 100,
            mana_max: 50,
            base_damage: 5,
            base_defense: 1,
            base_block_chance: 0.0,
            base_critical_chance: 0.0,
            experience_max,
        }
    }

    fn table(caps: &[i64]) -> LevelTable {
        LevelTable::new(caps.iter().copied().map(row).collect())
    }

    #[test]
    fn test_each_level_advances_on_exact_cap() {
        let table = LevelTable::default();
        for level in 1..=table.max_level() {
            let mut ledger = Ledger::new(level, 0, &table).expect("level in table");
            let cap = table.experience_max(level);
            ledger.grant_experience(cap, &table, |_, _| {});

            if level < table.max_level() {
                assert_eq!(ledger.level(), level + 1);
                assert_eq!(ledger.experience(), 0);
            } else {
                assert_eq!(ledger.level(), level);
                assert_eq!(ledger.experience(), cap);
            }
        }
    }

    #[test]
    fn test_two_thresholds_in_one_grant() {
        let table = table(&[10, 15, 20]);
        let mut ledger = Ledger::default();
        let mut notified = Vec::new();

        let gained = ledger.set_experience(30, &table, |level, exp| notified.push((level, exp)));

        assert_eq!(gained, 2);
        assert_eq!(ledger.level(), 3);
        assert_eq!(ledger.experience(), 5);
        assert_eq!(notified, vec![(2, 20), (3, 5)]);
    }

    #[test]
    fn test_decrease_floors_at_zero() {
        let table = table(&[10, 15]);
        let mut ledger = Ledger::new(1, 5, &table).expect("valid");
        let mut calls = 0;

        ledger.set_experience(-3, &table, |_, _| calls += 1);
        assert_eq!(ledger.experience(), 0);
        assert_eq!(ledger.level(), 1);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_equal_value_is_plain_assignment() {
        let table = table(&[10, 15]);
        let mut ledger = Ledger::new(1, 4, &table).expect("valid");
        assert_eq!(ledger.set_experience(4, &table, |_, _| {}), 0);
        assert_eq!(ledger.experience(), 4);
    }

    #[test]
    fn test_clamped_at_max_level() {
        let table = table(&[10, 15]);
        let mut ledger = Ledger::default();

        let mut notified = Vec::new();
        ledger.grant_experience(1_000, &table, |level, exp| notified.push((level, exp)));
        assert_eq!(ledger.level(), 2);
        assert_eq!(ledger.experience(), 15);
        assert_eq!(notified, vec![(2, 15)]);

        // Already capped: a further grant changes nothing
        assert_eq!(ledger.grant_experience(5, &table, |_, _| {}), 0);
        assert_eq!(ledger.experience(), 15);
    }

    #[test]
    fn test_ledger_rejects_out_of_range_level() {
        let table = table(&[10]);
        assert_eq!(
            Ledger::new(0, 0, &table),
            Err(ConfigError::LevelOutOfRange {
                level: 0,
                max_level: 1
            })
        );
        assert!(Ledger::new(2, 0, &table).is_err());
    }

    #[test]
    fn test_table_validation() {
        assert_eq!(
            LevelTable::new(Vec::new()).validate(),
            Err(ConfigError::EmptyLevelTable)
        );
        assert_eq!(
            table(&[10, 0]).validate(),
            Err(ConfigError::InvalidExperienceMax {
                level: 2,
                experience_max: 0
            })
        );
        assert!(LevelTable::default().validate().is_ok());
    }

    #[test]
    fn test_table_from_ron() {
        let source = r"[
            (health_max: 80, mana_max: 20, base_damage: 4, base_defense: 1,
             base_block_chance: 0.05, base_critical_chance: 0.1, experience_max: 12),
            (health_max: 95, mana_max: 25, base_damage: 6, base_defense: 2,
             base_block_chance: 0.05, base_critical_chance: 0.1, experience_max: 30),
        ]";
        let table = LevelTable::from_ron_str(source).expect("valid RON");
        assert_eq!(table.max_level(), 2);
        assert_eq!(table.get(2).map(|s| s.health_max), Some(95));
        assert!(table.get(0).is_none());
        assert!(table.get(3).is_none());
    }

    #[test]
    fn test_table_from_bad_ron() {
        assert!(matches!(
            LevelTable::from_ron_str("[(health_max: )]"),
            Err(FamiliarError::Serialization(_))
        ));
        assert!(matches!(
            LevelTable::from_ron_str("[]"),
            Err(FamiliarError::Config(ConfigError::EmptyLevelTable))
        ));
    }

    #[test]
    fn test_table_load_ron_from_disk() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("levels.ron");
        let source = ron::to_string(&table(&[7, 9])).expect("serializes");
        fs::write(&path, source).expect("write");

        let loaded = LevelTable::load_ron(&path).expect("loads");
        assert_eq!(loaded.experience_max(2), 9);
        assert!(matches!(
            LevelTable::load_ron(dir.path().join("missing.ron")),
            Err(FamiliarError::Io(_))
        ));
    }

    proptest! {
        #[test]
        fn test_experience_stays_within_cap(
            caps in prop::collection::vec(1_i64..200, 1..8),
            grants in prop::collection::vec(-300_i64..600, 1..20),
        ) {
            let table = table(&caps);
            let mut ledger = Ledger::default();
            for grant in grants {
                let before = ledger.level();
                ledger.grant_experience(grant, &table, |_, _| {});
                prop_assert!(ledger.level() >= before);
                prop_assert!(ledger.level() >= 1 && ledger.level() <= table.max_level());
                prop_assert!(ledger.experience() >= 0);
                prop_assert!(ledger.experience() <= table.experience_max(ledger.level()));
            }
        }
    }
}
