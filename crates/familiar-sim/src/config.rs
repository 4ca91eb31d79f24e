//! Simulation configuration.
//!
//! Provides tick timing, scenario size and the location of the pet
//! configuration. Configuration can be loaded from and saved to a file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "familiar-sim.toml";

/// Headless simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Simulation steps per second
    pub tick_rate_hz: u32,
    /// Number of steps to run
    pub ticks: u32,

    // === Scenario ===
    /// RNG seed (None = random)
    pub seed: Option<u64>,
    /// Hostiles alive at any time
    pub hostile_count: u32,
    /// Half size of the square the owner wanders in
    pub arena_radius: f32,
    /// Gold the owner starts with, spent on revives
    pub starting_gold: u64,

    // === Pet ===
    /// Pet configuration file (None = built-in defaults)
    pub pet_config: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20,
            ticks: 2_400, // 2 minutes

            seed: None,
            hostile_count: 6,
            arena_radius: 30.0,
            starting_gold: 50,

            pet_config: None,
        }
    }
}

impl SimConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    #[allow(dead_code)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate_hz = self.tick_rate_hz.clamp(1, 240);
        self.hostile_count = self.hostile_count.min(256);
        self.arena_radius = self.arena_radius.clamp(5.0, 1_000.0);
    }

    /// Seconds per simulation step.
    #[must_use]
    pub fn tick_duration(&self) -> f64 {
        1.0 / f64::from(self.tick_rate_hz.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate_hz, 20);
        assert_eq!(config.seed, None);
        assert!((config.tick_duration() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig {
            tick_rate_hz: 0,
            hostile_count: 10_000,
            arena_radius: -3.0,
            ..SimConfig::default()
        };

        config.validate();

        assert_eq!(config.tick_rate_hz, 1);
        assert_eq!(config.hostile_count, 256);
        assert!((config.arena_radius - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("sim").join(CONFIG_FILE);

        let config = SimConfig {
            ticks: 100,
            seed: Some(12345),
            pet_config: Some(PathBuf::from("pets/wolf.toml")),
            ..SimConfig::default()
        };

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/familiar-sim.toml");
        assert_eq!(config, SimConfig::default());
    }
}
