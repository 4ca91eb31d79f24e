//! Error types for Project Familiar.

use thiserror::Error;

/// Top-level error type for Familiar operations.
#[derive(Debug, Error)]
pub enum FamiliarError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pet configuration errors, raised when a pet is spawned.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Distances must satisfy `return < follow < teleport`
    #[error(
        "Pet distances must satisfy return < follow < teleport \
         (got return={return_distance}, follow={follow_distance}, teleport={teleport_distance})"
    )]
    NonMonotonicDistances {
        /// Distance at which the pet walks back to its owner
        return_distance: f32,
        /// Distance at which the pet stops chasing a target
        follow_distance: f32,
        /// Distance at which the pet warps to its owner
        teleport_distance: f32,
    },

    /// No level rows were configured
    #[error("Level table is empty")]
    EmptyLevelTable,

    /// A level row needs a positive experience cap
    #[error("Level {level} has non-positive experience cap {experience_max}")]
    InvalidExperienceMax {
        /// 1-based level
        level: u32,
        /// Offending cap
        experience_max: i64,
    },

    /// Starting level outside the table
    #[error("Level {level} is outside 1..={max_level}")]
    LevelOutOfRange {
        /// Requested level
        level: u32,
        /// Highest configured level
        max_level: u32,
    },

    /// Negative durations or prices
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type alias for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for Familiar operations.
pub type FamiliarResult<T> = Result<T, FamiliarError>;
