//! # Familiar Common
//!
//! Common types, utilities, and shared abstractions for Project Familiar.
//!
//! This crate provides foundational types used across all Familiar crates:
//! - Entity handles (EntityId) and a deterministic allocator
//! - Geometry (bounding volumes, headings) and simulation timestamps
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use prelude::*;
