//! Spatial and temporal primitives shared by the simulation.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Simulation time in seconds since the world started.
pub type Timestamp = f64;

/// Duration in seconds.
pub type Seconds = f64;

/// Axis-aligned bounding volume of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Center of the volume in world space
    pub center: Vec3,
    /// Half size along each axis (sign is ignored)
    pub half_extents: Vec3,
}

impl Bounds {
    /// Creates bounds from a center and half extents.
    #[must_use]
    pub const fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Creates a degenerate volume at a single point.
    #[must_use]
    pub const fn point(center: Vec3) -> Self {
        Self::new(center, Vec3::ZERO)
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents.abs()
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents.abs()
    }

    /// Returns the point on (or inside) the volume closest to `from`.
    ///
    /// Points inside the volume are returned unchanged.
    #[must_use]
    pub fn closest_point(&self, from: Vec3) -> Vec3 {
        from.clamp(self.min(), self.max())
    }

    /// Distance from `from` to the nearest point of the volume.
    #[must_use]
    pub fn distance_to(&self, from: Vec3) -> f32 {
        from.distance(self.closest_point(from))
    }

    /// Returns the same volume moved to a new center.
    #[must_use]
    pub fn with_center(self, center: Vec3) -> Self {
        Self { center, ..self }
    }
}

/// Heading (radians, around the Y axis) that looks from `from` toward `to`.
///
/// Only the horizontal plane is considered. Returns `None` when both points
/// share the same horizontal position and no heading is defined.
#[must_use]
pub fn yaw_towards(from: Vec3, to: Vec3) -> Option<f32> {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    if dx.abs() < f32::EPSILON && dz.abs() < f32::EPSILON {
        None
    } else {
        Some(dx.atan2(dz))
    }
}
