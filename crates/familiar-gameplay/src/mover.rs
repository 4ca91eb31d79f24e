//! Navigation boundary.
//!
//! The pet never moves itself; it issues commands to a [`Mover`] and watches
//! `is_moving()` on later ticks to see whether a path finished.

use glam::Vec3;

/// Pathing agent driving one entity.
pub trait Mover {
    /// Starts travelling toward `destination`, stopping `stopping_distance`
    /// short of it.
    fn set_destination(&mut self, destination: Vec3, stopping_distance: f32);

    /// Relocates instantly and drops any path.
    fn warp(&mut self, position: Vec3);

    /// Stops following the current path.
    fn reset_path(&mut self);

    /// Whether a path is still being followed.
    fn is_moving(&self) -> bool;

    /// Current velocity.
    fn velocity(&self) -> Vec3;
}

/// A command received by [`MockMover`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoverCommand {
    /// `set_destination`
    Travel {
        /// Requested destination
        destination: Vec3,
        /// Requested stopping distance
        stopping_distance: f32,
    },
    /// `warp`
    Warp(Vec3),
    /// `reset_path`
    Reset,
}

/// Mover that records commands and reports a scripted moving flag.
#[derive(Debug, Default)]
pub struct MockMover {
    /// Every command in call order
    pub commands: Vec<MoverCommand>,
    /// Value returned by `is_moving`
    pub moving: bool,
}

impl MockMover {
    /// Creates a mover that reports standing still.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent command.
    #[must_use]
    pub fn last(&self) -> Option<&MoverCommand> {
        self.commands.last()
    }
}

impl Mover for MockMover {
    fn set_destination(&mut self, destination: Vec3, stopping_distance: f32) {
        self.commands.push(MoverCommand::Travel {
            destination,
            stopping_distance,
        });
        self.moving = true;
    }

    fn warp(&mut self, position: Vec3) {
        self.commands.push(MoverCommand::Warp(position));
        self.moving = false;
    }

    fn reset_path(&mut self) {
        self.commands.push(MoverCommand::Reset);
        self.moving = false;
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn velocity(&self) -> Vec3 {
        Vec3::ZERO
    }
}

/// Mover that walks a straight line at constant speed.
///
/// The simulation calls [`LinearMover::step`] each tick and copies
/// [`LinearMover::position`] back onto the combatant.
#[derive(Debug, Clone)]
pub struct LinearMover {
    position: Vec3,
    speed: f32,
    destination: Option<Vec3>,
    stopping_distance: f32,
}

impl LinearMover {
    /// Creates a mover standing at `position`.
    #[must_use]
    pub const fn new(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            speed,
            destination: None,
            stopping_distance: 0.0,
        }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Teleports without touching the path, for external position changes.
    pub fn sync_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Advances along the path by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let Some(destination) = self.destination else {
            return;
        };

        let offset = destination - self.position;
        let remaining = offset.length() - self.stopping_distance;
        if remaining <= 0.0 {
            self.destination = None;
            return;
        }

        let travel = (self.speed * dt).min(remaining);
        self.position += offset.normalize_or_zero() * travel;
        if travel >= remaining {
            self.destination = None;
        }
    }
}

impl Mover for LinearMover {
    fn set_destination(&mut self, destination: Vec3, stopping_distance: f32) {
        self.destination = Some(destination);
        self.stopping_distance = stopping_distance.max(0.0);
    }

    fn warp(&mut self, position: Vec3) {
        self.position = position;
        self.destination = None;
    }

    fn reset_path(&mut self) {
        self.destination = None;
    }

    fn is_moving(&self) -> bool {
        self.destination.is_some()
    }

    fn velocity(&self) -> Vec3 {
        match self.destination {
            Some(destination) => (destination - self.position).normalize_or_zero() * self.speed,
            None => Vec3::ZERO,
        }
    }
}
