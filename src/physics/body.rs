//! Body / Motion Integrator
//!
//! A body carries the motion requested for the current tick: a unit
//! direction and a scalar speed. [`Body::apply_motion`] consumes it. Forces
//! do not accumulate and do not persist, a body that is not re-forced every
//! tick stops.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::scene::transform::Transform;

/// Collision mode bitmask
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyMode(u8);

impl BodyMode {
    /// Collision checks off, motion always applies
    pub const DISABLED: BodyMode = BodyMode(0x00);
    pub const ENABLED: BodyMode = BodyMode(0x01);
    pub const AABB: BodyMode = BodyMode(0x02);
    /// Attempts to move, vetoed on collision
    pub const AGGRESSIVE: BodyMode = BodyMode(0x04);
    /// Never moves on its own, blocks others
    pub const PASSIVE: BodyMode = BodyMode(0x08);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        BodyMode(bits & 0x0F)
    }

    pub const fn contains(self, other: BodyMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: BodyMode) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: BodyMode) {
        self.0 &= !other.0;
    }

    pub const fn is_enabled(self) -> bool {
        self.contains(BodyMode::ENABLED)
    }

    pub const fn is_aggressive(self) -> bool {
        self.contains(BodyMode::AGGRESSIVE)
    }

    pub const fn is_passive(self) -> bool {
        self.contains(BodyMode::PASSIVE)
    }
}

impl BitOr for BodyMode {
    type Output = BodyMode;
    fn bitor(self, rhs: BodyMode) -> BodyMode {
        BodyMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for BodyMode {
    fn bitor_assign(&mut self, rhs: BodyMode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for BodyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_enabled() {
            return write!(f, "BodyMode(DISABLED)");
        }
        let mut names = vec!["ENABLED"];
        if self.contains(BodyMode::AABB) {
            names.push("AABB");
        }
        if self.is_aggressive() {
            names.push("AGGRESSIVE");
        }
        if self.is_passive() {
            names.push("PASSIVE");
        }
        write!(f, "BodyMode({})", names.join(" | "))
    }
}

/// Per-tick motion state.
///
/// `direction` is unit length or zero and `acceleration` is never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Body {
    acceleration: f32,
    direction: Vec3,
    pub mode: BodyMode,
}

impl Body {
    pub fn new(mode: BodyMode) -> Self {
        Self { acceleration: 0.0, direction: Vec3::ZERO, mode }
    }

    /// Speed queued for this tick
    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    /// Unit direction queued for this tick (zero when idle)
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Set the motion for the next tick to `(x, y, z)`.
    ///
    /// Overwrites any force queued earlier in the same tick. A zero vector
    /// clears the queued motion.
    pub fn add_force(&mut self, x: f32, y: f32, z: f32) {
        let force = Vec3::new(x, y, z);
        let magnitude = force.len();
        if magnitude > 0.0 && magnitude.is_finite() {
            self.direction = force.normalize();
            self.acceleration = magnitude;
        } else {
            self.reset();
        }
    }

    /// Displacement the queued motion would produce this tick.
    pub fn pending_displacement(&self) -> Vec3 {
        if self.acceleration > 0.0 {
            self.direction * self.acceleration
        } else {
            Vec3::ZERO
        }
    }

    /// Move `transform` by the queued motion, then clear it.
    pub fn apply_motion(&mut self, transform: &mut Transform) {
        if self.acceleration > 0.0 {
            transform.translate(self.direction * self.acceleration);
        }
        self.reset();
    }

    /// Drop the queued motion without moving.
    pub fn reset(&mut self) {
        self.acceleration = 0.0;
        self.direction = Vec3::ZERO;
    }
}
