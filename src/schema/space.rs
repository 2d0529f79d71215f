/// Minimal 3D math for turtle states: vectors, unit quaternions, and the
/// copyable `SpatialState` the evaluator hands to instructions.
///
/// The evaluator never looks inside these types; only instructions do.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

// ─────────────────────────────────────────────
// Vec3
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    /// Local growth axis of a turtle.
    pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const Z: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

// ─────────────────────────────────────────────
// Quat
// ─────────────────────────────────────────────

/// Unit quaternion `(x, y, z, w)` representing an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Rotation of `angle` radians around `axis` (normalized here).
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let len = axis.length();
        if len == 0.0 {
            return Self::IDENTITY;
        }
        let (s, c) = (angle * 0.5).sin_cos();
        let k = s / len;
        Quat { x: axis.x * k, y: axis.y * k, z: axis.z * k, w: c }
    }

    /// Rotation around the local Z axis.
    pub fn from_rotation_z(angle: f64) -> Self {
        Self::from_axis_angle(Vec3::Z, angle)
    }

    /// Hamilton product `self * rhs`: apply `rhs` in the local frame of `self`.
    pub fn compose(self, rhs: Quat) -> Quat {
        Quat {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }

    /// Rotate `v` by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }
}

// ─────────────────────────────────────────────
// SpatialState
// ─────────────────────────────────────────────

/// Turtle pose: position, orientation and current step length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialState {
    pub position: Vec3,
    pub rotation: Quat,
    pub step_length: f64,
}

impl Default for SpatialState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SpatialState {
    /// At the origin, identity orientation.
    pub fn new(step_length: f64) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            step_length,
        }
    }

    /// Compose `rotation` onto the current orientation (local frame).
    pub fn rotated(&self, rotation: Quat) -> Self {
        Self {
            rotation: self.rotation.compose(rotation),
            ..*self
        }
    }

    /// Move by `offset`, expressed in the turtle's local frame.
    pub fn translated_local(&self, offset: Vec3) -> Self {
        Self {
            position: self.position + self.rotation.rotate(offset),
            ..*self
        }
    }

    pub fn with_step_length(&self, step_length: f64) -> Self {
        Self {
            step_length,
            ..*self
        }
    }
}

/// Axis-aligned bounds `(min, max)` of the visited positions.
pub fn bounding_box(states: &[SpatialState]) -> Option<(Vec3, Vec3)> {
    let first = states.first()?.position;
    Some(
        states
            .iter()
            .fold((first, first), |(lo, hi), s| (lo.min(s.position), hi.max(s.position))),
    )
}
