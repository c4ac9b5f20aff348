//! Geometry and command primitives shared across the controller.

use std::ops::{Add, Sub};

/// A point in the plane (meters).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
}

impl WorldPoint {
    pub const ZERO: WorldPoint = WorldPoint { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &WorldPoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for WorldPoint {
    type Output = WorldPoint;

    fn add(self, rhs: WorldPoint) -> WorldPoint {
        WorldPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for WorldPoint {
    type Output = WorldPoint;

    fn sub(self, rhs: WorldPoint) -> WorldPoint {
        WorldPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Robot position in the world frame, as reported by odometry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Pose {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar position, dropping z.
    #[inline]
    pub fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y)
    }

    /// Distance in the ground plane. Height is ignored.
    #[inline]
    pub fn planar_distance(&self, other: &Pose) -> f32 {
        self.position().distance(&other.position())
    }
}

/// Three-component vector used by [`Twist`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 6-DOF velocity command.
///
/// The controller only ever drives `angular.z`; everything else stays zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    /// All-zero command.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Pure in-place rotation at `rate` rad/s.
    pub fn turn(rate: f32) -> Self {
        let mut cmd = Self::zero();
        cmd.angular.z = rate;
        cmd
    }

    /// Reset every field to zero.
    pub fn reset(&mut self) {
        *self = Self::zero();
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_distance_ignores_height() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, 10.0);
        assert_relative_eq!(a.planar_distance(&b), 5.0);
    }

    #[test]
    fn test_turn_only_sets_angular_z() {
        let mut cmd = Twist::turn(2.0);
        assert_eq!(cmd.angular.z, 2.0);
        assert_eq!(cmd.linear, Vector3::default());
        assert_eq!(cmd.angular.x, 0.0);

        cmd.reset();
        assert!(cmd.is_zero());
    }
}
