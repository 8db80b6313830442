//! Planar Geometry
//!
//! Minimal 2D vector math for positions, velocities and steering.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

/// A point or displacement in arena pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` radians
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Angle of this vector in radians, or `fallback` for a zero vector
    pub fn angle_or(self, fallback: f32) -> f32 {
        if self.length() <= f32::EPSILON {
            fallback
        } else {
            self.y.atan2(self.x)
        }
    }

    /// Unit vector in the same direction, or `fallback` for a (near) zero vector
    pub fn normalized_or(self, fallback: Vec2) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            fallback
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamp into the rectangle `[margin, width - margin] x [margin, height - margin]`
    pub fn clamp_to(self, width: f32, height: f32, margin: f32) -> Vec2 {
        let max_x = (width - margin).max(margin);
        let max_y = (height - margin).max(margin);
        Vec2::new(self.x.clamp(margin, max_x), self.y.clamp(margin, max_y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Vec2::new(x, y)
    }
}
