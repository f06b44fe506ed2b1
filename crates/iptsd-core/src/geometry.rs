#![forbid(unsafe_code)]

//! Geometric primitives.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A 2D vector in normalized sensor-surface units.
///
/// Used both for positions (contact centroids, stylus coordinates) and for
/// extents (ellipse axis lengths).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Elementwise absolute value.
    #[inline]
    #[must_use]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    /// Euclidean length.
    #[inline]
    #[must_use]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Whether every component is `<= limit`.
    #[inline]
    #[must_use]
    pub fn all_le(self, limit: f64) -> bool {
        self.x <= limit && self.y <= limit
    }

    /// Clamp each component into `[min, max]`.
    #[inline]
    #[must_use]
    pub fn clamp(self, min: f64, max: f64) -> Self {
        Self::new(self.x.clamp(min, max), self.y.clamp(min, max))
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for f64 {
    type Output = Vec2;

    fn mul(self, rhs: Vec2) -> Vec2 {
        rhs * self
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_is_euclidean() {
        assert_eq!(Vec2::new(3.0, 4.0).norm(), 5.0);
        assert_eq!(Vec2::ZERO.norm(), 0.0);
    }

    #[test]
    fn abs_and_all_le() {
        let v = Vec2::new(-0.2, 0.1).abs();
        assert_eq!(v, Vec2::new(0.2, 0.1));
        assert!(v.all_le(0.2));
        assert!(!v.all_le(0.15));
    }

    #[test]
    fn arithmetic() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(0.5, 0.5);
        assert_eq!(a - b, Vec2::new(0.5, 1.5));
        assert_eq!(a + b, Vec2::new(1.5, 2.5));
        assert_eq!(2.0 * b, Vec2::new(1.0, 1.0));
        assert_eq!(a / 2.0, Vec2::new(0.5, 1.0));
        assert_eq!(-a, Vec2::new(-1.0, -2.0));

        let mut c = a;
        c -= b;
        c += b;
        assert_eq!(c, a);
    }

    #[test]
    fn clamp_bounds_each_axis() {
        assert_eq!(Vec2::new(-0.5, 1.5).clamp(0.0, 1.0), Vec2::new(0.0, 1.0));
    }
}
