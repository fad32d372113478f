use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// 3D vector for track geometry and vehicle physics.
///
/// The driving surface is the x/z plane; `y` is height. Headings are angles in
/// the x/z plane measured from +x toward +z.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };
    pub const FORWARD: Vec3 = Vec3 { x: 1.0, y: 0.0, z: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Point on the ground plane
    #[inline]
    pub fn ground(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    /// Unit vector on the ground plane for a heading angle
    #[inline]
    pub fn from_heading(heading: f32) -> Self {
        Self {
            x: heading.cos(),
            y: 0.0,
            z: heading.sin(),
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            *self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    #[inline]
    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vec3) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Signed turn from `self` to `other` on the ground plane.
    /// Positive when `other` turns toward [`Vec3::left_normal`].
    #[inline]
    pub fn ground_cross(&self, other: Vec3) -> f32 {
        self.x * other.z - self.z * other.x
    }

    /// Projection onto the ground plane
    #[inline]
    pub fn flat(&self) -> Self {
        Self {
            x: self.x,
            y: 0.0,
            z: self.z,
        }
    }

    /// Ground-plane normal rotated a quarter turn from this direction
    pub fn left_normal(&self) -> Self {
        Self {
            x: -self.z,
            y: 0.0,
            z: self.x,
        }
        .normalize()
    }

    /// Heading angle on the ground plane
    #[inline]
    pub fn heading(&self) -> f32 {
        self.z.atan2(self.x)
    }

    #[inline]
    pub fn distance_to(&self, other: Vec3) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec3) -> f32 {
        (*self - other).length_sq()
    }

    /// Distance ignoring height differences
    #[inline]
    pub fn ground_distance_to(&self, other: Vec3) -> f32 {
        (*self - other).flat().length()
    }

    pub fn clamp_length(&self, max: f32) -> Self {
        let len = self.length();
        if len > max && len > 0.0 {
            *self * (max / len)
        } else {
            *self
        }
    }

    pub fn lerp(&self, other: Vec3, t: f32) -> Self {
        *self + (other - *self) * t
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn approx_eq(&self, other: Vec3, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
    }
}

/// Wrap an angle into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;
    fn mul(self, rhs: Vec3) -> Vec3 {
        rhs * self
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl MulAssign<f32> for Vec3 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_length() {
        let v = Vec3::new(2.0, 3.0, 6.0);
        assert!(approx_eq(v.length(), 7.0));
        assert!(approx_eq(v.length_sq(), 49.0));
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
    }

    #[test]
    fn test_cross_matches_right_hand_rule() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert!(x.cross(y).approx_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));
    }

    #[test]
    fn test_ground_cross_sign_follows_left_normal() {
        let dir = Vec3::ground(1.0, 0.0);
        let toward_left = dir + dir.left_normal();
        assert!(dir.ground_cross(toward_left) > 0.0);
        assert!(dir.ground_cross(dir - dir.left_normal()) < 0.0);
    }

    #[test]
    fn test_heading_roundtrip() {
        let v = Vec3::from_heading(PI / 3.0);
        assert!(approx_eq(v.heading(), PI / 3.0));
        assert!(approx_eq(v.length(), 1.0));
        assert!(approx_eq(v.y, 0.0));
    }

    #[test]
    fn test_ground_distance_ignores_height() {
        let a = Vec3::new(0.0, 10.0, 0.0);
        let b = Vec3::new(3.0, -5.0, 4.0);
        assert!(approx_eq(a.ground_distance_to(b), 5.0));
    }

    #[test]
    fn test_clamp_length() {
        let v = Vec3::new(0.0, 6.0, 8.0);
        let clamped = v.clamp_length(5.0);
        assert!(approx_eq(clamped.length(), 5.0));
    }

    #[test]
    fn test_wrap_angle() {
        assert!(approx_eq(wrap_angle(3.0 * PI / 2.0), -PI / 2.0));
        assert!(approx_eq(wrap_angle(-3.0 * PI / 2.0), PI / 2.0));
        assert!(approx_eq(wrap_angle(0.25), 0.25));
    }

    #[test]
    fn test_lerp() {
        let a = Vec3::ZERO;
        let b = Vec3::new(10.0, 10.0, 10.0);
        assert!(a.lerp(b, 0.5).approx_eq(Vec3::new(5.0, 5.0, 5.0), EPSILON));
    }

    #[test]
    fn test_operators() {
        let mut a = Vec3::new(1.0, 2.0, 3.0);
        a += Vec3::new(1.0, 1.0, 1.0);
        a -= Vec3::new(0.5, 0.5, 0.5);
        a *= 2.0;
        assert_eq!(a, Vec3::new(3.0, 5.0, 7.0));
        assert_eq!(-a, Vec3::new(-3.0, -5.0, -7.0));
        assert_eq!(2.0 * Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_serde_json() {
        let v = Vec3::new(1.5, 2.5, -3.0);
        let encoded = serde_json::to_string(&v).unwrap();
        let decoded: Vec3 = serde_json::from_str(&encoded).unwrap();
        assert_eq!(v, decoded);
    }
}
