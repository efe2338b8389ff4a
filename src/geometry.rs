//! Vectors and oriented frames used to describe rod centerlines.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::quaternion::Quaternion;

/// Length below which a vector is treated as zero.
pub const EPS: f64 = 1e-12;

/// 3D vector with f64 components.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const ZERO: Self = Self::new(0., 0., 0.);
    pub const X: Self = Self::new(1., 0., 0.);
    pub const Y: Self = Self::new(0., 1., 0.);
    pub const Z: Self = Self::new(0., 0., 1.);

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for a degenerate vector.
    pub fn unit(self) -> Self {
        let n = self.norm();
        if n < EPS {
            return Self::ZERO;
        }
        self / n
    }

    /// Component of `self` orthogonal to the unit vector `t`.
    pub fn reject(self, t: Self) -> Self {
        self - t * self.dot(t)
    }

    /// Largest absolute component.
    pub fn max_abs(self) -> f64 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }

    /// Any unit vector orthogonal to `self`.
    pub fn perpendicular(self) -> Self {
        let axis = if self.x.abs() <= self.y.abs() && self.x.abs() <= self.z.abs() {
            Self::X
        } else if self.y.abs() <= self.z.abs() {
            Self::Y
        } else {
            Self::Z
        };
        self.cross(axis).unit()
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl Add for Vector3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Vector3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Mul<Vector3> for f64 {
    type Output = Vector3;
    fn mul(self, v: Vector3) -> Vector3 {
        v * self
    }
}

impl Div<f64> for Vector3 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Vector3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Orthonormal material frame attached to a rod vertex.
///
/// - `xaxis`: first cross-section direction (d1)
/// - `yaxis`: second cross-section direction (d2 = t × d1)
/// - `zaxis`: centerline tangent (t)
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub origin: Vector3,
    pub xaxis: Vector3,
    pub yaxis: Vector3,
    pub zaxis: Vector3,
}

impl Default for Frame {
    fn default() -> Self {
        Self::world()
    }
}

impl Frame {
    /// World frame at the origin.
    pub const fn world() -> Self {
        Self {
            origin: Vector3::ZERO,
            xaxis: Vector3::X,
            yaxis: Vector3::Y,
            zaxis: Vector3::Z,
        }
    }

    /// Builds a right-handed frame from a tangent and a hint for the first
    /// cross-section axis. The hint is projected onto the plane normal to
    /// the tangent; a hint parallel to the tangent is replaced by an
    /// arbitrary perpendicular.
    pub fn new(origin: Vector3, tangent: Vector3, xhint: Vector3) -> Self {
        let zaxis = tangent.unit();
        let mut xaxis = xhint.reject(zaxis).unit();
        if xaxis == Vector3::ZERO {
            xaxis = zaxis.perpendicular();
        }
        Self {
            origin,
            xaxis,
            yaxis: zaxis.cross(xaxis),
            zaxis,
        }
    }

    pub fn translate(&mut self, dv: Vector3) {
        self.origin += dv;
    }

    /// Rotates the cross-section axes about the tangent.
    pub fn rotate_about_tangent(&mut self, angle: f64) {
        if angle == 0. {
            return;
        }
        let q = Quaternion::from_axis_angle(self.zaxis, angle);
        self.xaxis = q.rotate_vector(self.xaxis).reject(self.zaxis).unit();
        self.yaxis = self.zaxis.cross(self.xaxis);
    }

    /// Parallel transports the frame onto a new tangent, moving it to `origin`.
    pub fn transported_to(&self, origin: Vector3, tangent: Vector3) -> Self {
        let tangent = tangent.unit();
        if tangent == Vector3::ZERO {
            return Self { origin, ..*self };
        }
        let q = Quaternion::between(self.zaxis, tangent);
        Self::new(origin, tangent, q.rotate_vector(self.xaxis))
    }

    /// Components of a global vector in (d1, d2, t).
    pub fn to_local(&self, v: Vector3) -> Vector3 {
        Vector3::new(v.dot(self.xaxis), v.dot(self.yaxis), v.dot(self.zaxis))
    }

    /// Global vector from components in (d1, d2, t).
    pub fn to_global(&self, v: Vector3) -> Vector3 {
        self.xaxis * v.x + self.yaxis * v.y + self.zaxis * v.z
    }
}
