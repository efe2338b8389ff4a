use crate::geometry::{Vector3, EPS};

/// Unit quaternion `w + xi + yj + zk` for frame rotations.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.,
        x: 0.,
        y: 0.,
        z: 0.,
    };

    /// Rotation of `angle` about `axis` (normalized internally).
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        let axis = axis.unit();
        let (s, c) = (angle / 2.).sin_cos();
        Self {
            w: c,
            x: s * axis.x,
            y: s * axis.y,
            z: s * axis.z,
        }
    }

    /// Minimal rotation taking the unit vector `from` onto the unit vector `to`.
    ///
    /// Opposite vectors are related by a half turn about an arbitrary
    /// perpendicular axis.
    pub fn between(from: Vector3, to: Vector3) -> Self {
        let b = from.cross(to);
        let s = b.norm();
        let c = from.dot(to);
        if s < EPS {
            if c >= 0. {
                return Self::IDENTITY;
            }
            return Self::from_axis_angle(from.perpendicular(), std::f64::consts::PI);
        }
        Self::from_axis_angle(b / s, s.atan2(c))
    }

    #[inline]
    pub fn rotate_vector(&self, v: Vector3) -> Vector3 {
        let (w, x, y, z) = (self.w, self.x, self.y, self.z);
        Vector3::new(
            (w * w + x * x - y * y - z * z) * v.x
                + 2. * (x * y - w * z) * v.y
                + 2. * (x * z + w * y) * v.z,
            2. * (x * y + w * z) * v.x
                + (w * w - x * x + y * y - z * z) * v.y
                + 2. * (y * z - w * x) * v.z,
            2. * (x * z - w * y) * v.x
                + 2. * (y * z + w * x) * v.y
                + (w * w - x * x - y * y + z * z) * v.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn close(a: Vector3, b: Vector3) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn test_rotate_vector() {
        let q = Quaternion::from_axis_angle(Vector3::Z, PI / 2.);
        assert!(close(q.rotate_vector(Vector3::X), Vector3::Y));
    }

    #[test]
    fn test_between() {
        let from = Vector3::new(1., 2., -1.).unit();
        let to = Vector3::new(-0.5, 0.1, 3.).unit();
        assert!(close(Quaternion::between(from, to).rotate_vector(from), to));
        assert!(close(Quaternion::between(from, -from).rotate_vector(from), -from));
        assert_eq!(Quaternion::between(from, from), Quaternion::IDENTITY);
    }
}
