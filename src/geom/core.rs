use std::ops::{Add, Div, Mul, Neg, Sub};

use super::mirror::Axis;

// ─────────────────────────────────────────────────────────────────────────────
// Vec3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// All components set to one (unit scale).
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    /// Unit vector along the X axis.
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    /// Unit vector along the Y axis.
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    /// Unit vector along the Z axis.
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn from_array(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Component along `axis`.
    #[must_use]
    pub const fn get(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Copy with the component along `axis` replaced.
    #[must_use]
    pub const fn with(self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => Self::new(value, self.y, self.z),
            Axis::Y => Self::new(self.x, value, self.z),
            Axis::Z => Self::new(self.x, self.y, value),
        }
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// Unit-length copy, or `None` for (near) zero vectors.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > Tolerance::ZERO_LENGTH.eps {
            Some(Self::new(self.x / len, self.y / len, self.z / len))
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Largest absolute component.
    #[must_use]
    pub fn max_abs(self) -> f64 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::from_array(arr)
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// The origin point (0, 0, 0).
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn from_array(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Convert point to a position vector from the origin.
    #[must_use]
    pub const fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).length()
    }
}

impl Default for Point3 {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::from_array(arr)
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        p.to_array()
    }
}

impl From<Vec3> for Point3 {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<Vec3> for Point3 {
    type Output = Self;
    fn sub(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// Affine 4x4 matrix acting on column vectors (`m * p`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: [[f64; 4]; 4],
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Construct a transform from origin and three axes (the matrix columns).
    #[must_use]
    pub fn from_axes(origin: Point3, x_axis: Vec3, y_axis: Vec3, z_axis: Vec3) -> Self {
        Self {
            m: [
                [x_axis.x, y_axis.x, z_axis.x, origin.x],
                [x_axis.y, y_axis.y, z_axis.y, origin.y],
                [x_axis.z, y_axis.z, z_axis.z, origin.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub const fn translate(offset: Vec3) -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, offset.x],
                [0.0, 1.0, 0.0, offset.y],
                [0.0, 0.0, 1.0, offset.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub fn scale(factors: Vec3) -> Self {
        Self {
            m: [
                [factors.x, 0.0, 0.0, 0.0],
                [0.0, factors.y, 0.0, 0.0],
                [0.0, 0.0, factors.z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub fn compose(self, other: Self) -> Self {
        let mut result = Self::identity();
        for i in 0..4 {
            for j in 0..4 {
                result.m[i][j] = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j]
                    + self.m[i][3] * other.m[3][j];
            }
        }
        result
    }

    /// Inverse of the affine transform, `None` when the linear part is singular.
    #[must_use]
    pub fn inverse(self) -> Option<Self> {
        let m = &self.m;
        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if !det.is_finite() || det.abs() < 1e-15 {
            return None;
        }
        let inv_det = 1.0 / det;

        let r = [
            [
                c00 * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                c01 * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                c02 * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ];

        let t = [m[0][3], m[1][3], m[2][3]];
        let mut result = Self::identity();
        for i in 0..3 {
            for j in 0..3 {
                result.m[i][j] = r[i][j];
            }
            result.m[i][3] = -(r[i][0] * t[0] + r[i][1] * t[1] + r[i][2] * t[2]);
        }
        Some(result)
    }

    /// Transpose of the linear part; the inverse of a pure rotation.
    #[must_use]
    pub fn transposed_rotation(self) -> Self {
        let mut result = Self::identity();
        for i in 0..3 {
            for j in 0..3 {
                result.m[i][j] = self.m[j][i];
            }
        }
        result
    }

    /// Get the translation component of this transform.
    #[must_use]
    pub fn translation(self) -> Vec3 {
        Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    /// Column of the linear part for `axis` (the transformed basis vector).
    #[must_use]
    pub fn axis(self, axis: Axis) -> Vec3 {
        let col = axis.index();
        Vec3::new(self.m[0][col], self.m[1][col], self.m[2][col])
    }

    /// Lengths of the three basis columns.
    #[must_use]
    pub fn scale_factors(self) -> Vec3 {
        Vec3::new(
            self.axis(Axis::X).length(),
            self.axis(Axis::Y).length(),
            self.axis(Axis::Z).length(),
        )
    }

    /// Rotation part: normalized basis columns without translation.
    #[must_use]
    pub fn rotation(self) -> Self {
        let x = self.axis(Axis::X).normalized().unwrap_or(Vec3::X);
        let y = self.axis(Axis::Y).normalized().unwrap_or(Vec3::Y);
        let z = self.axis(Axis::Z).normalized().unwrap_or(Vec3::Z);
        Self::from_axes(Point3::ORIGIN, x, y, z)
    }

    #[must_use]
    pub fn apply_point(self, p: Point3) -> Point3 {
        let x = self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2] * p.z + self.m[0][3];
        let y = self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2] * p.z + self.m[1][3];
        let z = self.m[2][0] * p.x + self.m[2][1] * p.y + self.m[2][2] * p.z + self.m[2][3];
        Point3::new(x, y, z)
    }

    #[must_use]
    pub fn apply_vec(self, v: Vec3) -> Vec3 {
        let x = self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z;
        let y = self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z;
        let z = self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z;
        Vec3::new(x, y, z)
    }

    /// Largest element-wise difference with another transform.
    #[must_use]
    pub fn max_difference(&self, other: &Self) -> f64 {
        let mut max = 0.0_f64;
        for i in 0..4 {
            for j in 0..4 {
                max = max.max((self.m[i][j] - other.m[i][j]).abs());
            }
        }
        max
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Transform {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

/// Orthonormal frame whose X column follows `primary` and whose Y column lies in the plane of
/// `primary` and `secondary`.
fn orthonormal_frame(primary: Vec3, secondary: Vec3) -> Option<Transform> {
    let x = primary.normalized()?;
    let z = x.cross(secondary).normalized()?;
    let y = z.cross(x);
    Some(Transform::from_axes(Point3::ORIGIN, x, y, z))
}

/// Rotation that maps the local `aim` vector onto `direction` while keeping the local `up`
/// vector as close as possible to `world_up`.
///
/// Returns `None` when the direction is degenerate or parallel to the up vector.
#[must_use]
pub fn aim_rotation(direction: Vec3, world_up: Vec3, aim: Vec3, up: Vec3) -> Option<Transform> {
    let world = orthonormal_frame(direction, world_up)?;
    let local = orthonormal_frame(aim, up)?;
    Some(world.compose(local.transposed_rotation()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerance configuration for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    /// Default geometric tolerance (1e-9).
    pub const DEFAULT: Self = Self { eps: 1e-9 };

    /// Tolerance for detecting zero-length vectors (1e-12).
    pub const ZERO_LENGTH: Self = Self { eps: 1e-12 };

    /// Loose tolerance for solver convergence and coarse comparisons (1e-6).
    pub const LOOSE: Self = Self { eps: 1e-6 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[must_use]
    pub fn approx_eq_f64(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }

    #[must_use]
    pub fn approx_eq_vec3(self, a: Vec3, b: Vec3) -> bool {
        (a - b).max_abs() <= self.eps
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        (a - b).max_abs() <= self.eps
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_axis_access() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.get(Axis::Y), 2.0);
        assert_eq!(v.with(Axis::Z, -1.0), Vec3::new(1.0, 2.0, -1.0));
    }

    #[test]
    fn test_point_distance() {
        let a = Point3::new(1.0, 2.0, 2.0);
        assert!(Tolerance::DEFAULT.approx_eq_f64(a.distance_to(Point3::ORIGIN), 3.0));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let rotation = aim_rotation(Vec3::new(1.0, 1.0, 0.0), Vec3::Y, Vec3::X, Vec3::Y)
            .expect("valid aim");
        let t = Transform::translate(Vec3::new(3.0, -2.0, 5.0))
            * rotation
            * Transform::scale(Vec3::new(2.0, 0.5, 1.0));
        let inv = t.inverse().expect("invertible");
        let p = Point3::new(0.3, 4.0, -1.5);
        let back = inv.apply_point(t.apply_point(p));
        assert!(Tolerance::DEFAULT.approx_eq_point3(p, back));
        assert!((t * inv).max_difference(&Transform::identity()) < 1e-12);
    }

    #[test]
    fn test_singular_inverse() {
        assert!(Transform::scale(Vec3::new(1.0, 0.0, 1.0)).inverse().is_none());
    }

    #[test]
    fn test_aim_rotation_maps_aim_axis() {
        let direction = Vec3::new(0.0, 0.0, -4.0);
        let r = aim_rotation(direction, Vec3::Y, Vec3::X, Vec3::Y).expect("valid aim");
        assert!(Tolerance::DEFAULT.approx_eq_vec3(r.apply_vec(Vec3::X), Vec3::new(0.0, 0.0, -1.0)));
        assert!(Tolerance::DEFAULT.approx_eq_vec3(r.apply_vec(Vec3::Y), Vec3::Y));
    }

    #[test]
    fn test_aim_rotation_negative_axis() {
        let r = aim_rotation(Vec3::new(-2.0, 0.0, 0.0), Vec3::Y, -Vec3::X, Vec3::Y)
            .expect("valid aim");
        // -X points along -X world, so the frame is the identity.
        assert!(r.max_difference(&Transform::identity()) < 1e-12);
    }

    #[test]
    fn test_aim_rotation_parallel_up_is_none() {
        assert!(aim_rotation(Vec3::Y, Vec3::Y, Vec3::X, Vec3::Y).is_none());
        assert!(aim_rotation(Vec3::ZERO, Vec3::Y, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn test_rotation_strips_scale() {
        let t = Transform::translate(Vec3::new(1.0, 1.0, 1.0)) * Transform::scale(Vec3::new(2.0, 3.0, 4.0));
        assert!(Tolerance::DEFAULT.approx_eq_vec3(t.scale_factors(), Vec3::new(2.0, 3.0, 4.0)));
        assert!(t.rotation().max_difference(&Transform::identity()) < 1e-12);
    }
}
