//! Axis handling and reflection of points across a coordinate plane.

use std::fmt;
use std::str::FromStr;

use super::core::{Point3, Vec3};

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in `X`, `Y`, `Z` order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Zero-based component index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Upper-case letter used in channel names (`translateX`).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
        }
    }

    /// Unit vector along this axis.
    #[must_use]
    pub const fn unit(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        f.write_str(name)
    }
}

/// Error returned when a string does not name a coordinate axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAxisError {
    input: String,
}

impl ParseAxisError {
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for ParseAxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mirror axis `{}`, expected x, y or z", self.input)
    }
}

impl std::error::Error for ParseAxisError {}

impl FromStr for Axis {
    type Err = ParseAxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            _ => Err(ParseAxisError {
                input: s.to_owned(),
            }),
        }
    }
}

impl Vec3 {
    /// Reflect across the plane orthogonal to `axis` (negates that component).
    #[must_use]
    pub const fn mirrored(self, axis: Axis) -> Self {
        self.with(axis, -self.get(axis))
    }
}

impl Point3 {
    /// Reflect across the plane orthogonal to `axis` (negates that coordinate).
    #[must_use]
    pub const fn mirrored(self, axis: Axis) -> Self {
        let v = self.to_vec3().mirrored(axis);
        Self::new(v.x, v.y, v.z)
    }
}
