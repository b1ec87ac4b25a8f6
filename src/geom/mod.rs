//! Vector math used by the scene graph and the rig builders.

mod core;
mod mirror;

pub use core::{Point3, Tolerance, Transform, Vec3, aim_rotation};
pub use mirror::{Axis, ParseAxisError};
