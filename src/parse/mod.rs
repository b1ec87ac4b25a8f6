//! Parsers voor externe invoer.

pub mod skeleton_xml;

pub use skeleton_xml::{ParseError, ParseResult, SkeletonJoint};
