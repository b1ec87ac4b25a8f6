//! Definitie van nodes binnen de scene.

use std::collections::BTreeMap;
use std::fmt;

use crate::geom::{Axis, Transform, Vec3};

use super::constraint::Constraint;
use super::driven_key::DrivenCurve;

/// Identifier voor een node binnen de scene.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct NodeId(pub usize);

impl NodeId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

/// Het soort node en de bijbehorende type-specifieke gegevens.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Skeletgewricht met een weergaveradius.
    Joint {
        radius: f64,
        /// Compenseert de schaal van een bovenliggend gewricht.
        segment_scale_compensate: bool,
    },
    /// Eenvoudige markering zonder geometrie.
    Locator { local_scale: f64 },
    /// Lege transform die alleen kinderen groepeert.
    Group,
    /// Live positie- of richtingsrelatie.
    Constraint(Constraint),
    /// Driven-key curve die een kanaal aanstuurt.
    DrivenCurve(DrivenCurve),
    /// Dataknoop zonder visuele representatie.
    Network,
}

impl NodeKind {
    /// Gewricht met standaard schaalcompensatie.
    #[must_use]
    pub const fn joint(radius: f64) -> Self {
        Self::Joint {
            radius,
            segment_scale_compensate: true,
        }
    }

    #[must_use]
    pub const fn locator(local_scale: f64) -> Self {
        Self::Locator { local_scale }
    }

    /// Geeft aan of de node een eigen transform heeft.
    #[must_use]
    pub const fn is_transform(&self) -> bool {
        matches!(self, Self::Joint { .. } | Self::Locator { .. } | Self::Group)
    }

    #[must_use]
    pub const fn is_joint(&self) -> bool {
        matches!(self, Self::Joint { .. })
    }

    /// Korte typenaam, zoals getoond in scene-overzichten.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Joint { .. } => "joint",
            Self::Locator { .. } => "locator",
            Self::Group => "group",
            Self::Constraint(constraint) => constraint.type_name(),
            Self::DrivenCurve(_) => "drivenCurve",
            Self::Network => "network",
        }
    }
}

/// Lokale transformatie van een node ten opzichte van zijn ouder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translate: Vec3,
    pub rotate: Transform,
    /// Oriëntatie-offset van gewrichten, toegepast vóór `rotate`.
    pub joint_orient: Transform,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            rotate: Transform::identity(),
            joint_orient: Transform::identity(),
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    /// Matrix `JO · R · S` zonder translatie.
    #[must_use]
    pub fn linear(&self) -> Transform {
        self.joint_orient * self.rotate * Transform::scale(self.scale)
    }

    /// Zet translatie, rotatie en oriëntatie terug naar nul; de schaal blijft behouden.
    pub fn zero_placement(&mut self) {
        self.translate = Vec3::ZERO;
        self.rotate = Transform::identity();
        self.joint_orient = Transform::identity();
    }

    /// Grootste verschil met een andere lokale transformatie.
    #[must_use]
    pub fn max_difference(&self, other: &Self) -> f64 {
        (self.translate - other.translate)
            .max_abs()
            .max((self.scale - other.scale).max_abs())
            .max(self.rotate.max_difference(&other.rotate))
            .max(self.joint_orient.max_difference(&other.joint_orient))
    }
}

/// Animeerbaar scalair kanaal van een transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Translate(Axis),
    Scale(Axis),
}

impl Channel {
    #[must_use]
    pub fn read(self, local: &LocalTransform) -> f64 {
        match self {
            Self::Translate(axis) => local.translate.get(axis),
            Self::Scale(axis) => local.scale.get(axis),
        }
    }

    pub fn write(self, local: &mut LocalTransform, value: f64) {
        match self {
            Self::Translate(axis) => local.translate = local.translate.with(axis, value),
            Self::Scale(axis) => local.scale = local.scale.with(axis, value),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translate(axis) => write!(f, "translate{}", axis.letter()),
            Self::Scale(axis) => write!(f, "scale{}", axis.letter()),
        }
    }
}

/// Waarde van een eigen attribuut op een node.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Vector([f64; 3]),
    Text(String),
    Boolean(bool),
    /// Referentie-attribuut; de waarde leeft in de verbindingen.
    Message,
}

impl AttrValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        if let Self::Number(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<Vec3> {
        if let Self::Vector(v) = self {
            Some(Vec3::from_array(*v))
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Self::Text(v) = self {
            Some(v)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        if let Self::Boolean(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Vector(_) => "vector",
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
            Self::Message => "message",
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec3> for AttrValue {
    fn from(value: Vec3) -> Self {
        Self::Vector(value.to_array())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Alias voor de eigen attributen van een node.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Kleurindex uit het vaste palet van de host.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DisplayColor(pub u8);

impl DisplayColor {
    pub const BLUE: Self = Self(5);
    pub const MAGENTA: Self = Self(9);
    pub const RED: Self = Self(13);
}

/// Weergave-override van een node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Display {
    /// Template-weergave: zichtbaar maar niet selecteerbaar.
    pub template: bool,
    pub color: Option<DisplayColor>,
}

/// Node representatie binnen de scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unieke identifier binnen de scene.
    pub id: NodeId,
    /// Unieke naam van de node.
    pub name: String,
    pub kind: NodeKind,
    /// Bovenliggende node in de DAG, indien aanwezig.
    pub parent: Option<NodeId>,
    pub local: LocalTransform,
    pub display: Display,
    /// Eigen attributen die door gebruikers zijn toegevoegd.
    pub attrs: AttrMap,
}

impl Node {
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            parent: None,
            local: LocalTransform::default(),
            display: Display::default(),
            attrs: AttrMap::new(),
        }
    }

    /// Weergaveradius van een gewricht.
    #[must_use]
    pub fn radius(&self) -> Option<f64> {
        if let NodeKind::Joint { radius, .. } = self.kind {
            Some(radius)
        } else {
            None
        }
    }
}
