//! Procedurele spier-rigs: opbouw, deformatiecurves, edit-sessies, metadata en spiegelen.
//!
//! Een rig bestaat uit zeven gewrichten in de keten
//! `origin → base → {tip, driver}`, `driver → offset → output joint`,
//! met een live aim constraint op `base` en een live point constraint op `driver`.

use thiserror::Error;

use crate::geom::{ParseAxisError, Vec3};
use crate::scene::node::NodeId;
use crate::scene::{Scene, SceneError};

mod builder;
pub mod curve;
mod edit;
pub mod joint;
pub mod metadata;
pub mod mirror;

pub use edit::{EditSession, LocatorRole};
pub use metadata::{MetadataError, RigDocument, RigRecord};

/// Result type voor rig-operaties.
pub type RigResult<T> = Result<T, RigError>;

/// Parameters van het deformatiemodel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeformationParams {
    /// Lengtefactor van de compressiepose (verwacht `0 < f ≤ 1`).
    pub compression_factor: f64,
    /// Lengtefactor van de stretchpose (verwacht `f ≥ 1`).
    pub stretch_factor: f64,
    /// Translatie van het output-gewricht in de stretchpose.
    pub stretch_offset: Vec3,
    /// Translatie van het output-gewricht in de compressiepose.
    pub compression_offset: Vec3,
}

impl Default for DeformationParams {
    fn default() -> Self {
        Self {
            compression_factor: 1.0,
            stretch_factor: 1.0,
            stretch_offset: Vec3::ZERO,
            compression_offset: Vec3::ZERO,
        }
    }
}

impl DeformationParams {
    #[must_use]
    pub fn new(compression_factor: f64, stretch_factor: f64) -> Self {
        Self {
            compression_factor,
            stretch_factor,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_offsets(mut self, stretch_offset: Vec3, compression_offset: Vec3) -> Self {
        self.stretch_offset = stretch_offset;
        self.compression_offset = compression_offset;
        self
    }

    /// Controleer lengte en factoren.
    ///
    /// Factoren `≤ 0` maken `sqrt(1/f)` ongedefinieerd en worden geweigerd. Waarden buiten
    /// `0 < compressie ≤ 1 ≤ stretch` geven alleen een waarschuwing.
    pub fn validate(&self, length: f64) -> RigResult<()> {
        if !length.is_finite() || length <= 0.0 {
            return Err(RigError::InvalidParameters(format!(
                "spierlengte moet positief zijn, kreeg {length}"
            )));
        }
        for (label, factor) in [
            ("compressiefactor", self.compression_factor),
            ("stretchfactor", self.stretch_factor),
        ] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(RigError::InvalidParameters(format!(
                    "{label} moet positief zijn, kreeg {factor}"
                )));
            }
        }
        if !self.stretch_offset.is_finite() || !self.compression_offset.is_finite() {
            return Err(RigError::InvalidParameters(
                "offsets moeten eindige getallen zijn".to_owned(),
            ));
        }

        if self.compression_factor > 1.0 || self.stretch_factor < 1.0 {
            log::warn!(
                "factoren buiten het fysieke bereik (compressie {}, stretch {}): de curve is niet monotoon",
                self.compression_factor,
                self.stretch_factor
            );
        }
        Ok(())
    }
}

/// De zeven structurele gewrichten van een rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigNodes {
    pub origin: NodeId,
    pub base: NodeId,
    pub insertion: NodeId,
    pub tip: NodeId,
    pub driver: NodeId,
    pub offset: NodeId,
    pub output_joint: NodeId,
}

impl RigNodes {
    /// Rolnaam en id van elk gewricht, in ketenvolgorde.
    #[must_use]
    pub const fn roles(&self) -> [(&'static str, NodeId); 7] {
        [
            ("origin", self.origin),
            ("base", self.base),
            ("insertion", self.insertion),
            ("tip", self.tip),
            ("driver", self.driver),
            ("offset", self.offset),
            ("outputJoint", self.output_joint),
        ]
    }
}

/// Toestand van de edit/commit-cyclus.
#[derive(Debug, Clone, PartialEq)]
pub enum RigState {
    Committed,
    Editing(EditSession),
}

/// Beschrijving van één spier-rig in de scene.
#[derive(Debug, Clone, PartialEq)]
pub struct MuscleRig {
    name: String,
    rest_length: f64,
    params: DeformationParams,
    nodes: RigNodes,
    main_aim_constraint: NodeId,
    /// Ontbreekt zolang een edit-sessie open is.
    main_point_constraint: Option<NodeId>,
    origin_anchor: Option<NodeId>,
    insertion_anchor: Option<NodeId>,
    state: RigState,
}

impl MuscleRig {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn rest_length(&self) -> f64 {
        self.rest_length
    }

    #[must_use]
    pub const fn params(&self) -> &DeformationParams {
        &self.params
    }

    #[must_use]
    pub const fn nodes(&self) -> &RigNodes {
        &self.nodes
    }

    #[must_use]
    pub const fn main_aim_constraint(&self) -> NodeId {
        self.main_aim_constraint
    }

    #[must_use]
    pub const fn main_point_constraint(&self) -> Option<NodeId> {
        self.main_point_constraint
    }

    #[must_use]
    pub const fn origin_anchor(&self) -> Option<NodeId> {
        self.origin_anchor
    }

    #[must_use]
    pub const fn insertion_anchor(&self) -> Option<NodeId> {
        self.insertion_anchor
    }

    #[must_use]
    pub const fn state(&self) -> &RigState {
        &self.state
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        matches!(self.state, RigState::Editing(_))
    }

    /// Open edit-sessie, indien aanwezig.
    #[must_use]
    pub const fn session(&self) -> Option<&EditSession> {
        match &self.state {
            RigState::Editing(session) => Some(session),
            RigState::Committed => None,
        }
    }

    /// Controleer dat alle structurele gewrichten nog in de scene staan.
    pub fn ensure_nodes(&self, scene: &Scene) -> RigResult<()> {
        for (role, id) in self.nodes.roles() {
            if !scene.exists(id) {
                return Err(RigError::MissingNode {
                    rig: self.name.clone(),
                    role,
                });
            }
        }
        Ok(())
    }
}

/// Fouten bij het opbouwen en bewerken van rigs.
#[derive(Debug, Error)]
pub enum RigError {
    /// Lengte of factoren zijn onbruikbaar.
    #[error("ongeldige parameters: {0}")]
    InvalidParameters(String),
    #[error("rig `{rig}` heeft al een open edit-sessie")]
    AlreadyEditing { rig: String },
    #[error("rig `{rig}` heeft geen open edit-sessie")]
    NotEditing { rig: String },
    /// Een structurele node is buiten de rig om verwijderd.
    #[error("node `{role}` van rig `{rig}` bestaat niet meer")]
    MissingNode { rig: String, role: &'static str },
    #[error(transparent)]
    InvalidAxis(#[from] ParseAxisError),
    /// De naam bevat geen zijde-aanduiding om te spiegelen.
    #[error("naam `{0}` bevat geen `Left` of `Right`")]
    MissingSideMarker(String),
    #[error("anchor `{name}` niet gevonden in de scene{}", suggestion_hint(.suggestion))]
    UnknownAnchor {
        name: String,
        suggestion: Option<String>,
    },
    #[error("onbekende locator `{0}`, verwacht origin, insertion of center")]
    UnknownLocator(String),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("scenefout: {0}")]
    Scene(#[from] SceneError),
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|name| format!(" (bedoelde je `{name}`?)"))
        .unwrap_or_default()
}
