//! Parser voor skelet-XML met de anchors waar spieren aan hangen.
//!
//! ```xml
//! <skeleton>
//!   <joint name="L_UpperArm" x="5" y="10" z="0"/>
//!   <joint name="L_LowerArm" parent="L_UpperArm" x="5" y="4" z="0"/>
//! </skeleton>
//! ```
//!
//! Posities zijn wereldcoördinaten. Een ouder moet eerder in het document staan.

use std::collections::HashMap;

use quick_xml::de::from_str;
use serde::Deserialize;
use thiserror::Error;

use crate::geom::Point3;
use crate::rig::joint::{JointSpec, create_joint};
use crate::scene::node::NodeId;
use crate::scene::{Scene, SceneError};

/// Result type voor het parsen van skeletten.
pub type ParseResult<T> = Result<T, ParseError>;

/// Beschrijft fouten tijdens het parsen en inladen.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Het XML-document kon niet gede-serialiseerd worden.
    #[error("XML parsefout: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// De ouder van een gewricht is niet eerder gedeclareerd.
    #[error("gewricht `{joint}` verwijst naar onbekende ouder `{parent}`")]
    UnknownParent { joint: String, parent: String },
    #[error("scenefout: {0}")]
    Scene(#[from] SceneError),
}

/// Eén gewricht uit een skelet-document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkeletonJoint {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(default, rename = "@parent")]
    pub parent: Option<String>,
    #[serde(default, rename = "@x")]
    pub x: f64,
    #[serde(default, rename = "@y")]
    pub y: f64,
    #[serde(default, rename = "@z")]
    pub z: f64,
}

impl SkeletonJoint {
    #[must_use]
    pub const fn position(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Deserialize)]
struct SkeletonDocument {
    #[serde(default, rename = "joint")]
    joints: Vec<SkeletonJoint>,
}

/// Leest een skelet-document.
pub fn parse_str(input: &str) -> ParseResult<Vec<SkeletonJoint>> {
    let document: SkeletonDocument = from_str(input)?;
    log::debug!("{} gewrichten in skelet gevonden", document.joints.len());
    Ok(document.joints)
}

/// Leest een skelet-document en maakt de gewrichten aan in de scene.
///
/// Geeft de ids terug in documentvolgorde. Bij een fout blijven de al aangemaakte gewrichten
/// staan.
pub fn load_into(scene: &mut Scene, input: &str) -> ParseResult<Vec<NodeId>> {
    let joints = parse_str(input)?;
    let mut declared: HashMap<String, NodeId> = HashMap::with_capacity(joints.len());
    let mut ids = Vec::with_capacity(joints.len());

    for joint in joints {
        let parent = match &joint.parent {
            Some(parent) => Some(*declared.get(parent).ok_or_else(|| ParseError::UnknownParent {
                joint: joint.name.clone(),
                parent: parent.clone(),
            })?),
            None => None,
        };

        let id = create_joint(scene, JointSpec::new(joint.name.clone()))?;
        if let Some(parent) = parent {
            scene.reparent(id, Some(parent))?;
        }
        scene.set_world_position(id, joint.position())?;

        log::debug!("skeletgewricht `{}` geladen als {:?}", joint.name, id);
        declared.insert(joint.name, id);
        ids.push(id);
    }

    Ok(ids)
}
