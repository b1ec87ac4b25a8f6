//! Opslag van rig-gegevens op een data node en als XML-document.
//!
//! Een [`RigRecord`] is de getypeerde, geversioneerde vorm van alles wat nodig is om een
//! [`MuscleRig`] opnieuw aan bestaande scene-nodes te binden. Op een data node staan scalaire
//! parameters als attributen en verwijzingen als message-verbindingen; elk doel krijgt een
//! `{naam}_dataParent` attribuut als terugverwijzing.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::Vec3;
use crate::scene::node::{NodeId, NodeKind};
use crate::scene::Scene;

use super::{DeformationParams, MuscleRig, RigNodes, RigResult, RigState};

/// Huidige versie van het record.
pub const RECORD_VERSION: u32 = 1;

/// Typelabel op de data node.
pub const RIG_TYPE: &str = "muscleJointGroup";

const ORIGIN_ATTR: &str = "muscleOrigin";
const BASE_ATTR: &str = "muscleBase";
const INSERTION_ATTR: &str = "muscleInsertion";
const TIP_ATTR: &str = "muscleTip";
const DRIVER_ATTR: &str = "muscleDriver";
const OFFSET_ATTR: &str = "muscleOffset";
const OUTPUT_ATTR: &str = "muscleJoint";
const MAIN_POINT_ATTR: &str = "mainPtConst";
const MAIN_AIM_ATTR: &str = "mainAimConst";
const ORIGIN_ANCHOR_ATTR: &str = "originAttachObj";
const INSERTION_ANCHOR_ATTR: &str = "insertionAttachObj";

/// Naam van de data node van een rig.
#[must_use]
pub fn data_node_name(rig: &str) -> String {
    format!("{rig}_dataNode")
}

fn back_reference_attr(rig: &str) -> String {
    format!("{rig}_dataParent")
}

/// Fouten bij het opslaan en teruglezen van rig-gegevens.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("rig `{0}` heeft een open edit-sessie en kan niet opgeslagen worden")]
    NotCommitted(String),
    #[error("node `{node}` is geen spier-rig (type `{found}`)")]
    WrongType { node: String, found: String },
    #[error("recordversie {found} wordt niet ondersteund (hoogste versie {supported})")]
    UnsupportedVersion { found: f64, supported: u32 },
    /// Een verwijzing op de data node is niet verbonden.
    #[error("verwijzing `{0}` ontbreekt")]
    MissingReference(String),
    #[error("node `{0}` bestaat niet in de scene")]
    UnknownNodeName(String),
    #[error("XML fout: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// Getypeerde momentopname van een gecommitte rig.
#[derive(Debug, Clone, PartialEq)]
pub struct RigRecord {
    pub version: u32,
    pub name: String,
    pub rest_length: f64,
    pub params: DeformationParams,
    pub nodes: RigNodes,
    pub main_point_constraint: NodeId,
    pub main_aim_constraint: NodeId,
    pub origin_anchor: Option<NodeId>,
    pub insertion_anchor: Option<NodeId>,
}

impl RigRecord {
    /// Leg de gegevens van een gecommitte rig vast.
    pub fn from_rig(rig: &MuscleRig) -> Result<Self, MetadataError> {
        let main_point_constraint = match (&rig.state, rig.main_point_constraint) {
            (RigState::Committed, Some(id)) => id,
            _ => return Err(MetadataError::NotCommitted(rig.name.clone())),
        };
        Ok(Self {
            version: RECORD_VERSION,
            name: rig.name.clone(),
            rest_length: rig.rest_length,
            params: rig.params,
            nodes: rig.nodes,
            main_point_constraint,
            main_aim_constraint: rig.main_aim_constraint,
            origin_anchor: rig.origin_anchor,
            insertion_anchor: rig.insertion_anchor,
        })
    }

    /// Bind het record aan de bestaande nodes als gecommitte rig.
    #[must_use]
    pub fn into_rig(self) -> MuscleRig {
        MuscleRig {
            name: self.name,
            rest_length: self.rest_length,
            params: self.params,
            nodes: self.nodes,
            main_aim_constraint: self.main_aim_constraint,
            main_point_constraint: Some(self.main_point_constraint),
            origin_anchor: self.origin_anchor,
            insertion_anchor: self.insertion_anchor,
            state: RigState::Committed,
        }
    }

    fn references(&self) -> Vec<(&'static str, NodeId)> {
        let mut references = vec![
            (ORIGIN_ATTR, self.nodes.origin),
            (BASE_ATTR, self.nodes.base),
            (INSERTION_ATTR, self.nodes.insertion),
            (TIP_ATTR, self.nodes.tip),
            (DRIVER_ATTR, self.nodes.driver),
            (OFFSET_ATTR, self.nodes.offset),
            (OUTPUT_ATTR, self.nodes.output_joint),
            (MAIN_POINT_ATTR, self.main_point_constraint),
            (MAIN_AIM_ATTR, self.main_aim_constraint),
        ];
        if let Some(anchor) = self.origin_anchor {
            references.push((ORIGIN_ANCHOR_ATTR, anchor));
        }
        if let Some(anchor) = self.insertion_anchor {
            references.push((INSERTION_ANCHOR_ATTR, anchor));
        }
        references
    }

    /// Schrijf het record naar een nieuwe data node. Een bestaande data node met dezelfde naam
    /// wordt eerst verwijderd.
    pub fn write(&self, scene: &mut Scene) -> RigResult<NodeId> {
        let name = data_node_name(&self.name);
        if let Some(existing) = scene.find(&name) {
            scene.delete(existing)?;
        }

        let data = scene.create_node(name, NodeKind::Network)?;
        scene.set_attr(data, "name", self.name.as_str())?;
        scene.set_attr(data, "type", RIG_TYPE)?;
        scene.set_attr(data, "version", f64::from(self.version))?;
        scene.set_attr(data, "restLength", self.rest_length)?;
        scene.set_attr(data, "compressionFactor", self.params.compression_factor)?;
        scene.set_attr(data, "stretchFactor", self.params.stretch_factor)?;
        scene.set_attr(data, "compressionOffset", self.params.compression_offset)?;
        scene.set_attr(data, "stretchOffset", self.params.stretch_offset)?;

        let back_reference = back_reference_attr(&self.name);
        for (attr, target) in self.references() {
            scene.add_message_attr(data, attr)?;
            scene.add_message_attr(target, &back_reference)?;
            scene.connect(data, attr, target, &back_reference)?;
        }

        log::debug!("metadata van `{}` geschreven naar {:?}", self.name, data);
        Ok(data)
    }

    /// Lees een record terug van een data node.
    pub fn read(scene: &Scene, data: NodeId) -> RigResult<Self> {
        let node_name = scene.name(data).unwrap_or_default().to_owned();
        let found = scene.attr_text(data, "type")?;
        if found != RIG_TYPE {
            return Err(MetadataError::WrongType {
                node: node_name,
                found: found.to_owned(),
            }
            .into());
        }

        let version = scene.attr_number(data, "version")?;
        if !(1.0..=f64::from(RECORD_VERSION)).contains(&version) {
            return Err(MetadataError::UnsupportedVersion {
                found: version,
                supported: RECORD_VERSION,
            }
            .into());
        }

        let reference = |attr: &str| -> Result<NodeId, MetadataError> {
            scene
                .connections_from(data, attr)
                .into_iter()
                .find(|id| scene.exists(*id))
                .ok_or_else(|| MetadataError::MissingReference(attr.to_owned()))
        };
        let optional = |attr: &str| scene.connections_from(data, attr).into_iter().next();

        let nodes = RigNodes {
            origin: reference(ORIGIN_ATTR)?,
            base: reference(BASE_ATTR)?,
            insertion: reference(INSERTION_ATTR)?,
            tip: reference(TIP_ATTR)?,
            driver: reference(DRIVER_ATTR)?,
            offset: reference(OFFSET_ATTR)?,
            output_joint: reference(OUTPUT_ATTR)?,
        };

        Ok(Self {
            version: RECORD_VERSION,
            name: scene.attr_text(data, "name")?.to_owned(),
            rest_length: scene.attr_number(data, "restLength")?,
            params: DeformationParams {
                compression_factor: scene.attr_number(data, "compressionFactor")?,
                stretch_factor: scene.attr_number(data, "stretchFactor")?,
                stretch_offset: scene.attr_vector(data, "stretchOffset")?,
                compression_offset: scene.attr_vector(data, "compressionOffset")?,
            },
            nodes,
            main_point_constraint: constraint_reference(
                scene,
                reference(MAIN_POINT_ATTR)?,
                MAIN_POINT_ATTR,
                "pointConstraint",
            )?,
            main_aim_constraint: constraint_reference(
                scene,
                reference(MAIN_AIM_ATTR)?,
                MAIN_AIM_ATTR,
                "aimConstraint",
            )?,
            origin_anchor: optional(ORIGIN_ANCHOR_ATTR),
            insertion_anchor: optional(INSERTION_ANCHOR_ATTR),
        })
    }
}

/// Een verwijzing naar een hoofdconstraint moet naar een constraint van de juiste soort wijzen.
fn constraint_reference(
    scene: &Scene,
    id: NodeId,
    attr: &str,
    type_name: &str,
) -> Result<NodeId, MetadataError> {
    if scene
        .constraint(id)
        .is_some_and(|constraint| constraint.type_name() == type_name)
    {
        Ok(id)
    } else {
        Err(MetadataError::MissingReference(attr.to_owned()))
    }
}

/// Sla een gecommitte rig op in zijn data node.
pub fn save(scene: &mut Scene, rig: &MuscleRig) -> RigResult<NodeId> {
    rig.ensure_nodes(scene)?;
    let record = RigRecord::from_rig(rig)?;
    let data = record.write(scene)?;
    log::info!("rig `{}` opgeslagen", rig.name());
    Ok(data)
}

/// Bind een rig opnieuw aan de nodes waar een data node naar verwijst.
pub fn load(scene: &Scene, data: NodeId) -> RigResult<MuscleRig> {
    let rig = RigRecord::read(scene, data)?.into_rig();
    rig.ensure_nodes(scene)?;
    Ok(rig)
}

/// Alle data nodes in de scene die een spier-rig beschrijven.
#[must_use]
pub fn list_rigs(scene: &Scene) -> Vec<NodeId> {
    scene
        .ls("*_dataNode")
        .into_iter()
        .filter(|id| scene.attr_text(*id, "type").is_ok_and(|tag| tag == RIG_TYPE))
        .collect()
}

// ── XML-document ────────────────────────────────────────────────────────────

/// XML-vorm van een rig. Nodes staan erin met hun naam, zodat het document na het opnieuw
/// opbouwen van de scene weer gebonden kan worden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "muscleRig")]
pub struct RigDocument {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@version")]
    pub version: u32,
    #[serde(rename = "@restLength")]
    pub rest_length: f64,
    pub deformation: DeformationElement,
    pub nodes: NodesElement,
    pub constraints: ConstraintsElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<AnchorsElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeformationElement {
    #[serde(rename = "@compressionFactor")]
    pub compression_factor: f64,
    #[serde(rename = "@stretchFactor")]
    pub stretch_factor: f64,
    #[serde(rename = "stretchOffset")]
    pub stretch_offset: VectorElement,
    #[serde(rename = "compressionOffset")]
    pub compression_offset: VectorElement,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorElement {
    #[serde(rename = "@x")]
    pub x: f64,
    #[serde(rename = "@y")]
    pub y: f64,
    #[serde(rename = "@z")]
    pub z: f64,
}

impl From<Vec3> for VectorElement {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<VectorElement> for Vec3 {
    fn from(v: VectorElement) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodesElement {
    #[serde(rename = "@origin")]
    pub origin: String,
    #[serde(rename = "@base")]
    pub base: String,
    #[serde(rename = "@insertion")]
    pub insertion: String,
    #[serde(rename = "@tip")]
    pub tip: String,
    #[serde(rename = "@driver")]
    pub driver: String,
    #[serde(rename = "@offset")]
    pub offset: String,
    #[serde(rename = "@outputJoint")]
    pub output_joint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintsElement {
    #[serde(rename = "@mainPoint")]
    pub main_point: String,
    #[serde(rename = "@mainAim")]
    pub main_aim: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorsElement {
    #[serde(default, rename = "@origin", skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, rename = "@insertion", skip_serializing_if = "Option::is_none")]
    pub insertion: Option<String>,
}

impl RigDocument {
    /// Bouw het document voor een gecommitte rig.
    pub fn from_rig(scene: &Scene, rig: &MuscleRig) -> RigResult<Self> {
        rig.ensure_nodes(scene)?;
        let record = RigRecord::from_rig(rig)?;
        let name_of = |id: NodeId, role: &str| -> Result<String, MetadataError> {
            scene
                .name(id)
                .map(str::to_owned)
                .ok_or_else(|| MetadataError::MissingReference(role.to_owned()))
        };

        let anchors = match (record.origin_anchor, record.insertion_anchor) {
            (None, None) => None,
            (origin, insertion) => Some(AnchorsElement {
                origin: origin.map(|id| name_of(id, ORIGIN_ANCHOR_ATTR)).transpose()?,
                insertion: insertion
                    .map(|id| name_of(id, INSERTION_ANCHOR_ATTR))
                    .transpose()?,
            }),
        };

        Ok(Self {
            name: record.name.clone(),
            version: record.version,
            rest_length: record.rest_length,
            deformation: DeformationElement {
                compression_factor: record.params.compression_factor,
                stretch_factor: record.params.stretch_factor,
                stretch_offset: record.params.stretch_offset.into(),
                compression_offset: record.params.compression_offset.into(),
            },
            nodes: NodesElement {
                origin: name_of(record.nodes.origin, ORIGIN_ATTR)?,
                base: name_of(record.nodes.base, BASE_ATTR)?,
                insertion: name_of(record.nodes.insertion, INSERTION_ATTR)?,
                tip: name_of(record.nodes.tip, TIP_ATTR)?,
                driver: name_of(record.nodes.driver, DRIVER_ATTR)?,
                offset: name_of(record.nodes.offset, OFFSET_ATTR)?,
                output_joint: name_of(record.nodes.output_joint, OUTPUT_ATTR)?,
            },
            constraints: ConstraintsElement {
                main_point: name_of(record.main_point_constraint, MAIN_POINT_ATTR)?,
                main_aim: name_of(record.main_aim_constraint, MAIN_AIM_ATTR)?,
            },
            anchors,
        })
    }

    /// Zoek alle genoemde nodes op in de scene en bouw het record.
    pub fn resolve(&self, scene: &Scene) -> RigResult<RigRecord> {
        if self.version == 0 || self.version > RECORD_VERSION {
            return Err(MetadataError::UnsupportedVersion {
                found: f64::from(self.version),
                supported: RECORD_VERSION,
            }
            .into());
        }

        let find = |name: &str| -> Result<NodeId, MetadataError> {
            scene
                .find(name)
                .ok_or_else(|| MetadataError::UnknownNodeName(name.to_owned()))
        };
        let anchors = self.anchors.as_ref();
        let origin_anchor = anchors
            .and_then(|a| a.origin.as_deref())
            .map(&find)
            .transpose()?;
        let insertion_anchor = anchors
            .and_then(|a| a.insertion.as_deref())
            .map(&find)
            .transpose()?;

        let main_point_constraint = constraint_reference(
            scene,
            find(&self.constraints.main_point)?,
            MAIN_POINT_ATTR,
            "pointConstraint",
        )?;
        let main_aim_constraint = constraint_reference(
            scene,
            find(&self.constraints.main_aim)?,
            MAIN_AIM_ATTR,
            "aimConstraint",
        )?;

        Ok(RigRecord {
            version: self.version,
            name: self.name.clone(),
            rest_length: self.rest_length,
            params: DeformationParams {
                compression_factor: self.deformation.compression_factor,
                stretch_factor: self.deformation.stretch_factor,
                stretch_offset: self.deformation.stretch_offset.into(),
                compression_offset: self.deformation.compression_offset.into(),
            },
            nodes: RigNodes {
                origin: find(&self.nodes.origin)?,
                base: find(&self.nodes.base)?,
                insertion: find(&self.nodes.insertion)?,
                tip: find(&self.nodes.tip)?,
                driver: find(&self.nodes.driver)?,
                offset: find(&self.nodes.offset)?,
                output_joint: find(&self.nodes.output_joint)?,
            },
            main_point_constraint,
            main_aim_constraint,
            origin_anchor,
            insertion_anchor,
        })
    }
}

/// Exporteer een gecommitte rig als XML.
pub fn to_xml(scene: &Scene, rig: &MuscleRig) -> RigResult<String> {
    let document = RigDocument::from_rig(scene, rig)?;
    let xml = to_string(&document).map_err(MetadataError::from)?;
    Ok(xml)
}

/// Lees een XML-document en bind de rig aan de nodes met de genoemde namen.
pub fn from_xml(scene: &Scene, xml: &str) -> RigResult<MuscleRig> {
    let document: RigDocument = from_str(xml).map_err(MetadataError::from)?;
    log::debug!("rigdocument `{}` gelezen", document.name);
    let rig = document.resolve(scene)?.into_rig();
    rig.ensure_nodes(scene)?;
    Ok(rig)
}
