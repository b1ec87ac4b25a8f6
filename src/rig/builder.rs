//! Opbouw van de gewrichtsketen en de constraint-topologie van één spier.

use crate::geom::Vec3;
use crate::scene::node::NodeId;
use crate::scene::{AimSpec, Scene, WorldUp};

use super::curve::{self, PRIMARY_AXIS};
use super::joint::{JointSpec, create_joint};
use super::{DeformationParams, MuscleRig, RigNodes, RigResult, RigState};

pub(crate) const ORIGIN_SUFFIX: &str = "muscleOrigin";
pub(crate) const BASE_SUFFIX: &str = "muscleBase";
pub(crate) const INSERTION_SUFFIX: &str = "muscleInsertion";
pub(crate) const TIP_SUFFIX: &str = "muscleTip";
pub(crate) const DRIVER_SUFFIX: &str = "muscleDriver";
pub(crate) const OFFSET_SUFFIX: &str = "muscleOffset";
pub(crate) const OUTPUT_SUFFIX: &str = "muscleJoint";

/// Scenenaam van een rig-onderdeel, bv. `Bicep_muscleBase`.
#[must_use]
pub fn node_name(rig: &str, suffix: &str) -> String {
    format!("{rig}_{suffix}")
}

/// Aim langs de lengte-as met Y omhoog, ten opzichte van de scene.
pub(crate) fn scene_aim() -> AimSpec {
    AimSpec::new(PRIMARY_AXIS.unit(), Vec3::Y, WorldUp::Scene)
}

impl MuscleRig {
    /// Bouw een rig van `length` lang langs +X vanuit de wereldoorsprong.
    ///
    /// De rig staat daarna in de toestand [`RigState::Committed`] en de deformatiecurves zijn
    /// geschreven.
    pub fn build(
        scene: &mut Scene,
        name: &str,
        length: f64,
        params: DeformationParams,
    ) -> RigResult<Self> {
        params.validate(length)?;
        log::debug!("bouw rig `{name}` met lengte {length}");

        let origin = create_joint(scene, JointSpec::new(node_name(name, ORIGIN_SUFFIX)))?;
        let insertion = create_joint(scene, JointSpec::new(node_name(name, INSERTION_SUFFIX)))?;
        scene.set_translate(insertion, PRIMARY_AXIS.unit() * length)?;
        scene.bake_aim(insertion, origin, scene_aim())?;

        let base = create_joint(
            scene,
            JointSpec::new(node_name(name, BASE_SUFFIX)).radius(0.5),
        )?;
        scene.point_constraint(&[(origin, 1.0)], base, false)?;
        let main_aim_constraint = scene.aim_constraint(insertion, base, base_aim(origin))?;

        let tip = create_joint(scene, JointSpec::new(node_name(name, TIP_SUFFIX)).parent(base))?;
        scene.point_constraint(&[(insertion, 1.0)], tip, false)?;

        let driver = create_joint(
            scene,
            JointSpec::new(node_name(name, DRIVER_SUFFIX))
                .radius(0.5)
                .parent(base),
        )?;
        let main_point_constraint = scene.point_constraint(&[(base, 1.0), (tip, 1.0)], driver, false)?;

        scene.reparent(base, Some(origin))?;

        let offset = create_joint(
            scene,
            JointSpec::new(node_name(name, OFFSET_SUFFIX))
                .radius(0.75)
                .parent(driver),
        )?;
        let output_joint = create_joint(
            scene,
            JointSpec::new(node_name(name, OUTPUT_SUFFIX))
                .parent(offset)
                .segment_scale_compensate(false),
        )?;

        let mut rig = Self {
            name: name.to_owned(),
            rest_length: length,
            params,
            nodes: RigNodes {
                origin,
                base,
                insertion,
                tip,
                driver,
                offset,
                output_joint,
            },
            main_aim_constraint,
            main_point_constraint: Some(main_point_constraint),
            origin_anchor: None,
            insertion_anchor: None,
            state: RigState::Committed,
        };

        scene.evaluate()?;
        rig.rest_length = curve::author(scene, &rig)?;
        scene.evaluate()?;

        log::info!("rig `{name}` gebouwd (rustlengte {})", rig.rest_length);
        Ok(rig)
    }

    /// Bouw een rig tussen twee anchors en open direct een edit-sessie.
    ///
    /// De lengte is de afstand tussen de anchors. `origin`, `insertion` en hun locators hangen
    /// daarna onder hun anchor; de rig wacht in [`RigState::Editing`] op [`MuscleRig::update`].
    pub fn create_from_attach_objects(
        scene: &mut Scene,
        name: &str,
        origin_anchor: NodeId,
        insertion_anchor: NodeId,
        params: DeformationParams,
    ) -> RigResult<Self> {
        let origin_position = scene.world_position(origin_anchor)?;
        let insertion_position = scene.world_position(insertion_anchor)?;
        let length = origin_position.distance_to(insertion_position);

        let mut rig = Self::build(scene, name, length, params)?;
        rig.origin_anchor = Some(origin_anchor);
        rig.insertion_anchor = Some(insertion_anchor);
        rig.edit(scene)?;

        let session = rig.session().copied().ok_or_else(|| super::RigError::NotEditing {
            rig: rig.name.clone(),
        })?;
        scene.match_transform(session.origin_loc, origin_anchor)?;
        scene.match_transform(session.insertion_loc, insertion_anchor)?;
        scene.reparent(rig.nodes.origin, Some(origin_anchor))?;
        scene.reparent(rig.nodes.insertion, Some(insertion_anchor))?;
        scene.evaluate()?;

        log::info!("rig `{name}` tussen anchors aangemaakt, edit-sessie open");
        Ok(rig)
    }
}

/// Aim van `base` naar `insertion`, met de rotatie van `origin` als up-referentie.
pub(crate) fn base_aim(origin: NodeId) -> AimSpec {
    AimSpec::new(
        PRIMARY_AXIS.unit(),
        Vec3::Y,
        WorldUp::ObjectRotation {
            object: origin,
            vector: Vec3::Y,
        },
    )
}
