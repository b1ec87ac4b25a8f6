//! Positie- en richtingsconstraints tussen transform-nodes.

use std::collections::BTreeSet;

use crate::geom::{Point3, Transform, Vec3, aim_rotation};

use super::node::{NodeId, NodeKind};
use super::{Scene, SceneError};

/// Referentie voor de up-vector van een aim constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldUp {
    /// De Y-as van de scene.
    Scene,
    /// `vector` geroteerd met de wereldrotatie van `object`.
    ObjectRotation { object: NodeId, vector: Vec3 },
}

/// Parameters van een aim constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimSpec {
    /// Lokale as die naar het target wijst.
    pub aim: Vec3,
    /// Lokale as die zo dicht mogelijk bij de world-up blijft.
    pub up: Vec3,
    pub world_up: WorldUp,
}

impl AimSpec {
    #[must_use]
    pub const fn new(aim: Vec3, up: Vec3, world_up: WorldUp) -> Self {
        Self { aim, up, world_up }
    }
}

impl Default for AimSpec {
    fn default() -> Self {
        Self::new(Vec3::X, Vec3::Y, WorldUp::Scene)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Gewogen gemiddelde van targetposities, plus een offset in de ouderruimte.
    Point {
        targets: Vec<(NodeId, f64)>,
        offset: Vec3,
    },
    Aim { target: NodeId, spec: AimSpec },
}

/// Live relatie die de transform van `driven` bepaalt.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub driven: NodeId,
    pub kind: ConstraintKind,
}

impl Constraint {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self.kind {
            ConstraintKind::Point { .. } => "pointConstraint",
            ConstraintKind::Aim { .. } => "aimConstraint",
        }
    }

    /// Nodes waarvan deze constraint afhangt (targets en up-object).
    #[must_use]
    pub fn inputs(&self) -> Vec<NodeId> {
        match &self.kind {
            ConstraintKind::Point { targets, .. } => targets.iter().map(|(id, _)| *id).collect(),
            ConstraintKind::Aim { target, spec } => {
                let mut inputs = vec![*target];
                if let WorldUp::ObjectRotation { object, .. } = spec.world_up {
                    inputs.push(object);
                }
                inputs
            }
        }
    }

    /// Laat verwijderde targets vallen. Geeft `true` terug als de constraint zelf weg moet.
    pub(super) fn drop_references(&mut self, removed: &BTreeSet<NodeId>) -> bool {
        if removed.contains(&self.driven) {
            return true;
        }
        match &mut self.kind {
            ConstraintKind::Point { targets, .. } => {
                targets.retain(|(id, _)| !removed.contains(id));
                targets.is_empty()
            }
            ConstraintKind::Aim { target, spec } => {
                let up_removed = matches!(
                    spec.world_up,
                    WorldUp::ObjectRotation { object, .. } if removed.contains(&object)
                );
                removed.contains(target) || up_removed
            }
        }
    }
}

impl Scene {
    /// Maak een point constraint en pas hem direct toe.
    ///
    /// Met `maintain_offset` blijft het huidige verschil tot het target bewaard, uitgedrukt in
    /// de ouderruimte van `driven`.
    pub fn point_constraint(
        &mut self,
        targets: &[(NodeId, f64)],
        driven: NodeId,
        maintain_offset: bool,
    ) -> Result<NodeId, SceneError> {
        self.local(driven)?;
        for (target, _) in targets {
            self.local(*target)?;
        }
        let total: f64 = targets.iter().map(|(_, weight)| weight).sum();
        if targets.is_empty() || total.abs() <= f64::EPSILON {
            return Err(SceneError::InvalidConstraint(format!(
                "point constraint op {:?} heeft geen gewogen targets",
                driven.0
            )));
        }

        let offset = if maintain_offset {
            let current = self.local(driven)?.translate;
            current - self.point_target_local(targets, driven)?
        } else {
            Vec3::ZERO
        };

        let constraint = Constraint {
            driven,
            kind: ConstraintKind::Point {
                targets: targets.to_vec(),
                offset,
            },
        };
        self.add_constraint(constraint)
    }

    /// Maak een aim constraint en pas hem direct toe.
    pub fn aim_constraint(
        &mut self,
        target: NodeId,
        driven: NodeId,
        spec: AimSpec,
    ) -> Result<NodeId, SceneError> {
        self.local(driven)?;
        self.local(target)?;
        if let WorldUp::ObjectRotation { object, .. } = spec.world_up {
            self.local(object)?;
        }
        if target == driven {
            return Err(SceneError::InvalidConstraint(format!(
                "node {:?} kan niet op zichzelf richten",
                driven.0
            )));
        }

        self.add_constraint(Constraint {
            driven,
            kind: ConstraintKind::Aim { target, spec },
        })
    }

    /// Eenmalige point constraint: toepassen en weer verwijderen.
    pub fn bake_point(&mut self, targets: &[(NodeId, f64)], driven: NodeId) -> Result<(), SceneError> {
        let id = self.point_constraint(targets, driven, false)?;
        self.delete(id)?;
        Ok(())
    }

    /// Eenmalige aim constraint: oriënteren en weer verwijderen.
    pub fn bake_aim(&mut self, target: NodeId, driven: NodeId, spec: AimSpec) -> Result<(), SceneError> {
        let id = self.aim_constraint(target, driven, spec)?;
        self.delete(id)?;
        Ok(())
    }

    /// Pas één constraint opnieuw toe op de huidige scene.
    pub fn recompute(&mut self, constraint: NodeId) -> Result<(), SceneError> {
        self.apply_constraint(constraint).map(|_| ())
    }

    #[must_use]
    pub fn constraint(&self, id: NodeId) -> Option<&Constraint> {
        match self.nodes.get(&id).map(|node| &node.kind) {
            Some(NodeKind::Constraint(constraint)) => Some(constraint),
            _ => None,
        }
    }

    /// Alle constraints die `driven` aansturen.
    #[must_use]
    pub fn constraints_on(&self, driven: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| matches!(&node.kind, NodeKind::Constraint(c) if c.driven == driven))
            .map(|node| node.id)
            .collect()
    }

    fn add_constraint(&mut self, constraint: Constraint) -> Result<NodeId, SceneError> {
        let driven = constraint.driven;
        let driven_name = self.name(driven).unwrap_or_default().to_owned();
        let name = self.unique_name(&format!("{driven_name}_{}", constraint.type_name()));
        let id = self.create_node(name, NodeKind::Constraint(constraint))?;
        self.attach(id, driven)?;
        self.apply_constraint(id)?;
        Ok(id)
    }

    /// Gewogen targetpositie uitgedrukt in de ouderruimte van `driven`.
    fn point_target_local(&self, targets: &[(NodeId, f64)], driven: NodeId) -> Result<Vec3, SceneError> {
        let mut sum = Vec3::ZERO;
        let mut total = 0.0;
        for (target, weight) in targets {
            sum = sum + self.world_position(*target)?.to_vec3() * *weight;
            total += weight;
        }
        let world = Point3::from(sum / total);
        let parent_inverse = self
            .parent_space(driven)?
            .inverse()
            .ok_or(SceneError::SingularTransform(driven))?;
        Ok(parent_inverse.apply_point(world).to_vec3())
    }

    /// Pas een constraint toe en geef de grootste wijziging terug.
    pub(super) fn apply_constraint(&mut self, id: NodeId) -> Result<f64, SceneError> {
        let constraint = self
            .constraint(id)
            .cloned()
            .ok_or(SceneError::UnknownNode(id))?;
        let driven = constraint.driven;

        match constraint.kind {
            ConstraintKind::Point { targets, offset } => {
                let translate = self.point_target_local(&targets, driven)? + offset;
                let local = self.local_mut(driven)?;
                let delta = (local.translate - translate).max_abs();
                local.translate = translate;
                Ok(delta)
            }
            ConstraintKind::Aim { target, spec } => {
                let direction = self.world_position(target)? - self.world_position(driven)?;
                let world_up = match spec.world_up {
                    WorldUp::Scene => Vec3::Y,
                    WorldUp::ObjectRotation { object, vector } => {
                        self.world_rotation(object)?.apply_vec(vector)
                    }
                };
                // bij een up-vector evenwijdig aan de richting: eigen up-as, daarna Z en X
                let current_up = self.world_rotation(driven)?.apply_vec(spec.up);
                let desired = [world_up, current_up, Vec3::Z, Vec3::X]
                    .into_iter()
                    .find_map(|up| aim_rotation(direction, up, spec.aim, spec.up));
                let Some(desired) = desired else {
                    log::debug!("aim constraint {:?} overgeslagen: ontaarde richting", id);
                    return Ok(0.0);
                };

                let parent = (self.parent_space(driven)? * self.inverse_parent_scale(driven)).rotation();
                let joint_orient = self.local(driven)?.joint_orient;
                let rotate: Transform = joint_orient.transposed_rotation()
                    * parent.transposed_rotation()
                    * desired;
                let local = self.local_mut(driven)?;
                let delta = local.rotate.max_difference(&rotate);
                local.rotate = rotate;
                Ok(delta)
            }
        }
    }
}
