//! Evaluatie van constraints en driven keys tot de scene stabiel is.

use super::node::{NodeId, NodeKind};
use super::{Scene, SceneError};
use crate::geom::Tolerance;

/// Maximaal aantal relaxatierondes per evaluatie.
pub const MAX_PASSES: usize = 32;

/// Resultaat van een evaluatie-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationReport {
    /// Aantal uitgevoerde rondes.
    pub passes: usize,
    /// `false` als [`MAX_PASSES`] bereikt werd zonder stabiel te worden.
    pub converged: bool,
}

impl Scene {
    /// Pas alle constraints (in id-volgorde) en daarna alle driven curves toe, herhaald tot er
    /// niets meer verandert.
    pub fn evaluate(&mut self) -> Result<EvaluationReport, SceneError> {
        let (constraints, curves) = self.evaluation_order();

        for pass in 1..=MAX_PASSES {
            let mut change = 0.0_f64;
            for id in &constraints {
                change = change.max(self.apply_constraint(*id)?);
            }
            for id in &curves {
                change = change.max(self.apply_curve(*id)?);
            }
            if change <= Tolerance::DEFAULT.eps {
                return Ok(EvaluationReport {
                    passes: pass,
                    converged: true,
                });
            }
        }

        log::warn!("scene-evaluatie niet stabiel na {MAX_PASSES} rondes");
        Ok(EvaluationReport {
            passes: MAX_PASSES,
            converged: false,
        })
    }

    fn evaluation_order(&self) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut constraints = Vec::new();
        let mut curves = Vec::new();
        for node in self.nodes.values() {
            match node.kind {
                NodeKind::Constraint(_) => constraints.push(node.id),
                NodeKind::DrivenCurve(_) => curves.push(node.id),
                _ => {}
            }
        }
        (constraints, curves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Axis, Point3, Vec3};
    use crate::scene::{AimSpec, Channel, Tangent};

    #[test]
    fn chained_constraints_settle() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", NodeKind::joint(1.0)).unwrap();
        let b = scene.create_node("b", NodeKind::joint(1.0)).unwrap();
        let c = scene.create_node("c", NodeKind::joint(1.0)).unwrap();
        // c volgt b, b volgt a; in id-volgorde staat de constraint op c eerst
        scene.point_constraint(&[(b, 1.0)], c, false).unwrap();
        scene.point_constraint(&[(a, 1.0)], b, false).unwrap();

        scene.set_translate(a, Vec3::new(3.0, 0.0, 0.0)).unwrap();
        let report = scene.evaluate().unwrap();
        assert!(report.converged);
        assert!(report.passes >= 2);
        let p = scene.world_position(c).unwrap();
        assert!(Tolerance::DEFAULT.approx_eq_point3(p, Point3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn curves_follow_constraints() {
        let mut scene = Scene::new();
        let base = scene.create_node("base", NodeKind::joint(1.0)).unwrap();
        let target = scene.create_node("target", NodeKind::joint(1.0)).unwrap();
        let tip = scene.create_node("tip", NodeKind::joint(1.0)).unwrap();
        let out = scene.create_node("out", NodeKind::joint(1.0)).unwrap();
        scene.reparent(tip, Some(base)).unwrap();
        scene.set_translate(target, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        scene.aim_constraint(target, base, AimSpec::default()).unwrap();
        scene.point_constraint(&[(target, 1.0)], tip, false).unwrap();

        let driver = (tip, Channel::Translate(Axis::X));
        let driven = (out, Channel::Scale(Axis::X));
        scene.set_driven_key(driven, driver, Tangent::Linear).unwrap();
        scene.set_channel(tip, driver.1, 20.0).unwrap();
        scene.set_channel(out, driven.1, 2.0).unwrap();
        scene.set_driven_key(driven, driver, Tangent::Linear).unwrap();

        scene.set_translate(target, Vec3::new(15.0, 0.0, 0.0)).unwrap();
        assert!(scene.evaluate().unwrap().converged);
        let scale = scene.channel(out, driven.1).unwrap();
        assert!((scale - 1.5).abs() < 1e-9);
    }

    #[test]
    fn empty_scene_converges_immediately() {
        let mut scene = Scene::new();
        let report = scene.evaluate().unwrap();
        assert_eq!(report, EvaluationReport { passes: 1, converged: true });
    }
}
