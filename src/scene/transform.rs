//! Lokale en wereldtransformaties, herparenting en positionering.

use crate::geom::{Point3, Transform, Vec3};

use super::node::{Channel, LocalTransform, NodeId, NodeKind};
use super::{Scene, SceneError};

impl Scene {
    /// Lokale transformatie van een transform-node.
    pub fn local(&self, id: NodeId) -> Result<&LocalTransform, SceneError> {
        let node = self.get(id)?;
        if node.kind.is_transform() {
            Ok(&node.local)
        } else {
            Err(SceneError::NotTransform(id))
        }
    }

    pub(super) fn local_mut(&mut self, id: NodeId) -> Result<&mut LocalTransform, SceneError> {
        let node = self.get_mut(id)?;
        if node.kind.is_transform() {
            Ok(&mut node.local)
        } else {
            Err(SceneError::NotTransform(id))
        }
    }

    /// Overschrijf de volledige lokale transformatie.
    pub fn set_local(&mut self, id: NodeId, local: LocalTransform) -> Result<(), SceneError> {
        *self.local_mut(id)? = local;
        Ok(())
    }

    pub fn channel(&self, id: NodeId, channel: Channel) -> Result<f64, SceneError> {
        Ok(channel.read(self.local(id)?))
    }

    pub fn set_channel(&mut self, id: NodeId, channel: Channel, value: f64) -> Result<(), SceneError> {
        channel.write(self.local_mut(id)?, value);
        Ok(())
    }

    pub fn set_translate(&mut self, id: NodeId, translate: Vec3) -> Result<(), SceneError> {
        self.local_mut(id)?.translate = translate;
        Ok(())
    }

    /// Wereldmatrix van de ouder (identiteit voor nodes zonder ouder). Hierin leeft `translate`.
    pub fn parent_space(&self, id: NodeId) -> Result<Transform, SceneError> {
        match self.get(id)?.parent {
            Some(parent) => self.world_matrix(parent),
            None => Ok(Transform::identity()),
        }
    }

    /// Inverse ouderschaal voor gewrichten met schaalcompensatie onder een gewricht.
    pub(super) fn inverse_parent_scale(&self, id: NodeId) -> Transform {
        let Some(node) = self.nodes.get(&id) else {
            return Transform::identity();
        };
        let compensates = matches!(
            node.kind,
            NodeKind::Joint {
                segment_scale_compensate: true,
                ..
            }
        );
        let parent = node.parent.and_then(|parent| self.nodes.get(&parent));
        match parent {
            Some(parent) if compensates && parent.kind.is_joint() => {
                let s = parent.local.scale;
                if s.x.abs() > f64::EPSILON && s.y.abs() > f64::EPSILON && s.z.abs() > f64::EPSILON {
                    Transform::scale(Vec3::new(1.0 / s.x, 1.0 / s.y, 1.0 / s.z))
                } else {
                    Transform::identity()
                }
            }
            _ => Transform::identity(),
        }
    }

    /// Lokale matrix `T · IS · JO · R · S`.
    pub fn local_matrix(&self, id: NodeId) -> Result<Transform, SceneError> {
        let local = self.local(id)?;
        Ok(Transform::translate(local.translate) * self.inverse_parent_scale(id) * local.linear())
    }

    /// Wereldmatrix: de lokale matrices van de wortel tot aan de node.
    pub fn world_matrix(&self, id: NodeId) -> Result<Transform, SceneError> {
        let mut chain = vec![id];
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            if chain.contains(&parent) {
                return Err(SceneError::CyclicParent { child: id, parent });
            }
            chain.push(parent);
            current = self.get(parent)?.parent;
        }

        let mut world = Transform::identity();
        for node in chain.into_iter().rev() {
            world = world * self.local_matrix(node)?;
        }
        Ok(world)
    }

    pub fn world_position(&self, id: NodeId) -> Result<Point3, SceneError> {
        Ok(self.world_matrix(id)?.apply_point(Point3::ORIGIN))
    }

    /// Rotatiedeel van de wereldmatrix.
    pub fn world_rotation(&self, id: NodeId) -> Result<Transform, SceneError> {
        Ok(self.world_matrix(id)?.rotation())
    }

    /// Verplaats een node zodat zijn wereldpositie `position` wordt; rotatie en schaal blijven.
    pub fn set_world_position(&mut self, id: NodeId, position: Point3) -> Result<(), SceneError> {
        let parent_inverse = self
            .parent_space(id)?
            .inverse()
            .ok_or(SceneError::SingularTransform(id))?;
        let translate = parent_inverse.apply_point(position).to_vec3();
        self.set_translate(id, translate)
    }

    /// Zet `node` op de wereldpositie en -oriëntatie van `target`.
    pub fn match_transform(&mut self, node: NodeId, target: NodeId) -> Result<(), SceneError> {
        let target_world = self.world_matrix(target)?;
        let scale = self.local(node)?.scale;
        let world = Transform::translate(target_world.translation())
            * target_world.rotation()
            * Transform::scale(scale);
        self.set_world_matrix(node, world)
    }

    /// Hang `child` onder `parent` (of aan de wortel) met behoud van de wereldplaatsing.
    ///
    /// Bij gewrichten komt de wereldrotatie in de joint orient terecht en wordt `rotate` nul.
    pub fn reparent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        let world = self.world_matrix(child)?;
        if let Some(parent) = parent {
            self.local(parent)?;
            if parent == child || self.descendants(child).contains(&parent) {
                return Err(SceneError::CyclicParent { child, parent });
            }
        }

        self.get_mut(child)?.parent = parent;
        self.set_world_matrix(child, world)
    }

    /// Ontbind een wereldmatrix naar de lokale kanalen van een node onder zijn huidige ouder.
    fn set_world_matrix(&mut self, id: NodeId, world: Transform) -> Result<(), SceneError> {
        let parent_inverse = self
            .parent_space(id)?
            .inverse()
            .ok_or(SceneError::SingularTransform(id))?;
        let relative = parent_inverse * world;
        let translate = relative.translation();
        let compensation = self
            .inverse_parent_scale(id)
            .inverse()
            .ok_or(SceneError::SingularTransform(id))?;
        let linear = compensation * Transform::translate(-translate) * relative;

        let scale = linear.scale_factors();
        let rotation = linear.rotation();
        let is_joint = self.get(id)?.kind.is_joint();

        let local = self.local_mut(id)?;
        local.translate = translate;
        local.scale = scale;
        if is_joint {
            local.joint_orient = rotation;
            local.rotate = Transform::identity();
        } else {
            local.joint_orient = Transform::identity();
            local.rotate = rotation;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Axis, Tolerance};

    fn assert_point(actual: Point3, expected: Point3) {
        assert!(
            Tolerance::LOOSE.approx_eq_point3(actual, expected),
            "verwacht {expected:?}, gekregen {actual:?}"
        );
    }

    #[test]
    fn world_position_follows_parent_chain() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", NodeKind::Group).unwrap();
        let b = scene.create_node("b", NodeKind::Group).unwrap();
        scene.set_translate(a, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        scene.reparent(b, Some(a)).unwrap();
        // b stond in de oorsprong en blijft daar
        assert_point(scene.world_position(b).unwrap(), Point3::ORIGIN);
        scene.set_translate(b, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert_point(scene.world_position(b).unwrap(), Point3::new(2.0, 2.0, 3.0));
    }

    #[test]
    fn reparent_joint_moves_rotation_into_orient() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent", NodeKind::Group).unwrap();
        let rotation = crate::geom::aim_rotation(Vec3::Z, Vec3::Y, Vec3::X, Vec3::Y).unwrap();
        scene
            .set_local(
                parent,
                LocalTransform {
                    translate: Vec3::new(0.0, 5.0, 0.0),
                    rotate: rotation,
                    ..LocalTransform::default()
                },
            )
            .unwrap();
        let joint = scene.create_node("joint", NodeKind::joint(1.0)).unwrap();
        scene.set_translate(joint, Vec3::new(2.0, 0.0, 0.0)).unwrap();

        scene.reparent(joint, Some(parent)).unwrap();
        let local = scene.local(joint).unwrap();
        assert!(local.rotate.max_difference(&Transform::identity()) < 1e-12);
        assert!(local.joint_orient.max_difference(&Transform::identity()) > 0.5);
        assert_point(scene.world_position(joint).unwrap(), Point3::new(2.0, 0.0, 0.0));
        let x_axis = scene.world_rotation(joint).unwrap().axis(Axis::X);
        assert!(Tolerance::LOOSE.approx_eq_vec3(x_axis, Vec3::X));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", NodeKind::Group).unwrap();
        let b = scene.create_node("b", NodeKind::Group).unwrap();
        scene.reparent(b, Some(a)).unwrap();
        assert!(matches!(
            scene.reparent(a, Some(b)),
            Err(SceneError::CyclicParent { .. })
        ));
        assert!(matches!(
            scene.reparent(a, Some(a)),
            Err(SceneError::CyclicParent { .. })
        ));
    }

    #[test]
    fn set_world_position_respects_parent_scale() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent", NodeKind::Group).unwrap();
        scene
            .set_local(
                parent,
                LocalTransform {
                    translate: Vec3::new(1.0, 0.0, 0.0),
                    scale: Vec3::new(2.0, 2.0, 2.0),
                    ..LocalTransform::default()
                },
            )
            .unwrap();
        let child = scene.create_node("child", NodeKind::locator(1.0)).unwrap();
        scene.reparent(child, Some(parent)).unwrap();
        scene.set_world_position(child, Point3::new(5.0, 4.0, 0.0)).unwrap();
        assert_point(scene.world_position(child).unwrap(), Point3::new(5.0, 4.0, 0.0));
        assert!(Tolerance::LOOSE.approx_eq_vec3(scene.local(child).unwrap().translate, Vec3::new(2.0, 2.0, 0.0)));
    }

    #[test]
    fn compensated_joint_ignores_parent_scale_for_orientation() {
        let mut scene = Scene::new();
        let parent = scene.create_node("parent", NodeKind::joint(1.0)).unwrap();
        let child = scene.create_node("child", NodeKind::joint(1.0)).unwrap();
        scene.reparent(child, Some(parent)).unwrap();
        scene.set_channel(parent, Channel::Scale(Axis::X), 2.0).unwrap();
        scene.set_translate(child, Vec3::new(1.0, 0.0, 0.0)).unwrap();

        // translatie schaalt mee, de eigen assen niet
        assert_point(scene.world_position(child).unwrap(), Point3::new(2.0, 0.0, 0.0));
        let scale = scene.world_matrix(child).unwrap().scale_factors();
        assert!(Tolerance::LOOSE.approx_eq_vec3(scale, Vec3::ONE));

        scene.set_segment_scale_compensate(child, false).unwrap();
        let scale = scene.world_matrix(child).unwrap().scale_factors();
        assert!(Tolerance::LOOSE.approx_eq_vec3(scale, Vec3::new(2.0, 1.0, 1.0)));
    }

    #[test]
    fn match_transform_copies_position_and_orientation() {
        let mut scene = Scene::new();
        let anchor = scene.create_node("anchor", NodeKind::joint(1.0)).unwrap();
        let rotation = crate::geom::aim_rotation(Vec3::new(0.0, 0.0, -1.0), Vec3::Y, Vec3::X, Vec3::Y).unwrap();
        scene
            .set_local(
                anchor,
                LocalTransform {
                    translate: Vec3::new(4.0, 1.0, -2.0),
                    rotate: rotation,
                    ..LocalTransform::default()
                },
            )
            .unwrap();
        let loc = scene.create_node("loc", NodeKind::locator(5.0)).unwrap();
        scene.match_transform(loc, anchor).unwrap();
        assert_point(scene.world_position(loc).unwrap(), Point3::new(4.0, 1.0, -2.0));
        let diff = scene
            .world_rotation(loc)
            .unwrap()
            .max_difference(&scene.world_rotation(anchor).unwrap());
        assert!(diff < 1e-9);
    }

    #[test]
    fn channels_require_transform_nodes() {
        let mut scene = Scene::new();
        let data = scene.create_node("data", NodeKind::Network).unwrap();
        assert!(matches!(
            scene.set_channel(data, Channel::Translate(Axis::X), 1.0),
            Err(SceneError::NotTransform(_))
        ));
    }
}
