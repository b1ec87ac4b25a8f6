//! Aanmaken van losse gewrichten.

use crate::scene::node::{AttrValue, NodeId, NodeKind};
use crate::scene::{Scene, SceneError};

/// Beschrijving van een nieuw gewricht.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    name: String,
    parent: Option<NodeId>,
    radius: f64,
    segment_scale_compensate: bool,
    attrs: Vec<(String, AttrValue)>,
}

impl JointSpec {
    /// Gewricht met radius 1 aan de wortel van de scene.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            radius: 1.0,
            segment_scale_compensate: true,
            attrs: Vec::new(),
        }
    }

    /// Hang het gewricht onder `parent`, op de positie van de ouder.
    #[must_use]
    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn segment_scale_compensate(mut self, enabled: bool) -> Self {
        self.segment_scale_compensate = enabled;
        self
    }

    /// Extra attribuut dat na het aanmaken gezet wordt.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }
}

/// Maak een gewricht aan.
///
/// Met een ouder worden translatie, rotatie en joint orient op nul gezet, zodat het gewricht
/// precies op de ouder staat. Zonder ouder staat het in de wereldoorsprong.
pub fn create_joint(scene: &mut Scene, spec: JointSpec) -> Result<NodeId, SceneError> {
    let JointSpec {
        name,
        parent,
        radius,
        segment_scale_compensate,
        attrs,
    } = spec;

    let id = scene.create_node(
        name,
        NodeKind::Joint {
            radius,
            segment_scale_compensate,
        },
    )?;
    for (attr, value) in attrs {
        scene.set_attr(id, &attr, value)?;
    }

    if let Some(parent) = parent {
        scene.reparent(id, Some(parent))?;
        let mut local = *scene.local(id)?;
        local.zero_placement();
        scene.set_local(id, local)?;
    }

    log::debug!("gewricht {:?} aangemaakt onder {:?}", scene.name(id), parent);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point3, Tolerance, Vec3};

    #[test]
    fn joint_without_parent_sits_at_origin() {
        let mut scene = Scene::new();
        let id = create_joint(&mut scene, JointSpec::new("root").radius(0.5)).unwrap();
        let node = scene.node(id).unwrap();
        assert_eq!(node.radius(), Some(0.5));
        assert_eq!(node.parent, None);
        assert_eq!(scene.world_position(id).unwrap(), Point3::ORIGIN);
    }

    #[test]
    fn joint_with_parent_inherits_parent_position() {
        let mut scene = Scene::new();
        let parent = create_joint(&mut scene, JointSpec::new("parent")).unwrap();
        scene.set_translate(parent, Vec3::new(3.0, 4.0, 5.0)).unwrap();

        let child = create_joint(
            &mut scene,
            JointSpec::new("child")
                .parent(parent)
                .segment_scale_compensate(false)
                .attr("side", "Left"),
        )
        .unwrap();

        let local = scene.local(child).unwrap();
        assert_eq!(local.translate, Vec3::ZERO);
        let p = scene.world_position(child).unwrap();
        assert!(Tolerance::DEFAULT.approx_eq_point3(p, Point3::new(3.0, 4.0, 5.0)));
        assert_eq!(scene.attr_text(child, "side").unwrap(), "Left");
        assert!(matches!(
            scene.node(child).unwrap().kind,
            NodeKind::Joint {
                segment_scale_compensate: false,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_joint_name_propagates() {
        let mut scene = Scene::new();
        create_joint(&mut scene, JointSpec::new("a")).unwrap();
        assert!(matches!(
            create_joint(&mut scene, JointSpec::new("a")),
            Err(SceneError::NameTaken(_))
        ));
    }
}
