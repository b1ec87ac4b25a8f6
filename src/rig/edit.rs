//! Edit-sessies: tijdelijke locators om origin, insertion en driver te verplaatsen.

use std::fmt;
use std::str::FromStr;

use crate::geom::{Point3, Vec3};
use crate::scene::node::{Display, DisplayColor, NodeId, NodeKind};
use crate::scene::{AimSpec, Scene, WorldUp};

use super::builder::{base_aim, node_name, scene_aim};
use super::curve::{self, PRIMARY_AXIS};
use super::{MuscleRig, RigError, RigResult, RigState};

/// Weergaveschaal van de sessie-locators.
pub const LOCATOR_SCALE: f64 = 5.0;

/// Een van de drie sessie-locators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorRole {
    Origin,
    Insertion,
    Center,
}

impl fmt::Display for LocatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Origin => "origin",
            Self::Insertion => "insertion",
            Self::Center => "center",
        };
        f.write_str(name)
    }
}

impl FromStr for LocatorRole {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "origin" => Ok(Self::Origin),
            "insertion" => Ok(Self::Insertion),
            "center" | "centre" => Ok(Self::Center),
            _ => Err(RigError::UnknownLocator(s.to_owned())),
        }
    }
}

/// Nodes die alleen bestaan tussen `edit` en `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSession {
    pub origin_loc: NodeId,
    pub insertion_loc: NodeId,
    pub center_loc: NodeId,
    /// Groep boven `center_loc` die het midden tussen de buitenste locators volgt.
    pub center_group: NodeId,
    /// Tijdelijke constraints `origin_loc → origin`, `insertion_loc → insertion` en
    /// `center_loc → driver`.
    pub bindings: [NodeId; 3],
}

impl EditSession {
    #[must_use]
    pub const fn locator(&self, role: LocatorRole) -> NodeId {
        match role {
            LocatorRole::Origin => self.origin_loc,
            LocatorRole::Insertion => self.insertion_loc,
            LocatorRole::Center => self.center_loc,
        }
    }
}

impl MuscleRig {
    /// Open een edit-sessie.
    ///
    /// Drie gekleurde locators nemen de posities van origin, insertion en driver over en sturen
    /// die gewrichten aan. De live point constraint op `driver` wordt zolang vervangen door een
    /// constraint vanaf de middelste locator.
    pub fn edit(&mut self, scene: &mut Scene) -> RigResult<()> {
        if self.is_editing() {
            return Err(RigError::AlreadyEditing {
                rig: self.name.clone(),
            });
        }
        self.ensure_nodes(scene)?;
        scene.evaluate()?;

        let nodes = self.nodes;
        let origin_loc = create_locator(
            scene,
            &node_name(&self.name, "originLoc"),
            DisplayColor::RED,
            self.origin_anchor,
        )?;
        scene.bake_point(&[(nodes.origin, 1.0)], origin_loc)?;
        let origin_binding = scene.point_constraint(&[(origin_loc, 1.0)], nodes.origin, false)?;

        let insertion_loc = create_locator(
            scene,
            &node_name(&self.name, "insertionLoc"),
            DisplayColor::BLUE,
            self.insertion_anchor,
        )?;
        scene.aim_constraint(insertion_loc, origin_loc, scene_aim())?;
        scene.aim_constraint(
            origin_loc,
            insertion_loc,
            AimSpec::new(-PRIMARY_AXIS.unit(), Vec3::Y, WorldUp::Scene),
        )?;
        scene.bake_point(&[(nodes.insertion, 1.0)], insertion_loc)?;
        let insertion_binding =
            scene.point_constraint(&[(insertion_loc, 1.0)], nodes.insertion, false)?;
        // originLoc moet op de gebakken insertionLoc richten voordat de centergroep eronder hangt
        scene.evaluate()?;

        let center_loc = create_locator(
            scene,
            &node_name(&self.name, "centerLoc"),
            DisplayColor::MAGENTA,
            None,
        )?;
        let center_group = scene.create_node(node_name(&self.name, "centerGrp"), NodeKind::Group)?;
        scene.reparent(center_loc, Some(center_group))?;
        scene.bake_point(&[(nodes.driver, 1.0)], center_group)?;
        scene.reparent(center_group, Some(origin_loc))?;
        scene.point_constraint(&[(origin_loc, 1.0), (insertion_loc, 1.0)], center_group, true)?;

        if let Some(main_point) = self.main_point_constraint.take() {
            if scene.exists(main_point) {
                scene.delete(main_point)?;
            }
        }
        let driver_binding = scene.point_constraint(&[(center_loc, 1.0)], nodes.driver, false)?;

        for id in [nodes.origin, nodes.insertion] {
            let display = scene.display(id).unwrap_or_default();
            scene.set_display(
                id,
                Display {
                    template: true,
                    ..display
                },
            )?;
        }
        scene.evaluate()?;

        self.state = RigState::Editing(EditSession {
            origin_loc,
            insertion_loc,
            center_loc,
            center_group,
            bindings: [origin_binding, insertion_binding, driver_binding],
        });
        log::info!("edit-sessie geopend voor `{}`", self.name);
        Ok(())
    }

    /// Sluit de edit-sessie en bak de nieuwe posities in de rig.
    ///
    /// Locators en tijdelijke constraints verdwijnen, de driver krijgt weer een live point
    /// constraint (met behoud van offset), de aim wordt herberekend en de deformatiecurves
    /// worden opnieuw geschreven voor de nieuwe rustlengte.
    pub fn update(&mut self, scene: &mut Scene) -> RigResult<()> {
        let Some(session) = self.session().copied() else {
            return Err(RigError::NotEditing {
                rig: self.name.clone(),
            });
        };
        self.ensure_nodes(scene)?;
        scene.evaluate()?;

        for id in session
            .bindings
            .into_iter()
            .chain([session.origin_loc, session.insertion_loc, session.center_loc, session.center_group])
        {
            if scene.exists(id) {
                scene.delete(id)?;
            }
        }

        let nodes = self.nodes;
        for id in [nodes.origin, nodes.insertion] {
            scene.set_display(id, Display::default())?;
        }

        self.main_point_constraint =
            Some(scene.point_constraint(&[(nodes.base, 1.0), (nodes.tip, 1.0)], nodes.driver, true)?);

        scene.bake_aim(nodes.insertion, nodes.origin, scene_aim())?;
        if scene.constraint(self.main_aim_constraint).is_some() {
            scene.recompute(self.main_aim_constraint)?;
        } else {
            log::warn!("aim constraint van `{}` ontbrak en is opnieuw aangemaakt", self.name);
            self.main_aim_constraint =
                scene.aim_constraint(nodes.insertion, nodes.base, base_aim(nodes.origin))?;
        }
        scene.evaluate()?;

        let removed = curve::purge_curves(scene, nodes.output_joint)?;
        log::debug!("{removed} oude deformatiecurve(s) verwijderd");
        self.rest_length = curve::author(scene, self)?;
        scene.evaluate()?;

        self.state = RigState::Committed;
        log::info!(
            "rig `{}` bijgewerkt (rustlengte {})",
            self.name,
            self.rest_length
        );
        Ok(())
    }

    /// Verplaats een sessie-locator naar een wereldpositie en evalueer de scene.
    pub fn move_locator(
        &mut self,
        scene: &mut Scene,
        role: LocatorRole,
        position: Point3,
    ) -> RigResult<()> {
        let Some(session) = self.session() else {
            return Err(RigError::NotEditing {
                rig: self.name.clone(),
            });
        };
        let locator = session.locator(role);
        scene.set_world_position(locator, position)?;
        scene.evaluate()?;
        Ok(())
    }
}

fn create_locator(
    scene: &mut Scene,
    name: &str,
    color: DisplayColor,
    parent: Option<NodeId>,
) -> RigResult<NodeId> {
    let id = scene.create_node(name, NodeKind::locator(LOCATOR_SCALE))?;
    scene.set_display(
        id,
        Display {
            template: false,
            color: Some(color),
        },
    )?;
    if let Some(parent) = parent {
        scene.reparent(id, Some(parent))?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Axis, Tolerance};
    use crate::rig::DeformationParams;
    use crate::rig::joint::{JointSpec, create_joint};
    use crate::scene::Channel;

    fn bicep(scene: &mut Scene) -> MuscleRig {
        MuscleRig::build(scene, "Bicep", 10.0, DeformationParams::new(0.5, 1.5)).unwrap()
    }

    #[test]
    fn edit_creates_colored_locators_on_rig_nodes() {
        let mut scene = Scene::new();
        let mut rig = bicep(&mut scene);
        rig.edit(&mut scene).unwrap();
        let session = *rig.session().expect("sessie open");

        let tol = Tolerance::LOOSE;
        let nodes = *rig.nodes();
        for (role, joint) in [
            (LocatorRole::Origin, nodes.origin),
            (LocatorRole::Insertion, nodes.insertion),
            (LocatorRole::Center, nodes.driver),
        ] {
            let loc = session.locator(role);
            assert!(tol.approx_eq_point3(
                scene.world_position(loc).unwrap(),
                scene.world_position(joint).unwrap()
            ));
        }
        assert_eq!(
            scene.display(session.origin_loc).and_then(|d| d.color),
            Some(DisplayColor::RED)
        );
        assert_eq!(
            scene.display(session.insertion_loc).and_then(|d| d.color),
            Some(DisplayColor::BLUE)
        );
        assert_eq!(
            scene.display(session.center_loc).and_then(|d| d.color),
            Some(DisplayColor::MAGENTA)
        );
        assert!(scene.display(nodes.origin).is_some_and(|d| d.template));
        assert!(rig.main_point_constraint().is_none());
        assert_eq!(scene.find("Bicep_originLoc"), Some(session.origin_loc));
        assert_eq!(scene.parent(session.center_group), Some(session.origin_loc));
    }

    #[test]
    fn edit_and_update_must_alternate() {
        let mut scene = Scene::new();
        let mut rig = bicep(&mut scene);
        assert!(matches!(rig.update(&mut scene), Err(RigError::NotEditing { .. })));
        rig.edit(&mut scene).unwrap();
        assert!(matches!(rig.edit(&mut scene), Err(RigError::AlreadyEditing { .. })));
        rig.update(&mut scene).unwrap();
        assert!(matches!(rig.state(), RigState::Committed));
        assert!(matches!(
            rig.move_locator(&mut scene, LocatorRole::Origin, Point3::ORIGIN),
            Err(RigError::NotEditing { .. })
        ));
    }

    #[test]
    fn update_removes_session_nodes() {
        let mut scene = Scene::new();
        let mut rig = bicep(&mut scene);
        let before = scene.node_count();
        rig.edit(&mut scene).unwrap();
        rig.update(&mut scene).unwrap();

        for name in ["Bicep_originLoc", "Bicep_insertionLoc", "Bicep_centerLoc", "Bicep_centerGrp"] {
            assert_eq!(scene.find(name), None, "{name} moet weg zijn");
        }
        assert_eq!(scene.node_count(), before);
        assert!(!scene.display(rig.nodes().origin).is_some_and(|d| d.template));
        assert!(rig.main_point_constraint().is_some_and(|id| scene.exists(id)));
    }

    #[test]
    fn moving_insertion_changes_rest_length() {
        let mut scene = Scene::new();
        let mut rig = bicep(&mut scene);
        rig.edit(&mut scene).unwrap();
        rig.move_locator(&mut scene, LocatorRole::Insertion, Point3::new(14.0, 0.0, 0.0))
            .unwrap();
        rig.update(&mut scene).unwrap();

        assert!((rig.rest_length() - 14.0).abs() < 1e-6);
        let output = rig.nodes().output_joint;
        let stretch = scene.sample_driven(output, Channel::Scale(Axis::X), 21.0).unwrap();
        assert!((stretch - 1.5).abs() < 1e-9);
        let p = scene.world_position(rig.nodes().driver).unwrap();
        assert!(Tolerance::LOOSE.approx_eq_point3(p, Point3::new(7.0, 0.0, 0.0)));
    }

    #[test]
    fn reopening_keeps_off_axis_driver_in_place() {
        let mut scene = Scene::new();
        let upper = create_joint(&mut scene, JointSpec::new("upper")).unwrap();
        scene.set_world_position(upper, Point3::new(5.0, 10.0, 0.0)).unwrap();
        let lower = create_joint(&mut scene, JointSpec::new("lower")).unwrap();
        scene.set_world_position(lower, Point3::new(9.0, 7.0, 1.0)).unwrap();

        let mut rig = MuscleRig::create_from_attach_objects(
            &mut scene,
            "Bicep",
            upper,
            lower,
            DeformationParams::new(0.5, 1.5),
        )
        .unwrap();
        let center = Point3::new(7.0, 9.5, 1.5);
        rig.move_locator(&mut scene, LocatorRole::Center, center).unwrap();
        rig.update(&mut scene).unwrap();

        let tol = Tolerance::LOOSE;
        let driver = rig.nodes().driver;
        assert!(tol.approx_eq_point3(scene.world_position(driver).unwrap(), center));

        for cycle in 0..3 {
            rig.edit(&mut scene).unwrap();
            let session = *rig.session().expect("sessie open");
            let loc = scene.world_position(session.center_loc).unwrap();
            assert!(tol.approx_eq_point3(loc, center), "ronde {cycle}: centerLoc op {loc:?}");
            let p = scene.world_position(driver).unwrap();
            assert!(tol.approx_eq_point3(p, center), "ronde {cycle}: driver tijdens edit op {p:?}");

            rig.update(&mut scene).unwrap();
            let p = scene.world_position(driver).unwrap();
            assert!(tol.approx_eq_point3(p, center), "ronde {cycle}: driver na update op {p:?}");
        }
    }

    #[test]
    fn parses_locator_roles() {
        assert_eq!("Origin".parse::<LocatorRole>().unwrap(), LocatorRole::Origin);
        assert_eq!("center".parse::<LocatorRole>().unwrap(), LocatorRole::Center);
        assert!(matches!(
            "elbow".parse::<LocatorRole>(),
            Err(RigError::UnknownLocator(_))
        ));
    }

    #[test]
    fn missing_node_is_reported() {
        let mut scene = Scene::new();
        let mut rig = bicep(&mut scene);
        scene.delete(rig.nodes().offset).unwrap();
        assert!(matches!(
            rig.edit(&mut scene),
            Err(RigError::MissingNode { role: "offset", .. })
        ));
    }
}
