//! Sessie achter het bedieningspaneel: formuliervelden, de huidige rig en gespiegelde rigs.
//!
//! Ontbrekende invoer levert een [`PanelOutcome::Warning`] op en laat de sessie ongewijzigd.
//! Fouten uit de scene of de rig-opbouw komen als [`RigError`] terug.

use std::ops::RangeInclusive;

use crate::geom::{Axis, Point3};
use crate::rig::metadata::{self, data_node_name};
use crate::rig::{DeformationParams, LocatorRole, MuscleRig, RigError, RigResult};
use crate::scene::Scene;
use crate::scene::node::NodeId;

/// Bereik van de compressie-slider.
pub const COMPRESSION_RANGE: RangeInclusive<f64> = 0.0..=1.0;
/// Bereik van de stretch-slider.
pub const STRETCH_RANGE: RangeInclusive<f64> = 1.0..=3.0;

const NO_RIG_WARNING: &str = "er is nog geen spier aangemaakt, maak eerst een spier";

/// Velden van het paneel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelForm {
    pub muscle_name: String,
    pub origin_anchor: String,
    pub insertion_anchor: String,
    pub compression_factor: f64,
    pub stretch_factor: f64,
    pub mirror_origin_anchor: String,
    pub mirror_insertion_anchor: String,
    pub mirror_axis: String,
}

impl Default for PanelForm {
    fn default() -> Self {
        Self {
            muscle_name: String::new(),
            origin_anchor: String::new(),
            insertion_anchor: String::new(),
            compression_factor: 0.5,
            stretch_factor: 1.5,
            mirror_origin_anchor: String::new(),
            mirror_insertion_anchor: String::new(),
            mirror_axis: "x".to_owned(),
        }
    }
}

impl PanelForm {
    /// Factoren begrensd tot de sliderbereiken.
    #[must_use]
    pub fn params(&self) -> DeformationParams {
        DeformationParams::new(
            clamp(self.compression_factor, &COMPRESSION_RANGE),
            clamp(self.stretch_factor, &STRETCH_RANGE),
        )
    }
}

/// Resultaat van een paneelactie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOutcome {
    Done(String),
    Warning(String),
}

impl PanelOutcome {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Done(message) | Self::Warning(message) => message,
        }
    }

    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

fn warning(message: impl Into<String>) -> PanelOutcome {
    let message = message.into();
    log::warn!("{message}");
    PanelOutcome::Warning(message)
}

/// Scene plus de rig waar het paneel op werkt.
#[derive(Debug, Clone, Default)]
pub struct PanelSession {
    scene: Scene,
    current: Option<MuscleRig>,
    mirrored: Vec<MuscleRig>,
}

impl PanelSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_scene(scene: Scene) -> Self {
        Self {
            scene,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    #[must_use]
    pub const fn current(&self) -> Option<&MuscleRig> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn mirrored(&self) -> &[MuscleRig] {
        &self.mirrored
    }

    /// Maak een nieuwe spier tussen de twee anchors uit het formulier. De spier wordt de huidige
    /// rig en staat daarna in een edit-sessie.
    pub fn create(&mut self, form: &PanelForm) -> RigResult<PanelOutcome> {
        let name = form.muscle_name.trim();
        if name.is_empty() {
            return Ok(warning("geef de spier een naam"));
        }
        let (Some(origin), Some(insertion)) = (
            non_empty(&form.origin_anchor),
            non_empty(&form.insertion_anchor),
        ) else {
            return Ok(warning("vul zowel de origin- als de insertion-anchor in"));
        };

        let origin = resolve_anchor(&self.scene, origin)?;
        let insertion = resolve_anchor(&self.scene, insertion)?;
        let rig = MuscleRig::create_from_attach_objects(
            &mut self.scene,
            name,
            origin,
            insertion,
            form.params(),
        )?;
        let message = format!(
            "spier `{name}` aangemaakt (lengte {:.3}), verplaats de locators en klik Update",
            rig.rest_length()
        );
        self.current = Some(rig);
        Ok(PanelOutcome::Done(message))
    }

    /// Commit de edit-sessie van de huidige rig en sla de metadata op.
    pub fn update(&mut self) -> RigResult<PanelOutcome> {
        let Some(rig) = self.current.as_mut() else {
            return Ok(warning(NO_RIG_WARNING));
        };
        rig.update(&mut self.scene)?;
        metadata::save(&mut self.scene, rig)?;
        Ok(PanelOutcome::Done(format!(
            "spier `{}` bijgewerkt (rustlengte {:.3})",
            rig.name(),
            rig.rest_length()
        )))
    }

    /// Open opnieuw een edit-sessie op de huidige rig.
    pub fn re_edit(&mut self) -> RigResult<PanelOutcome> {
        let Some(rig) = self.current.as_mut() else {
            return Ok(warning(NO_RIG_WARNING));
        };
        rig.edit(&mut self.scene)?;
        Ok(PanelOutcome::Done(format!("spier `{}` in bewerking", rig.name())))
    }

    /// Spiegel de huidige rig tussen de spiegel-anchors uit het formulier.
    ///
    /// De huidige rig blijft de huidige; de nieuwe rig wordt opgeslagen en komt achteraan in
    /// [`Self::mirrored`].
    pub fn mirror(&mut self, form: &PanelForm) -> RigResult<PanelOutcome> {
        let Some(rig) = self.current.as_ref() else {
            return Ok(warning(NO_RIG_WARNING));
        };
        let (Some(origin), Some(insertion)) = (
            non_empty(&form.mirror_origin_anchor),
            non_empty(&form.mirror_insertion_anchor),
        ) else {
            return Ok(warning("vul beide spiegel-anchors in"));
        };

        let axis: Axis = form.mirror_axis.parse()?;
        let origin = resolve_anchor(&self.scene, origin)?;
        let insertion = resolve_anchor(&self.scene, insertion)?;
        let mirrored = rig.mirror(&mut self.scene, origin, insertion, axis)?;
        metadata::save(&mut self.scene, &mirrored)?;
        let message = format!("spier `{}` gespiegeld naar `{}`", rig.name(), mirrored.name());
        self.mirrored.push(mirrored);
        Ok(PanelOutcome::Done(message))
    }

    /// Verplaats een locator van de huidige edit-sessie.
    pub fn move_locator(&mut self, role: LocatorRole, position: Point3) -> RigResult<PanelOutcome> {
        let Some(rig) = self.current.as_mut() else {
            return Ok(warning(NO_RIG_WARNING));
        };
        rig.move_locator(&mut self.scene, role, position)?;
        Ok(PanelOutcome::Done(format!("{role}-locator verplaatst")))
    }

    /// Maak een opgeslagen rig weer de huidige rig.
    pub fn restore(&mut self, name: &str) -> RigResult<PanelOutcome> {
        let Some(data) = self.scene.find(&data_node_name(name.trim())) else {
            return Ok(warning(format!("geen opgeslagen gegevens voor spier `{name}`")));
        };
        let rig = metadata::load(&self.scene, data)?;
        let message = format!("spier `{}` hersteld", rig.name());
        self.current = Some(rig);
        Ok(PanelOutcome::Done(message))
    }
}

/// Zoek een anchor op naam. Bij een onbekende naam wordt de dichtstbijzijnde transform-naam
/// voorgesteld.
pub fn resolve_anchor(scene: &Scene, name: &str) -> RigResult<NodeId> {
    if let Some(id) = scene.find(name) {
        return Ok(id);
    }
    let suggestion = scene
        .nodes()
        .filter(|node| node.kind.is_transform())
        .map(|node| (levenshtein::levenshtein(name, &node.name), &node.name))
        .min()
        .map(|(_, candidate)| candidate.clone());
    Err(RigError::UnknownAnchor {
        name: name.to_owned(),
        suggestion,
    })
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn clamp(value: f64, range: &RangeInclusive<f64>) -> f64 {
    value.max(*range.start()).min(*range.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::joint::{JointSpec, create_joint};
    use crate::geom::Vec3;

    fn arm_session() -> PanelSession {
        let mut scene = Scene::new();
        for (name, position) in [
            ("L_UpperArm", Vec3::new(5.0, 10.0, 0.0)),
            ("L_LowerArm", Vec3::new(9.0, 7.0, 0.0)),
            ("R_UpperArm", Vec3::new(-5.0, 10.0, 0.0)),
            ("R_LowerArm", Vec3::new(-9.0, 7.0, 0.0)),
        ] {
            let id = create_joint(&mut scene, JointSpec::new(name)).unwrap();
            scene.set_translate(id, position).unwrap();
        }
        PanelSession::with_scene(scene)
    }

    fn bicep_form() -> PanelForm {
        PanelForm {
            muscle_name: "Bicep_Left".to_owned(),
            origin_anchor: "L_UpperArm".to_owned(),
            insertion_anchor: "L_LowerArm".to_owned(),
            mirror_origin_anchor: "R_UpperArm".to_owned(),
            mirror_insertion_anchor: "R_LowerArm".to_owned(),
            ..PanelForm::default()
        }
    }

    #[test]
    fn actions_without_rig_only_warn() {
        let mut session = arm_session();
        let before = session.scene().node_count();
        assert!(session.update().unwrap().is_warning());
        assert!(session.re_edit().unwrap().is_warning());
        assert!(session.mirror(&bicep_form()).unwrap().is_warning());
        assert!(
            session
                .move_locator(LocatorRole::Center, Point3::ORIGIN)
                .unwrap()
                .is_warning()
        );
        assert_eq!(session.scene().node_count(), before);
    }

    #[test]
    fn create_requires_name_and_anchors() {
        let mut session = arm_session();
        let before = session.scene().node_count();
        let form = PanelForm {
            muscle_name: "  ".to_owned(),
            ..bicep_form()
        };
        assert!(session.create(&form).unwrap().is_warning());
        let form = PanelForm {
            insertion_anchor: String::new(),
            ..bicep_form()
        };
        assert!(session.create(&form).unwrap().is_warning());
        assert_eq!(session.scene().node_count(), before);
        assert!(session.current().is_none());
    }

    #[test]
    fn unknown_anchor_suggests_closest_name() {
        let mut session = arm_session();
        let form = PanelForm {
            origin_anchor: "L_UperArm".to_owned(),
            ..bicep_form()
        };
        match session.create(&form) {
            Err(RigError::UnknownAnchor { name, suggestion }) => {
                assert_eq!(name, "L_UperArm");
                assert_eq!(suggestion.as_deref(), Some("L_UpperArm"));
            }
            other => panic!("verwacht UnknownAnchor, kreeg {other:?}"),
        }
    }

    #[test]
    fn factors_are_clamped_to_slider_ranges() {
        let form = PanelForm {
            compression_factor: 1.7,
            stretch_factor: 5.0,
            ..PanelForm::default()
        };
        let params = form.params();
        assert!((params.compression_factor - 1.0).abs() < f64::EPSILON);
        assert!((params.stretch_factor - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn create_update_mirror_restore_cycle() {
        let mut session = arm_session();
        let outcome = session.create(&bicep_form()).unwrap();
        assert!(!outcome.is_warning(), "{}", outcome.message());
        assert!(session.current().is_some_and(MuscleRig::is_editing));

        session.update().unwrap();
        assert!(session.scene().find("Bicep_Left_dataNode").is_some());

        session.mirror(&bicep_form()).unwrap();
        assert_eq!(session.current().map(MuscleRig::name), Some("Bicep_Left"));
        assert_eq!(session.mirrored().len(), 1);
        assert_eq!(session.mirrored()[0].name(), "Bicep_Right");
        assert!(session.scene().find("Bicep_Right_dataNode").is_some());

        let outcome = session.restore("Bicep_Right").unwrap();
        assert!(!outcome.is_warning(), "{}", outcome.message());
        assert_eq!(session.current(), Some(&session.mirrored()[0]));

        let outcome = session.restore("Bicep_Left").unwrap();
        assert!(!outcome.is_warning());
        assert!(session.current().is_some_and(|rig| !rig.is_editing()));
        assert!(session.restore("Tricep_Left").unwrap().is_warning());
    }

    #[test]
    fn invalid_mirror_axis_fails_before_mutation() {
        let mut session = arm_session();
        session.create(&bicep_form()).unwrap();
        session.update().unwrap();
        let before = session.scene().node_count();
        let form = PanelForm {
            mirror_axis: "w".to_owned(),
            ..bicep_form()
        };
        assert!(matches!(session.mirror(&form), Err(RigError::InvalidAxis(_))));
        assert_eq!(session.scene().node_count(), before);
    }
}
