#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;
pub mod panel;
pub mod parse;
pub mod rig;
pub mod scene;

use std::fmt;

use geom::Point3;
use panel::{PanelForm, PanelOutcome, PanelSession};
use rig::LocatorRole;
use rig::joint::{JointSpec, create_joint};
use rig::metadata;
use scene::node::Node;
use serde::Serialize;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

#[derive(Debug, Serialize)]
struct SceneNodeExport {
    id: usize,
    name: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u8>,
    template: bool,
}

#[derive(Debug, Serialize)]
struct SceneExport {
    nodes: Vec<SceneNodeExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<String>,
    editing: bool,
}

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct Engine {
    initialized: bool,
    session: PanelSession,
    form: PanelForm,
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Engine {
        Engine {
            initialized: true,
            session: PanelSession::new(),
            form: PanelForm::default(),
        }
    }

    /// Geeft terug of de engine de minimale initialisatie heeft doorlopen.
    #[wasm_bindgen]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Laad een skelet-document met anchors in de scene. Geeft het aantal gewrichten terug.
    #[wasm_bindgen]
    pub fn load_skeleton(&mut self, xml: &str) -> Result<usize, JsValue> {
        let ids = parse::skeleton_xml::load_into(self.session.scene_mut(), xml).map_err(to_js_error)?;
        debug_log!("skelet geladen: {} gewrichten", ids.len());
        Ok(ids.len())
    }

    /// Voeg een los anchor-gewricht toe op een wereldpositie.
    #[wasm_bindgen]
    pub fn add_anchor(&mut self, name: &str, x: f64, y: f64, z: f64) -> Result<usize, JsValue> {
        let position = finite_point(x, y, z)?;
        let scene = self.session.scene_mut();
        let id = create_joint(scene, JointSpec::new(name)).map_err(to_js_error)?;
        scene.set_world_position(id, position).map_err(to_js_error)?;
        Ok(id.0)
    }

    /// Knop "Create": maak een spier tussen twee anchors.
    #[wasm_bindgen]
    pub fn create_muscle(
        &mut self,
        name: &str,
        origin_anchor: &str,
        insertion_anchor: &str,
        compression_factor: f64,
        stretch_factor: f64,
    ) -> Result<String, JsValue> {
        self.form.muscle_name = name.to_owned();
        self.form.origin_anchor = origin_anchor.to_owned();
        self.form.insertion_anchor = insertion_anchor.to_owned();
        self.form.compression_factor = compression_factor;
        self.form.stretch_factor = stretch_factor;
        let outcome = self.session.create(&self.form).map_err(to_js_error)?;
        Ok(report(outcome))
    }

    /// Knop "Update": commit de edit-sessie van de huidige spier.
    #[wasm_bindgen]
    pub fn update_muscle(&mut self) -> Result<String, JsValue> {
        let outcome = self.session.update().map_err(to_js_error)?;
        Ok(report(outcome))
    }

    /// Knop "ReEdit": open opnieuw een edit-sessie.
    #[wasm_bindgen]
    pub fn edit_muscle(&mut self) -> Result<String, JsValue> {
        let outcome = self.session.re_edit().map_err(to_js_error)?;
        Ok(report(outcome))
    }

    /// Knop "Mirror": spiegel de huidige spier tussen twee nieuwe anchors.
    #[wasm_bindgen]
    pub fn mirror_muscle(
        &mut self,
        origin_anchor: &str,
        insertion_anchor: &str,
        axis: &str,
    ) -> Result<String, JsValue> {
        self.form.mirror_origin_anchor = origin_anchor.to_owned();
        self.form.mirror_insertion_anchor = insertion_anchor.to_owned();
        self.form.mirror_axis = axis.to_owned();
        let outcome = self.session.mirror(&self.form).map_err(to_js_error)?;
        Ok(report(outcome))
    }

    /// Verplaats een locator (`origin`, `insertion` of `center`) van de open edit-sessie.
    #[wasm_bindgen]
    pub fn move_locator(&mut self, role: &str, x: f64, y: f64, z: f64) -> Result<String, JsValue> {
        let role: LocatorRole = role.parse().map_err(to_js_error)?;
        let position = finite_point(x, y, z)?;
        let outcome = self
            .session
            .move_locator(role, position)
            .map_err(to_js_error)?;
        Ok(report(outcome))
    }

    /// Exporteer de huidige (gecommitte) spier als XML.
    #[wasm_bindgen]
    pub fn export_rig(&self) -> Result<String, JsValue> {
        let rig = self
            .session
            .current()
            .ok_or_else(|| js_error("er is nog geen spier aangemaakt"))?;
        metadata::to_xml(self.session.scene(), rig).map_err(to_js_error)
    }

    /// Maak een eerder opgeslagen spier weer de huidige spier.
    #[wasm_bindgen]
    pub fn restore_rig(&mut self, name: &str) -> Result<String, JsValue> {
        let outcome = self.session.restore(name).map_err(to_js_error)?;
        Ok(report(outcome))
    }

    /// Haalt alle scene-nodes op met hun wereldpositie.
    #[wasm_bindgen]
    pub fn get_scene(&self) -> Result<JsValue, JsValue> {
        let export = scene_export(&self.session);
        serde_wasm_bindgen::to_value(&export).map_err(|err| JsError::new(&err.to_string()).into())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn scene_export(session: &PanelSession) -> SceneExport {
    let scene = session.scene();
    let nodes = scene
        .nodes()
        .map(|node: &Node| SceneNodeExport {
            id: node.id.0,
            name: node.name.clone(),
            kind: node.kind.type_name(),
            parent: node.parent.map(|parent| parent.0),
            position: node
                .kind
                .is_transform()
                .then(|| scene.world_position(node.id).ok())
                .flatten()
                .map(Point3::to_array),
            color: node.display.color.map(|color| color.0),
            template: node.display.template,
        })
        .collect();
    let current = session.current();
    SceneExport {
        nodes,
        current: current.map(|rig| rig.name().to_owned()),
        editing: current.is_some_and(rig::MuscleRig::is_editing),
    }
}

fn report(outcome: PanelOutcome) -> String {
    match outcome {
        PanelOutcome::Done(message) => message,
        PanelOutcome::Warning(message) => {
            #[cfg(target_arch = "wasm32")]
            {
                web_sys::console::warn_1(&JsValue::from_str(&message));
            }
            message
        }
    }
}

fn finite_point(x: f64, y: f64, z: f64) -> Result<Point3, JsValue> {
    if x.is_finite() && y.is_finite() && z.is_finite() {
        Ok(Point3::new(x, y, z))
    } else {
        Err(js_error("coördinaten moeten eindige getallen zijn"))
    }
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::{Engine, scene_export};
    use crate::scene::node::NodeKind;

    const ARM: &str = r#"
        <skeleton>
            <joint name="L_UpperArm" x="5" y="10" z="0"/>
            <joint name="L_LowerArm" parent="L_UpperArm" x="9" y="7" z="0"/>
        </skeleton>
    "#;

    #[test]
    fn engine_runs_panel_cycle() {
        let mut engine = Engine::new();
        assert!(engine.is_initialized());
        assert_eq!(engine.load_skeleton(ARM).ok(), Some(2));

        let message = engine
            .create_muscle("Bicep_Left", "L_UpperArm", "L_LowerArm", 0.5, 1.5)
            .unwrap_or_else(|_| panic!("create_muscle faalde"));
        assert!(message.contains("Bicep_Left"));
        assert!(engine.export_rig().is_err(), "export tijdens edit-sessie");

        engine
            .update_muscle()
            .unwrap_or_else(|_| panic!("update_muscle faalde"));
        let xml = engine
            .export_rig()
            .unwrap_or_else(|_| panic!("export_rig faalde"));
        assert!(xml.contains("Bicep_Left_muscleJoint"));
    }

    #[test]
    fn warnings_are_returned_as_messages() {
        let mut engine = Engine::new();
        let message = engine
            .update_muscle()
            .unwrap_or_else(|_| panic!("waarschuwing verwacht, geen fout"));
        assert!(message.contains("nog geen spier"));
        assert!(engine.move_locator("elbow", 0.0, 0.0, 0.0).is_err());
        assert!(engine.add_anchor("a", f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn scene_export_lists_world_positions() {
        let mut engine = Engine::new();
        engine
            .add_anchor("root", 1.0, 2.0, 3.0)
            .unwrap_or_else(|_| panic!("add_anchor faalde"));
        let export = scene_export(&engine.session);
        assert_eq!(export.nodes.len(), 1);
        assert_eq!(export.nodes[0].kind, NodeKind::joint(1.0).type_name());
        assert_eq!(export.nodes[0].position, Some([1.0, 2.0, 3.0]));
        assert!(export.current.is_none());
    }
}
