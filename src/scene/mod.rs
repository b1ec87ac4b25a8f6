//! In-memory scene graph: transforms, constraints, driven keys en message-verbindingen.
//!
//! Nodes leven in een arena met stabiele [`NodeId`]s. Ouders, constraint-targets,
//! curve-drivers en verbindingen verwijzen naar ids, nooit naar namen.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use wildmatch::WildMatch;

pub mod connection;
pub mod constraint;
pub mod driven_key;
pub mod evaluator;
pub mod node;
mod transform;

use connection::{AttrName, Connection};
use node::{AttrValue, Display, Node, NodeId, NodeKind};

pub use constraint::{AimSpec, Constraint, ConstraintKind, WorldUp};
pub use driven_key::{DrivenCurve, Key, Tangent};
pub use evaluator::EvaluationReport;
pub use node::{Channel, DisplayColor, LocalTransform};

/// Scene container met een naamindex voor snelle lookups.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, Node>,
    name_index: HashMap<String, NodeId>,
    connections: Vec<Connection>,
    next_id: usize,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maak een nieuwe node aan met een unieke naam.
    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId, SceneError> {
        let name = name.into();
        if name.trim().is_empty() || self.name_index.contains_key(&name) {
            return Err(SceneError::NameTaken(name));
        }

        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.name_index.insert(name.clone(), id);
        self.nodes.insert(id, Node::new(id, name, kind));
        Ok(id)
    }

    /// Eerste vrije naam in de reeks `base`, `base1`, `base2`, ...
    #[must_use]
    pub fn unique_name(&self, base: &str) -> String {
        if !self.name_index.contains_key(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.name_index.contains_key(candidate))
            .unwrap_or_else(|| base.to_owned())
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.name_index.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.name.as_str())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Alle nodes waarvan de naam overeenkomt met een wildcard-patroon (`*`, `?`).
    #[must_use]
    pub fn ls(&self, pattern: &str) -> Vec<NodeId> {
        let matcher = WildMatch::new(pattern);
        self.nodes
            .values()
            .filter(|node| matcher.matches(&node.name))
            .map(|node| node.id)
            .collect()
    }

    /// Hernoem een node.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        let name = name.into();
        match self.name_index.get(&name) {
            Some(existing) if *existing == id => return Ok(()),
            Some(_) => return Err(SceneError::NameTaken(name)),
            None if name.trim().is_empty() => return Err(SceneError::NameTaken(name)),
            None => {}
        }

        let node = self.get_mut(id)?;
        let old = std::mem::replace(&mut node.name, name.clone());
        self.name_index.remove(&old);
        self.name_index.insert(name, id);
        Ok(())
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Directe kinderen in id-volgorde.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.parent == Some(id))
            .map(|node| node.id)
            .collect()
    }

    /// Alle nakomelingen van een node (exclusief de node zelf).
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut found = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.children(current) {
                if found.insert(child) {
                    stack.push(child);
                }
            }
        }
        found
    }

    /// Verwijder een node en alles wat er van afhangt.
    ///
    /// Nakomelingen verdwijnen mee. Constraints op een verwijderde node worden verwijderd,
    /// verwijderde targets vallen uit andere constraints (een constraint zonder targets
    /// verdwijnt), curves met een verdwenen driver of driven node verdwijnen en verbindingen
    /// naar verwijderde nodes worden losgemaakt. Geeft de verwijderde ids terug.
    pub fn delete(&mut self, id: NodeId) -> Result<Vec<NodeId>, SceneError> {
        if !self.exists(id) {
            return Err(SceneError::UnknownNode(id));
        }

        let mut removed = self.descendants(id);
        removed.insert(id);

        loop {
            let mut extra = BTreeSet::new();
            for node in self.nodes.values_mut() {
                if removed.contains(&node.id) {
                    continue;
                }
                let orphaned = match &mut node.kind {
                    NodeKind::Constraint(constraint) => constraint.drop_references(&removed),
                    NodeKind::DrivenCurve(curve) => {
                        removed.contains(&curve.driver.0) || removed.contains(&curve.driven.0)
                    }
                    _ => false,
                };
                if orphaned {
                    extra.insert(node.id);
                }
            }
            if extra.is_empty() {
                break;
            }
            for extra_id in extra {
                removed.extend(self.descendants(extra_id));
                removed.insert(extra_id);
            }
        }

        for removed_id in &removed {
            if let Some(node) = self.nodes.remove(removed_id) {
                self.name_index.remove(&node.name);
            }
        }
        self.connections
            .retain(|connection| !removed.contains(&connection.from_node) && !removed.contains(&connection.to_node));

        log::debug!("{} node(s) verwijderd vanaf {:?}", removed.len(), id);
        Ok(removed.into_iter().collect())
    }

    #[must_use]
    pub fn display(&self, id: NodeId) -> Option<Display> {
        self.nodes.get(&id).map(|node| node.display)
    }

    pub fn set_display(&mut self, id: NodeId, display: Display) -> Result<(), SceneError> {
        self.get_mut(id)?.display = display;
        Ok(())
    }

    /// Schakel de schaalcompensatie van een gewricht in of uit.
    pub fn set_segment_scale_compensate(
        &mut self,
        id: NodeId,
        enabled: bool,
    ) -> Result<(), SceneError> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Joint {
                segment_scale_compensate,
                ..
            } => {
                *segment_scale_compensate = enabled;
                Ok(())
            }
            _ => Err(SceneError::NotJoint(id)),
        }
    }

    // ── attributen ──────────────────────────────────────────────────────────

    /// Zet (of maak) een eigen attribuut.
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), SceneError> {
        self.get_mut(id)?.attrs.insert(name.to_owned(), value.into());
        Ok(())
    }

    /// Voeg een message-attribuut toe als het nog niet bestaat.
    pub fn add_message_attr(&mut self, id: NodeId, name: &str) -> Result<(), SceneError> {
        self.get_mut(id)?
            .attrs
            .entry(name.to_owned())
            .or_insert(AttrValue::Message);
        Ok(())
    }

    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|node| node.attrs.contains_key(name))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Result<&AttrValue, SceneError> {
        let node = self.get(id)?;
        node.attrs
            .get(name)
            .ok_or_else(|| SceneError::AttrNotFound {
                node: node.name.clone(),
                attr: name.to_owned(),
            })
    }

    pub fn attr_number(&self, id: NodeId, name: &str) -> Result<f64, SceneError> {
        let value = self.attr(id, name)?;
        value
            .as_number()
            .ok_or_else(|| self.type_mismatch(id, name, "number", value))
    }

    pub fn attr_vector(&self, id: NodeId, name: &str) -> Result<crate::geom::Vec3, SceneError> {
        let value = self.attr(id, name)?;
        value
            .as_vector()
            .ok_or_else(|| self.type_mismatch(id, name, "vector", value))
    }

    pub fn attr_text(&self, id: NodeId, name: &str) -> Result<&str, SceneError> {
        let value = self.attr(id, name)?;
        value
            .as_text()
            .ok_or_else(|| self.type_mismatch(id, name, "text", value))
    }

    fn type_mismatch(
        &self,
        id: NodeId,
        attr: &str,
        expected: &'static str,
        found: &AttrValue,
    ) -> SceneError {
        SceneError::AttrTypeMismatch {
            node: self.name(id).unwrap_or_default().to_owned(),
            attr: attr.to_owned(),
            expected,
            found: found.type_name(),
        }
    }

    // ── verbindingen ────────────────────────────────────────────────────────

    /// Verbind `from.from_attr` met `to.to_attr`. Een doel-attribuut heeft hoogstens één bron;
    /// een bestaande inkomende verbinding wordt vervangen.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_attr: &str,
        to: NodeId,
        to_attr: &str,
    ) -> Result<(), SceneError> {
        self.attr(from, from_attr)?;
        self.attr(to, to_attr)?;

        let target = AttrName::from(to_attr);
        self.connections
            .retain(|connection| !(connection.to_node == to && connection.to_attr == target));
        self.connections
            .push(Connection::new(from, from_attr, to, target));
        Ok(())
    }

    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Doel-nodes van de verbindingen vanuit `node.attr`.
    #[must_use]
    pub fn connections_from(&self, node: NodeId, attr: &str) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|connection| connection.from_node == node && connection.from_attr.as_str() == attr)
            .map(|connection| connection.to_node)
            .collect()
    }

    /// Bron-node van de verbinding naar `node.attr`, indien aanwezig.
    #[must_use]
    pub fn incoming(&self, node: NodeId, attr: &str) -> Option<NodeId> {
        self.connections
            .iter()
            .find(|connection| connection.to_node == node && connection.to_attr.as_str() == attr)
            .map(|connection| connection.from_node)
    }

    // ── interne hulpfuncties ────────────────────────────────────────────────

    fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(&id).ok_or(SceneError::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(&id).ok_or(SceneError::UnknownNode(id))
    }

    /// Hang een node zonder transform (constraint) onder een andere node.
    fn attach(&mut self, id: NodeId, parent: NodeId) -> Result<(), SceneError> {
        self.get(parent)?;
        self.get_mut(id)?.parent = Some(parent);
        Ok(())
    }
}

/// Fouten die de scene teruggeeft bij ongeldige operaties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// De naam is leeg of al in gebruik.
    NameTaken(String),
    UnknownNode(NodeId),
    /// De operatie vereist een transform-node.
    NotTransform(NodeId),
    /// De operatie vereist een gewricht.
    NotJoint(NodeId),
    /// De nieuwe ouder ligt onder het kind.
    CyclicParent { child: NodeId, parent: NodeId },
    AttrNotFound { node: String, attr: String },
    AttrTypeMismatch {
        node: String,
        attr: String,
        expected: &'static str,
        found: &'static str,
    },
    /// De constraint heeft geen bruikbare targets.
    InvalidConstraint(String),
    /// De oudertransformatie is niet inverteerbaar.
    SingularTransform(NodeId),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameTaken(name) => write!(f, "naam `{name}` is ongeldig of al in gebruik"),
            Self::UnknownNode(id) => write!(f, "node {:?} niet gevonden in scene", id.0),
            Self::NotTransform(id) => write!(f, "node {:?} heeft geen transform", id.0),
            Self::NotJoint(id) => write!(f, "node {:?} is geen gewricht", id.0),
            Self::CyclicParent { child, parent } => write!(
                f,
                "node {:?} kan niet onder {:?} hangen: cyclische hiërarchie",
                child.0, parent.0
            ),
            Self::AttrNotFound { node, attr } => {
                write!(f, "attribuut `{node}.{attr}` bestaat niet")
            }
            Self::AttrTypeMismatch {
                node,
                attr,
                expected,
                found,
            } => write!(
                f,
                "attribuut `{node}.{attr}` is van type {found}, verwacht {expected}"
            ),
            Self::InvalidConstraint(message) => write!(f, "ongeldige constraint: {message}"),
            Self::SingularTransform(id) => {
                write!(f, "ouderruimte van node {:?} is niet inverteerbaar", id.0)
            }
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Axis;

    #[test]
    fn create_node_rejects_duplicate_names() {
        let mut scene = Scene::new();
        scene.create_node("arm", NodeKind::joint(1.0)).unwrap();
        let err = scene.create_node("arm", NodeKind::Group).unwrap_err();
        assert!(matches!(err, SceneError::NameTaken(name) if name == "arm"));
    }

    #[test]
    fn unique_name_appends_counter() {
        let mut scene = Scene::new();
        assert_eq!(scene.unique_name("c"), "c");
        scene.create_node("c", NodeKind::Group).unwrap();
        scene.create_node("c1", NodeKind::Group).unwrap();
        assert_eq!(scene.unique_name("c"), "c2");
    }

    #[test]
    fn rename_updates_index() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", NodeKind::Group).unwrap();
        scene.create_node("b", NodeKind::Group).unwrap();
        assert!(matches!(scene.rename(a, "b"), Err(SceneError::NameTaken(_))));
        scene.rename(a, "c").unwrap();
        assert_eq!(scene.find("c"), Some(a));
        assert_eq!(scene.find("a"), None);
    }

    #[test]
    fn ls_matches_wildcards() {
        let mut scene = Scene::new();
        let a = scene.create_node("Bicep_dataNode", NodeKind::Network).unwrap();
        scene.create_node("Bicep_muscleBase", NodeKind::joint(0.5)).unwrap();
        let c = scene.create_node("Tricep_dataNode", NodeKind::Network).unwrap();
        assert_eq!(scene.ls("*_dataNode"), vec![a, c]);
        assert_eq!(scene.ls("B?cep_*").len(), 2);
    }

    #[test]
    fn delete_cascades_to_children_constraints_and_curves() {
        let mut scene = Scene::new();
        let root = scene.create_node("root", NodeKind::joint(1.0)).unwrap();
        let child = scene.create_node("child", NodeKind::joint(1.0)).unwrap();
        scene.reparent(child, Some(root)).unwrap();
        let other = scene.create_node("other", NodeKind::joint(1.0)).unwrap();
        let keep = scene.create_node("keep", NodeKind::joint(1.0)).unwrap();

        let single = scene.point_constraint(&[(child, 1.0)], other, false).unwrap();
        let shared = scene
            .point_constraint(&[(child, 1.0), (keep, 1.0)], other, false)
            .unwrap();
        let curve = scene
            .set_driven_key(
                (other, Channel::Scale(Axis::X)),
                (child, Channel::Translate(Axis::X)),
                Tangent::Smooth,
            )
            .unwrap();

        let removed = scene.delete(root).unwrap();
        assert!(removed.contains(&child));
        assert!(removed.contains(&single));
        assert!(removed.contains(&curve));
        assert!(scene.exists(shared));
        assert!(scene.exists(other));
        match scene.constraint(shared).map(|c| &c.kind) {
            Some(ConstraintKind::Point { targets, .. }) => assert_eq!(targets, &vec![(keep, 1.0)]),
            other => panic!("onverwachte constraint: {other:?}"),
        }
    }

    #[test]
    fn connect_replaces_incoming_link() {
        let mut scene = Scene::new();
        let data = scene.create_node("data", NodeKind::Network).unwrap();
        let other = scene.create_node("other", NodeKind::Network).unwrap();
        let joint = scene.create_node("joint", NodeKind::joint(1.0)).unwrap();
        scene.add_message_attr(data, "ref").unwrap();
        scene.add_message_attr(other, "ref").unwrap();
        assert!(matches!(
            scene.connect(data, "ref", joint, "back"),
            Err(SceneError::AttrNotFound { .. })
        ));
        scene.add_message_attr(joint, "back").unwrap();
        scene.connect(data, "ref", joint, "back").unwrap();
        scene.connect(other, "ref", joint, "back").unwrap();
        assert_eq!(scene.incoming(joint, "back"), Some(other));
        assert!(scene.connections_from(data, "ref").is_empty());

        scene.delete(other).unwrap();
        assert!(scene.connections().is_empty());
    }

    #[test]
    fn typed_attr_access_reports_mismatch() {
        let mut scene = Scene::new();
        let data = scene.create_node("data", NodeKind::Network).unwrap();
        scene.set_attr(data, "restLength", 10.0).unwrap();
        scene.set_attr(data, "type", "muscleJointGroup").unwrap();
        assert!((scene.attr_number(data, "restLength").unwrap() - 10.0).abs() < f64::EPSILON);
        assert_eq!(scene.attr_text(data, "type").unwrap(), "muscleJointGroup");
        assert!(matches!(
            scene.attr_number(data, "type"),
            Err(SceneError::AttrTypeMismatch { expected: "number", found: "text", .. })
        ));
        assert!(matches!(
            scene.attr_number(data, "missing"),
            Err(SceneError::AttrNotFound { .. })
        ));
    }
}
