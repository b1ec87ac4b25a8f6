//! Message-verbindingen tussen attributen van nodes.

use super::node::NodeId;

/// Naam van een attribuut op een node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrName(pub String);

impl AttrName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttrName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AttrName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Verbinding van een bron-attribuut naar een doel-attribuut.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub from_node: NodeId,
    pub from_attr: AttrName,
    pub to_node: NodeId,
    pub to_attr: AttrName,
}

impl Connection {
    #[must_use]
    pub fn new<F, T, AF, AT>(from_node: F, from_attr: AF, to_node: T, to_attr: AT) -> Self
    where
        F: Into<NodeId>,
        T: Into<NodeId>,
        AF: Into<AttrName>,
        AT: Into<AttrName>,
    {
        Self {
            from_node: from_node.into(),
            from_attr: from_attr.into(),
            to_node: to_node.into(),
            to_attr: to_attr.into(),
        }
    }

    /// Raakt deze verbinding de gegeven node aan één van beide kanten?
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.from_node == node || self.to_node == node
    }
}

#[cfg(test)]
mod tests {
    use super::{AttrName, Connection, NodeId};

    #[test]
    fn connection_holds_all_fields() {
        let connection = Connection::new(NodeId::new(1), "muscleBase", NodeId::new(2), "Bicep_dataParent");
        assert_eq!(connection.from_node, NodeId::new(1));
        assert_eq!(connection.to_node, NodeId::new(2));
        assert_eq!(connection.from_attr, AttrName("muscleBase".to_owned()));
        assert_eq!(connection.to_attr.as_str(), "Bicep_dataParent");
        assert!(connection.touches(NodeId::new(2)));
        assert!(!connection.touches(NodeId::new(3)));
    }
}
