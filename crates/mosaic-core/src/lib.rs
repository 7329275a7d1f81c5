use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub mod document;
pub mod error;
pub mod geometry;
pub mod node_type;

pub use document::{Viewport, WorkspaceDocument, WorkspaceSettings};
pub use error::DocumentError;
pub use geometry::{Rect, Vec2};
pub use node_type::{GROUP_NODE_TYPE, NodeTypeDefaults, NodeTypeTable};

/// Opaque per-type payload. The engine never looks inside it.
pub type NodeData = BTreeMap<String, serde_json::Value>;

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a prefixed id such as `node_1a2b3c4d`.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}_{}", prefix, short_id()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("edge_{}", short_id()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Containment preference consumed by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extent {
    /// Keep the node's visible bounds inside its parent.
    Parent,
}

/// A card on the canvas.
///
/// `position` is relative to the parent's origin when `parent_id` is set,
/// otherwise it is an absolute canvas coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, alias = "parent_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,
    /// Transient UI state, never persisted.
    #[serde(skip)]
    pub selected: bool,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    pub fn new(id: NodeId, node_type: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            position,
            width: None,
            height: None,
            parent_id: None,
            extent: None,
            selected: false,
            data: NodeData::new(),
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn is_group(&self) -> bool {
        NodeTypeTable::is_container(&self.node_type)
    }

    /// Width and height, with missing values taken from the type table.
    pub fn size(&self, table: &NodeTypeTable) -> Vec2 {
        let defaults = table.get(&self.node_type);
        Vec2::new(
            self.width.unwrap_or(defaults.default_width),
            self.height.unwrap_or(defaults.default_height),
        )
    }

    /// Bounding box in the coordinate space of the node's parent.
    pub fn rect(&self, table: &NodeTypeTable) -> Rect {
        Rect::from_pos_size(self.position, self.size(table))
    }
}

fn default_edge_type() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, alias = "source_handle", skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, alias = "target_handle", skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Rendering style (default, straight, step, smoothstep, bezier)
    #[serde(default = "default_edge_type", alias = "edge_type")]
    pub edge_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub data: NodeData,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            source_handle: None,
            target_handle: None,
            edge_type: default_edge_type(),
            label: None,
            animated: false,
            data: NodeData::new(),
        }
    }

    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_prefixed() {
        let id = NodeId::generate("node");
        assert!(id.as_str().starts_with("node_"));
        assert_eq!(id.as_str().len(), "node_".len() + 8);
        assert_ne!(NodeId::generate("node"), id);
        assert!(EdgeId::generate().as_str().starts_with("edge_"));
    }

    #[test]
    fn test_node_serializes_camel_case_without_selection() {
        let mut node = Node::new(NodeId::from("a"), "note", Vec2::new(1.0, 2.0))
            .with_parent(NodeId::from("g"));
        node.selected = true;
        node.extent = Some(Extent::Parent);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "note");
        assert_eq!(value["parentId"], "g");
        assert_eq!(value["extent"], "parent");
        assert!(value.get("selected").is_none());
        assert!(value.get("width").is_none());
    }

    #[test]
    fn test_node_accepts_snake_case_parent() {
        let node: Node = serde_json::from_str(
            r#"{"id":"a","type":"note","position":{"x":0,"y":0},"parent_id":"g","data":{}}"#,
        )
        .unwrap();
        assert_eq!(node.parent_id, Some(NodeId::from("g")));
        assert!(!node.selected);
    }

    #[test]
    fn test_size_falls_back_to_type_defaults() {
        let table = NodeTypeTable::default();
        let mut node = Node::new(NodeId::from("a"), "note", Vec2::ZERO);
        assert_eq!(node.size(&table), Vec2::new(280.0, 200.0));
        node.width = Some(100.0);
        assert_eq!(node.size(&table), Vec2::new(100.0, 200.0));
    }

    #[test]
    fn test_edge_defaults() {
        let edge: Edge =
            serde_json::from_str(r#"{"id":"e","source":"a","target":"b"}"#).unwrap();
        assert_eq!(edge.edge_type, "default");
        assert!(!edge.animated);
        assert!(edge.touches(&NodeId::from("b")));
    }
}
