use crate::{NodeData, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// The only node type that acts as a container for other nodes.
pub const GROUP_NODE_TYPE: &str = "group";

/// Sizing defaults and initial payload for one card kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDefaults {
    pub min_width: f64,
    pub min_height: f64,
    pub default_width: f64,
    pub default_height: f64,
    /// Payload merged under caller-supplied data when a node is created.
    #[serde(default)]
    pub data: NodeData,
}

impl NodeTypeDefaults {
    pub fn new(min_width: f64, min_height: f64, default_width: f64, default_height: f64) -> Self {
        Self {
            min_width,
            min_height,
            default_width,
            default_height,
            data: NodeData::new(),
        }
    }

    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }

    pub fn default_size(&self) -> Vec2 {
        Vec2::new(self.default_width, self.default_height)
    }

    pub fn min_size(&self) -> Vec2 {
        Vec2::new(self.min_width, self.min_height)
    }
}

/// Lookup from node `type` to its sizing defaults.
///
/// Unknown types resolve to the fallback entry, so every node has a size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeTable {
    entries: BTreeMap<String, NodeTypeDefaults>,
    fallback: NodeTypeDefaults,
}

fn payload(value: serde_json::Value) -> NodeData {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => NodeData::new(),
    }
}

impl Default for NodeTypeTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            "note".to_string(),
            NodeTypeDefaults::new(200.0, 120.0, 280.0, 200.0)
                .with_data(payload(json!({ "title": "Untitled", "content": "" }))),
        );
        entries.insert(
            "text".to_string(),
            NodeTypeDefaults::new(80.0, 40.0, 200.0, 80.0)
                .with_data(payload(json!({ "text": "" }))),
        );
        entries.insert(
            "image".to_string(),
            NodeTypeDefaults::new(120.0, 90.0, 300.0, 240.0)
                .with_data(payload(json!({ "src": null, "caption": "" }))),
        );
        entries.insert(
            "video".to_string(),
            NodeTypeDefaults::new(240.0, 135.0, 400.0, 260.0)
                .with_data(payload(json!({ "url": "" }))),
        );
        entries.insert(
            "link".to_string(),
            NodeTypeDefaults::new(200.0, 80.0, 280.0, 120.0)
                .with_data(payload(json!({ "url": "", "title": "" }))),
        );
        entries.insert(
            "code".to_string(),
            NodeTypeDefaults::new(240.0, 160.0, 400.0, 300.0)
                .with_data(payload(json!({ "language": "plaintext", "code": "" }))),
        );
        entries.insert(
            "map".to_string(),
            NodeTypeDefaults::new(240.0, 200.0, 400.0, 300.0)
                .with_data(payload(json!({ "lat": 0.0, "lng": 0.0, "zoom": 2 }))),
        );
        entries.insert(
            "entity".to_string(),
            NodeTypeDefaults::new(160.0, 80.0, 240.0, 140.0)
                .with_data(payload(json!({ "name": "", "kind": "person" }))),
        );
        entries.insert(
            "osint".to_string(),
            NodeTypeDefaults::new(180.0, 100.0, 260.0, 160.0)
                .with_data(payload(json!({ "artifact": "", "source": "" }))),
        );
        entries.insert(
            GROUP_NODE_TYPE.to_string(),
            NodeTypeDefaults::new(100.0, 100.0, 400.0, 300.0)
                .with_data(payload(json!({ "label": "Group" }))),
        );

        Self {
            entries,
            fallback: NodeTypeDefaults::new(80.0, 40.0, 200.0, 100.0),
        }
    }
}

impl NodeTypeTable {
    /// Defaults for `node_type`, or the fallback entry.
    pub fn get(&self, node_type: &str) -> &NodeTypeDefaults {
        self.entries.get(node_type).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// Insert or replace the defaults for one type.
    pub fn insert(&mut self, node_type: impl Into<String>, defaults: NodeTypeDefaults) {
        self.entries.insert(node_type.into(), defaults);
    }

    /// Apply overrides on top of the current entries.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, NodeTypeDefaults>) -> Self {
        for (node_type, defaults) in overrides {
            self.entries.insert(node_type.clone(), defaults.clone());
        }
        self
    }

    pub fn is_container(node_type: &str) -> bool {
        node_type == GROUP_NODE_TYPE
    }
}
