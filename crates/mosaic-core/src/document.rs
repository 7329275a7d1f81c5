//! The plain-data form of a canvas, as handed to and from the persistence layer.

use crate::{DocumentError, Edge, Node};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: &str = "2.0.0";

fn default_version() -> String {
    CURRENT_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub settings: WorkspaceSettings,
    #[serde(default)]
    pub updated_at: String,
}

impl Default for WorkspaceDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            settings: WorkspaceSettings::default(),
            updated_at: String::new(),
        }
    }
}

impl WorkspaceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document. Only major version 2 is understood.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let document: WorkspaceDocument = serde_json::from_str(json)?;
        if !document.version.starts_with("2.") {
            return Err(DocumentError::UnsupportedVersion(document.version));
        }
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Stamp `updated_at` with the current time (RFC 3339).
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Per-canvas settings stored alongside the nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceSettings {
    #[serde(alias = "grid_size")]
    pub grid_size: u32,
    #[serde(alias = "snap_to_grid")]
    pub snap_to_grid: bool,
    #[serde(alias = "show_minimap")]
    pub show_minimap: bool,
    #[serde(alias = "auto_save")]
    pub auto_save: bool,
    #[serde(alias = "auto_save_interval")]
    pub auto_save_interval: u32,
    pub theme: String,
    #[serde(alias = "default_node_color")]
    pub default_node_color: String,
    #[serde(alias = "default_edge_color")]
    pub default_edge_color: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            grid_size: 20,
            snap_to_grid: true,
            show_minimap: true,
            auto_save: true,
            auto_save_interval: 1000,
            theme: "dark".to_string(),
            default_node_color: "#1e1e1e".to_string(),
            default_edge_color: "#555555".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, Vec2};

    #[test]
    fn test_empty_object_uses_defaults() {
        let doc = WorkspaceDocument::from_json("{}").unwrap();
        assert_eq!(doc.version, CURRENT_VERSION);
        assert!(doc.nodes.is_empty());
        assert_eq!(doc.settings.grid_size, 20);
        assert!(doc.settings.snap_to_grid);
        assert_eq!(doc.viewport.zoom, 1.0);
    }

    #[test]
    fn test_rejects_old_major_version() {
        let err = WorkspaceDocument::from_json(r#"{"version":"1.0.0"}"#).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion(v) if v == "1.0.0"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            WorkspaceDocument::from_json("{nodes"),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn test_round_trip_preserves_graph() {
        let mut doc = WorkspaceDocument::new();
        doc.nodes.push(Node::new(NodeId::from("a"), "note", Vec2::new(10.0, 20.0)));
        doc.nodes.push(
            Node::new(NodeId::from("b"), "text", Vec2::new(5.0, 5.0)).with_parent(NodeId::from("a")),
        );
        doc.touch();

        let parsed = WorkspaceDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(parsed, doc);
        assert!(!parsed.updated_at.is_empty());
    }

    #[test]
    fn test_settings_accept_snake_case() {
        let doc =
            WorkspaceDocument::from_json(r#"{"settings":{"grid_size":16,"snap_to_grid":false}}"#)
                .unwrap();
        assert_eq!(doc.settings.grid_size, 16);
        assert!(!doc.settings.snap_to_grid);
        assert_eq!(doc.settings.theme, "dark");
    }
}
