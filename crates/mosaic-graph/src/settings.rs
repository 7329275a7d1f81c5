use crate::collision::CollisionOptions;
use crate::error::SettingsError;
use crate::graph::ChildDisposition;
use crate::placement::PlacementFinder;
use mosaic_core::{NodeTypeDefaults, NodeTypeTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Tuning for the layout engine, shared by every canvas of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub collision: CollisionOptions,
    pub placement: PlacementSettings,
    /// Max distance (canvas units) at which a guide is shown.
    pub snap_threshold: f64,
    /// Space between a new group's border and its children.
    pub group_padding: f64,
    /// Mark children of newly created groups `extent: "parent"`.
    pub contain_grouped_nodes: bool,
    pub child_disposition: ChildDisposition,
    pub resolve_on_drag_stop: bool,
    /// Per-type size overrides merged over the built-in table.
    pub node_types: BTreeMap<String, NodeTypeDefaults>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    pub step: f64,
    pub max_rings: usize,
    pub margin: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            collision: CollisionOptions::default(),
            placement: PlacementSettings::default(),
            snap_threshold: 8.0,
            group_padding: 20.0,
            contain_grouped_nodes: false,
            child_disposition: ChildDisposition::default(),
            resolve_on_drag_stop: true,
            node_types: BTreeMap::new(),
        }
    }
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            step: PlacementFinder::DEFAULT_STEP,
            max_rings: PlacementFinder::DEFAULT_MAX_RINGS,
            margin: 20.0,
        }
    }
}

impl PlacementSettings {
    pub fn finder(&self) -> PlacementFinder {
        PlacementFinder::new(self.step, self.max_rings)
    }
}

impl LayoutSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mosaic").join("layout.json"))
    }

    /// Load from the user config directory, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            tracing::info!("No config directory, using default layout settings");
            return Self::default();
        };
        if !path.exists() {
            tracing::info!("Layout settings not found at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => {
                tracing::info!("Layout settings loaded from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::error!("Failed to load layout settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Save to the user config directory.
    pub fn save(&self) -> Result<(), SettingsError> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    /// The built-in type table with this file's overrides applied.
    pub fn types(&self) -> NodeTypeTable {
        NodeTypeTable::default().with_overrides(&self.node_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = LayoutSettings::default();
        assert_eq!(settings.snap_threshold, 8.0);
        assert_eq!(settings.group_padding, 20.0);
        assert!(!settings.contain_grouped_nodes);
        assert!(settings.resolve_on_drag_stop);
        assert_eq!(settings.child_disposition, ChildDisposition::Reparent);
        assert_eq!(settings.collision, CollisionOptions::default());
        assert_eq!(settings.placement.finder(), PlacementFinder::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings: LayoutSettings = serde_json::from_str(
            r#"{"snap_threshold": 4, "collision": {"margin": 0}, "child_disposition": "cascade"}"#,
        )
        .unwrap();
        assert_eq!(settings.snap_threshold, 4.0);
        assert_eq!(settings.collision.margin, 0.0);
        assert_eq!(settings.collision.max_iterations, 50);
        assert_eq!(settings.child_disposition, ChildDisposition::Cascade);
        assert_eq!(settings.group_padding, 20.0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("layout.json");
        let mut settings = LayoutSettings::default();
        settings.contain_grouped_nodes = true;
        settings
            .node_types
            .insert("sticky".to_string(), NodeTypeDefaults::new(50.0, 50.0, 150.0, 150.0));

        settings.save_to(&path).unwrap();
        let loaded = LayoutSettings::load_from(&path).unwrap();

        assert_eq!(loaded, settings);
        assert_eq!(loaded.types().get("sticky").default_width, 150.0);
    }

    #[test]
    fn test_load_from_reports_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            LayoutSettings::load_from(&path),
            Err(SettingsError::Json(_))
        ));
        assert!(matches!(
            LayoutSettings::load_from(&dir.path().join("missing.json")),
            Err(SettingsError::Io(_))
        ));
    }
}
