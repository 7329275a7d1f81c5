pub mod collision;
pub mod controller;
pub mod error;
pub mod graph;
pub mod grouping;
pub mod placement;
pub mod settings;
pub mod snap;
pub mod store;
pub mod transform;

pub use collision::{CollisionOptions, CollisionOutcome, overlap_fraction, resolve_collisions};
pub use controller::CanvasController;
pub use error::{GraphError, SettingsError};
pub use graph::{ChildDisposition, GraphModel, NodePatch};
pub use grouping::{
    group_selected_nodes, set_node_contained, try_group_selected_nodes, try_set_node_contained,
    try_ungroup_node, ungroup_node,
};
pub use placement::{Placement, PlacementFinder, find_non_overlapping_position, snap_to_grid};
pub use settings::{LayoutSettings, PlacementSettings};
pub use snap::{AlignType, Guide, GuideOrientation, calculate_selection_snap_guides, calculate_snap_guides};
pub use store::CanvasStore;
pub use transform::{MAX_PARENT_DEPTH, NodeLookup, absolute_rect, to_absolute, to_relative};
