//! Copy-on-write owner of one canvas.
//!
//! Every mutation works on a private clone of the current graph and swaps the
//! shared snapshot only when something actually changed, so holders of an old
//! [`Arc<GraphModel>`] can tell whether to re-render with [`Arc::ptr_eq`].

use crate::collision::{self, CollisionOutcome};
use crate::graph::{GraphModel, NodePatch};
use crate::grouping;
use crate::placement;
use crate::settings::LayoutSettings;
use crate::snap::{self, Guide};
use mosaic_core::document::CURRENT_VERSION;
use mosaic_core::{
    Edge, EdgeId, Node, NodeData, NodeId, Rect, Vec2, Viewport, WorkspaceDocument,
    WorkspaceSettings,
};
use mosaic_events::{CanvasEvent, EventBus, WorkspaceChangeType};
use std::collections::HashSet;
use std::sync::Arc;

fn change(change_type: WorkspaceChangeType, node_ids: Vec<NodeId>, edge_ids: Vec<EdgeId>) -> CanvasEvent {
    CanvasEvent::WorkspaceChanged {
        change_type,
        node_ids,
        edge_ids,
    }
}

/// Edge ids present in `before` but gone from `after`.
fn removed_edges(before: &GraphModel, after: &GraphModel) -> Vec<EdgeId> {
    before
        .edges()
        .iter()
        .filter(|e| after.edge(&e.id).is_none())
        .map(|e| e.id.clone())
        .collect()
}

pub struct CanvasStore {
    graph: Arc<GraphModel>,
    settings: LayoutSettings,
    document_settings: WorkspaceSettings,
    viewport: Viewport,
    events: Option<EventBus>,
}

impl Default for CanvasStore {
    fn default() -> Self {
        Self::new(LayoutSettings::default())
    }
}

impl CanvasStore {
    pub fn new(settings: LayoutSettings) -> Self {
        let mut graph = GraphModel::with_types(Arc::new(settings.types()));
        graph.set_child_disposition(settings.child_disposition);
        Self {
            graph: Arc::new(graph),
            settings,
            document_settings: WorkspaceSettings::default(),
            viewport: Viewport::default(),
            events: None,
        }
    }

    /// Publish change notifications on `bus` after every effective mutation.
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn events(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    /// The current immutable snapshot.
    pub fn snapshot(&self) -> Arc<GraphModel> {
        Arc::clone(&self.graph)
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn document_settings(&self) -> &WorkspaceSettings {
        &self.document_settings
    }

    pub fn set_document_settings(&mut self, settings: WorkspaceSettings) {
        self.document_settings = settings;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn publish(&self, event: CanvasEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    /// Run `op` on a clone of the graph. The snapshot is replaced and the
    /// collected notifications published only when `op` returns `Some`.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&GraphModel, &mut GraphModel, &mut Vec<CanvasEvent>) -> Option<T>,
    ) -> Option<T> {
        let mut next = GraphModel::clone(&self.graph);
        let mut changes = Vec::new();
        let result = op(&*self.graph, &mut next, &mut changes)?;
        self.graph = Arc::new(next);
        for event in changes {
            self.publish(event);
        }
        Some(result)
    }

    // ------------------------------------------------------------------
    // Persistence boundary
    // ------------------------------------------------------------------

    pub fn load_document(&mut self, document: &WorkspaceDocument) {
        let mut graph = GraphModel::from_document(document, Arc::new(self.settings.types()));
        graph.set_child_disposition(self.settings.child_disposition);
        self.document_settings = document.settings.clone();
        self.viewport = document.viewport;

        let node_ids = graph.nodes().iter().map(|n| n.id.clone()).collect();
        let edge_ids = graph.edges().iter().map(|e| e.id.clone()).collect();
        tracing::debug!(
            "Loaded canvas with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        self.graph = Arc::new(graph);
        self.publish(change(WorkspaceChangeType::Loaded, node_ids, edge_ids));
    }

    pub fn to_document(&self) -> WorkspaceDocument {
        let mut document = WorkspaceDocument {
            version: CURRENT_VERSION.to_string(),
            viewport: self.viewport,
            settings: self.document_settings.clone(),
            ..WorkspaceDocument::default()
        };
        self.graph.write_into(&mut document);
        document.touch();
        document
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub fn create_node(&mut self, node_type: &str, position: Vec2, data: Option<NodeData>) -> Node {
        let node = Arc::make_mut(&mut self.graph).create_node(node_type, position, data);
        self.publish(change(WorkspaceChangeType::NodesAdded, vec![node.id.clone()], Vec::new()));
        node
    }

    /// Create a node where the user dropped it: snapped to the canvas grid
    /// when enabled, then nudged to the nearest free spot among top-level nodes.
    pub fn drop_node(&mut self, node_type: &str, position: Vec2, data: Option<NodeData>) -> Node {
        let desired = if self.document_settings.snap_to_grid {
            placement::snap_to_grid(position, self.document_settings.grid_size as f64)
        } else {
            position
        };
        let size = self.graph.types().get(node_type).default_size();
        let existing: Vec<Rect> = self
            .graph
            .scope(None)
            .map(|n| self.graph.node_rect(n))
            .collect();
        let placement = self.settings.placement.finder().find(
            desired,
            size,
            &existing,
            self.settings.placement.margin,
        );
        if placement.exhausted {
            tracing::debug!("No free spot near drop point, placing {} anyway", node_type);
        }
        self.create_node(node_type, placement.position, data)
    }

    /// Insert a fully built node (paste, import).
    pub fn insert_node(&mut self, node: Node) -> bool {
        let id = node.id.clone();
        self.transact(|_, next, changes| match next.insert_node(node) {
            Ok(()) => {
                changes.push(change(WorkspaceChangeType::NodesAdded, vec![id], Vec::new()));
                Some(())
            }
            Err(err) => {
                tracing::warn!("Ignoring node insert: {}", err);
                None
            }
        })
        .is_some()
    }

    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> bool {
        self.transact(|_, next, changes| {
            next.update_node(id, patch).then(|| {
                changes.push(change(WorkspaceChangeType::NodesUpdated, vec![id.clone()], Vec::new()));
            })
        })
        .is_some()
    }

    /// Delete a node and its edges. Group children follow the configured
    /// [`ChildDisposition`](crate::ChildDisposition). Returns every removed node id.
    pub fn delete_node(&mut self, id: &NodeId) -> Vec<NodeId> {
        self.transact(|before, next, changes| {
            let released: Vec<NodeId> = match next.node(id) {
                Some(node) if node.is_group() => next.children(id).map(|n| n.id.clone()).collect(),
                _ => Vec::new(),
            };
            let removed = match next.try_delete_node(id) {
                Ok(removed) => removed,
                Err(err) => {
                    tracing::debug!("Ignoring delete: {}", err);
                    return None;
                }
            };
            let released: Vec<NodeId> = released.into_iter().filter(|c| next.contains_node(c)).collect();
            if !released.is_empty() {
                changes.push(change(WorkspaceChangeType::NodesUpdated, released, Vec::new()));
            }
            changes.push(change(
                WorkspaceChangeType::NodesDeleted,
                removed.clone(),
                removed_edges(before, next),
            ));
            Some(removed)
        })
        .unwrap_or_default()
    }

    pub fn delete_nodes(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        ids.iter().flat_map(|id| self.delete_node(id)).collect()
    }

    /// Mark exactly `ids` as selected.
    pub fn set_selection(&mut self, ids: &[NodeId]) -> bool {
        self.transact(|before, next, changes| {
            if !next.set_selection(ids) {
                return None;
            }
            let flipped: Vec<NodeId> = before
                .nodes()
                .iter()
                .filter(|n| next.node(&n.id).is_some_and(|m| m.selected != n.selected))
                .map(|n| n.id.clone())
                .collect();
            changes.push(change(WorkspaceChangeType::NodesUpdated, flipped, Vec::new()));
            Some(())
        })
        .is_some()
    }

    pub fn bring_to_front(&mut self, id: &NodeId) -> bool {
        self.transact(|_, next, changes| {
            next.bring_to_front(id).then(|| {
                changes.push(change(WorkspaceChangeType::NodesUpdated, vec![id.clone()], Vec::new()));
            })
        })
        .is_some()
    }

    /// Move several nodes by the same offset, in their own coordinate spaces.
    /// Nodes listed alongside an ancestor ride along with it instead.
    pub fn translate_nodes(&mut self, ids: &[NodeId], delta: Vec2) -> bool {
        if delta == Vec2::ZERO {
            return false;
        }
        let ids = self.graph.outermost_ids(ids);
        self.transact(|_, next, changes| {
            let mut moved = Vec::new();
            for id in &ids {
                let Some(position) = next.node(id).map(|n| n.position) else {
                    continue;
                };
                if next.update_node(id, NodePatch::moved_to(position + delta)) {
                    moved.push(id.clone());
                }
            }
            if moved.is_empty() {
                return None;
            }
            changes.push(change(WorkspaceChangeType::NodesUpdated, moved, Vec::new()));
            Some(())
        })
        .is_some()
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    pub fn create_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        label: Option<String>,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Option<Edge> {
        self.transact(|_, next, changes| {
            let edge = next.create_edge(source, target, label, source_handle, target_handle)?;
            changes.push(change(WorkspaceChangeType::EdgesAdded, Vec::new(), vec![edge.id.clone()]));
            Some(edge)
        })
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> bool {
        self.transact(|_, next, changes| {
            next.delete_edge(id).then(|| {
                changes.push(change(WorkspaceChangeType::EdgesDeleted, Vec::new(), vec![id.clone()]));
            })
        })
        .is_some()
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    pub fn group_selected_nodes(&mut self, ids: &[NodeId]) -> Option<NodeId> {
        let padding = self.settings.group_padding;
        let contain = self.settings.contain_grouped_nodes;
        self.transact(|_, next, changes| {
            let group_id = grouping::group_selected_nodes(next, ids, padding, contain)?;
            let members: Vec<NodeId> = next.children(&group_id).map(|n| n.id.clone()).collect();
            changes.push(change(WorkspaceChangeType::NodesAdded, vec![group_id.clone()], Vec::new()));
            changes.push(change(WorkspaceChangeType::NodesUpdated, members, Vec::new()));
            Some(group_id)
        })
    }

    /// Group whatever is currently selected.
    pub fn group_selection(&mut self) -> Option<NodeId> {
        let selected = self.graph.selected_ids();
        self.group_selected_nodes(&selected)
    }

    pub fn ungroup_node(&mut self, group_id: &NodeId) -> bool {
        self.transact(|before, next, changes| {
            let released = match grouping::try_ungroup_node(next, group_id) {
                Ok(released) => released,
                Err(err) => {
                    tracing::debug!("Ignoring ungroup request: {}", err);
                    return None;
                }
            };
            if !released.is_empty() {
                changes.push(change(WorkspaceChangeType::NodesUpdated, released, Vec::new()));
            }
            changes.push(change(
                WorkspaceChangeType::NodesDeleted,
                vec![group_id.clone()],
                removed_edges(before, next),
            ));
            Some(())
        })
        .is_some()
    }

    pub fn set_node_contained(&mut self, id: &NodeId, contained: bool) -> bool {
        self.transact(|_, next, changes| {
            grouping::set_node_contained(next, id, contained).then(|| {
                changes.push(change(WorkspaceChangeType::NodesUpdated, vec![id.clone()], Vec::new()));
            })
        })
        .is_some()
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Separate overlapping siblings across the whole canvas.
    pub fn resolve_collisions(&mut self) -> CollisionOutcome {
        let options = self.settings.collision;
        let outcome = collision::resolve_collisions(self.graph.nodes(), self.graph.types(), &options);
        self.transact(|_, next, changes| {
            let moved = next.apply_positions(&outcome.nodes);
            if moved.is_empty() {
                return None;
            }
            tracing::debug!("Collision resolution moved {} nodes", moved.len());
            changes.push(change(WorkspaceChangeType::NodesUpdated, moved, Vec::new()));
            Some(())
        });
        outcome
    }

    /// Guides for `dragged` (carrying its in-flight position) against its siblings.
    pub fn snap_guides(&self, dragged: &Node) -> Vec<Guide> {
        snap::calculate_snap_guides(
            dragged,
            self.graph.nodes(),
            self.graph.types(),
            self.settings.snap_threshold,
        )
    }

    pub fn selection_snap_guides(&self, dragged: &[Node]) -> Vec<Guide> {
        snap::calculate_selection_snap_guides(
            dragged,
            self.graph.nodes(),
            self.graph.types(),
            self.settings.snap_threshold,
        )
    }

    /// Nodes of `ids` shifted by `delta`, without committing anything. As with
    /// [`translate_nodes`](Self::translate_nodes), only the outermost nodes are returned.
    pub fn preview_translation(&self, ids: &[NodeId], delta: Vec2) -> Vec<Node> {
        let outermost = self.graph.outermost_ids(ids);
        let wanted: HashSet<&NodeId> = outermost.iter().collect();
        self.graph
            .nodes()
            .iter()
            .filter(|n| wanted.contains(&n.id))
            .map(|n| {
                let mut moved = n.clone();
                moved.position = moved.position + delta;
                moved
            })
            .collect()
    }
}
