use crate::error::GraphError;
use crate::transform::{self, MAX_PARENT_DEPTH, NodeLookup};
use mosaic_core::{
    Edge, EdgeId, Extent, Node, NodeData, NodeId, NodeTypeTable, Rect, Vec2, WorkspaceDocument,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// What happens to the children of a group node when the group is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildDisposition {
    /// Children move to the group's own parent scope, keeping their on-screen position.
    #[default]
    Reparent,
    /// Children and all deeper descendants are deleted with the group.
    Cascade,
}

/// Shallow partial update for a node. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    pub node_type: Option<String>,
    pub position: Option<Vec2>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub parent_id: Option<Option<NodeId>>,
    pub extent: Option<Option<Extent>>,
    pub selected: Option<bool>,
    pub data: Option<NodeData>,
}

impl NodePatch {
    pub fn moved_to(position: Vec2) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn resized(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn reparented(parent_id: Option<NodeId>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    pub fn with_data(data: NodeData) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

/// The canonical node and edge sets of one canvas.
///
/// Node order is z-order: later nodes render on top of earlier ones.
#[derive(Debug, Clone)]
pub struct GraphModel {
    nodes: Vec<Node>,
    node_map: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
    edge_map: HashMap<EdgeId, usize>,
    types: Arc<NodeTypeTable>,
    child_disposition: ChildDisposition,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::with_types(Arc::new(NodeTypeTable::default()))
    }

    pub fn with_types(types: Arc<NodeTypeTable>) -> Self {
        Self {
            nodes: Vec::new(),
            node_map: HashMap::new(),
            edges: Vec::new(),
            edge_map: HashMap::new(),
            types,
            child_disposition: ChildDisposition::default(),
        }
    }

    /// Build a model from a persisted document, dropping whatever would break
    /// the graph invariants.
    pub fn from_document(document: &WorkspaceDocument, types: Arc<NodeTypeTable>) -> Self {
        let mut model = Self::with_types(types);

        for node in &document.nodes {
            if model.node_map.contains_key(&node.id) {
                tracing::warn!("Dropping node with duplicate id {}", node.id);
                continue;
            }
            let mut node = node.clone();
            node.selected = false;
            model.node_map.insert(node.id.clone(), model.nodes.len());
            model.nodes.push(node);
        }

        let parented: Vec<(NodeId, NodeId)> = model
            .nodes
            .iter()
            .filter_map(|n| n.parent_id.clone().map(|p| (n.id.clone(), p)))
            .collect();
        for (child, parent) in parented {
            if let Err(err) = model.validate_parent(&child, &parent) {
                tracing::warn!("Clearing parent of node {}: {}", child, err);
                // Keep the child where it was on screen.
                let offset = match err {
                    GraphError::NotAContainer(_) => model.absolute_position(&parent),
                    _ => None,
                };
                if let Some(node) = model.node_mut(&child) {
                    node.position = node.position + offset.unwrap_or(Vec2::ZERO);
                    node.parent_id = None;
                    node.extent = None;
                }
            }
        }

        for edge in &document.edges {
            if model.edge_map.contains_key(&edge.id) {
                tracing::warn!("Dropping edge with duplicate id {}", edge.id);
                continue;
            }
            if let Err(err) = model.validate_edge(&edge.source, &edge.target) {
                tracing::warn!("Dropping edge {}: {}", edge.id, err);
                continue;
            }
            model.edge_map.insert(edge.id.clone(), model.edges.len());
            model.edges.push(edge.clone());
        }

        model
    }

    /// Replace the document's nodes and edges with this model's.
    pub fn write_into(&self, document: &mut WorkspaceDocument) {
        document.nodes = self.nodes.clone();
        document.edges = self.edges.clone();
    }

    pub fn types(&self) -> &NodeTypeTable {
        &self.types
    }

    pub fn child_disposition(&self) -> ChildDisposition {
        self.child_disposition
    }

    pub fn set_child_disposition(&mut self, disposition: ChildDisposition) {
        self.child_disposition = disposition;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_map.get(id).map(|&idx| &self.nodes[idx])
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.node_map.get(id).map(|&idx| &mut self.nodes[idx])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edge_map.get(id).map(|&idx| &self.edges[idx])
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Z-order index of a node.
    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.node_map.get(id).copied()
    }

    pub fn children<'a>(&'a self, parent_id: &'a NodeId) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id.as_ref() == Some(parent_id))
    }

    /// Nodes sharing a containment scope; `None` is the top-level scope.
    pub fn scope<'a>(
        &'a self,
        parent_id: Option<&'a NodeId>,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id.as_ref() == parent_id)
    }

    /// All nodes below `id` in the containment tree, breadth first.
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        seen.insert(id.clone());
        let mut queue = VecDeque::from([id.clone()]);

        while let Some(current) = queue.pop_front() {
            for child in self.children(&current) {
                if seen.insert(child.id.clone()) {
                    result.push(child.id.clone());
                    queue.push_back(child.id.clone());
                }
            }
        }

        result
    }

    pub fn node_size(&self, node: &Node) -> Vec2 {
        node.size(&self.types)
    }

    /// Bounding box in the node's parent coordinate space.
    pub fn node_rect(&self, node: &Node) -> Rect {
        node.rect(&self.types)
    }

    /// Bounding box in absolute canvas coordinates.
    pub fn absolute_rect(&self, node: &Node) -> Rect {
        Rect::from_pos_size(transform::to_absolute(node, self), self.node_size(node))
    }

    pub fn absolute_position(&self, id: &NodeId) -> Option<Vec2> {
        self.node(id).map(|node| transform::to_absolute(node, self))
    }

    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Known ids of `ids` in first-seen order, minus duplicates and nodes with
    /// an ancestor in the same list. Those move with that ancestor.
    pub fn outermost_ids(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let known: Vec<&NodeId> = ids
            .iter()
            .filter(|id| self.contains_node(id) && seen.insert(*id))
            .collect();
        known
            .iter()
            .filter(|id| {
                !known
                    .iter()
                    .any(|other| other != *id && self.has_ancestor(id, other))
            })
            .map(|id| (*id).clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Invariant checks
    // ------------------------------------------------------------------

    /// Whether `ancestor` appears on `id`'s parent chain.
    fn has_ancestor(&self, id: &NodeId, ancestor: &NodeId) -> bool {
        let mut current = self.node(id).and_then(|n| n.parent_id.as_ref());
        for _ in 0..MAX_PARENT_DEPTH {
            match current {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = self.node(parent).and_then(|n| n.parent_id.as_ref()),
                None => return false,
            }
        }
        // A chain this deep is already broken; treat it as cyclic.
        true
    }

    pub fn validate_parent(&self, child: &NodeId, parent: &NodeId) -> Result<(), GraphError> {
        let cycle = || GraphError::ParentCycle {
            child: child.clone(),
            parent: parent.clone(),
        };
        if child == parent {
            return Err(cycle());
        }
        let parent_node = self
            .node(parent)
            .ok_or_else(|| GraphError::NodeNotFound(parent.clone()))?;
        if !parent_node.is_group() {
            return Err(GraphError::NotAContainer(parent.clone()));
        }
        if self.has_ancestor(parent, child) {
            return Err(cycle());
        }
        Ok(())
    }

    fn validate_edge(&self, source: &NodeId, target: &NodeId) -> Result<(), GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source.clone()));
        }
        for id in [source, target] {
            if !self.contains_node(id) {
                return Err(GraphError::NodeNotFound(id.clone()));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Node mutations
    // ------------------------------------------------------------------

    pub(crate) fn fresh_node_id(&self, prefix: &str) -> NodeId {
        loop {
            let id = NodeId::generate(prefix);
            if !self.contains_node(&id) {
                return id;
            }
        }
    }

    /// Create a node of `node_type` at `position` with its type's default size.
    /// `data_overrides` are merged over the type's default payload.
    pub fn create_node(
        &mut self,
        node_type: &str,
        position: Vec2,
        data_overrides: Option<NodeData>,
    ) -> Node {
        let prefix = if NodeTypeTable::is_container(node_type) {
            "group"
        } else {
            "node"
        };
        let id = self.fresh_node_id(prefix);

        let defaults = self.types.get(node_type);
        let mut node = Node::new(id, node_type, position)
            .with_size(defaults.default_width, defaults.default_height);
        node.data = defaults.data.clone();
        if let Some(overrides) = data_overrides {
            node.data.extend(overrides);
        }

        tracing::debug!("Created {} node {}", node_type, node.id);
        self.node_map.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node.clone());
        node
    }

    /// Insert a fully built node (paste, import) at the top of the z-order.
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        let index = self.nodes.len();
        self.insert_node_at(index, node)
    }

    pub(crate) fn insert_node_at(&mut self, index: usize, node: Node) -> Result<(), GraphError> {
        if self.contains_node(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        if let Some(parent) = &node.parent_id {
            self.validate_parent(&node.id, parent)?;
        }
        self.nodes.insert(index.min(self.nodes.len()), node);
        self.reindex_nodes();
        Ok(())
    }

    pub fn try_update_node(&mut self, id: &NodeId, patch: NodePatch) -> Result<bool, GraphError> {
        let index = *self
            .node_map
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;

        if let Some(Some(parent)) = &patch.parent_id {
            self.validate_parent(id, parent)?;
        }
        let node_type = patch
            .node_type
            .clone()
            .unwrap_or_else(|| self.nodes[index].node_type.clone());
        if !NodeTypeTable::is_container(&node_type) && self.children(id).next().is_some() {
            return Err(GraphError::NotAContainer(id.clone()));
        }
        let min = self.types.get(&node_type).min_size();

        let node = &mut self.nodes[index];
        let before = node.clone();
        if let Some(node_type) = patch.node_type {
            node.node_type = node_type;
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(width) = patch.width {
            node.width = Some(width.max(min.x));
        }
        if let Some(height) = patch.height {
            node.height = Some(height.max(min.y));
        }
        if let Some(parent_id) = patch.parent_id {
            node.parent_id = parent_id;
        }
        if let Some(extent) = patch.extent {
            node.extent = extent;
        }
        if node.parent_id.is_none() {
            node.extent = None;
        }
        if let Some(selected) = patch.selected {
            node.selected = selected;
        }
        if let Some(data) = patch.data {
            node.data = data;
        }

        Ok(*node != before)
    }

    /// Shallow-merge `patch` into the node. Invalid updates are ignored.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> bool {
        match self.try_update_node(id, patch) {
            Ok(changed) => changed,
            Err(err) => {
                tracing::warn!("Ignoring update of node {}: {}", id, err);
                false
            }
        }
    }

    /// Remove a node and its incident edges, returning every removed node id.
    /// Group children follow the model's [`ChildDisposition`].
    pub fn try_delete_node(&mut self, id: &NodeId) -> Result<Vec<NodeId>, GraphError> {
        let is_group = self
            .node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?
            .is_group();

        let mut removed = vec![id.clone()];
        if is_group {
            match self.child_disposition {
                ChildDisposition::Reparent => {
                    let released = self.release_children(id);
                    tracing::debug!("Released {} children of group {}", released.len(), id);
                }
                ChildDisposition::Cascade => removed.extend(self.descendants(id)),
            }
        }

        self.remove_nodes(&removed);
        Ok(removed)
    }

    pub fn delete_node(&mut self, id: &NodeId) -> bool {
        match self.try_delete_node(id) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!("Ignoring delete: {}", err);
                false
            }
        }
    }

    /// Move every child of `group_id` into the group's own parent scope,
    /// translating positions so nothing moves on screen. Clears `extent`.
    pub(crate) fn release_children(&mut self, group_id: &NodeId) -> Vec<NodeId> {
        let (offset, new_parent) = match self.node(group_id) {
            Some(group) => (group.position, group.parent_id.clone()),
            None => return Vec::new(),
        };

        let mut released = Vec::new();
        for node in self
            .nodes
            .iter_mut()
            .filter(|n| n.parent_id.as_ref() == Some(group_id))
        {
            node.position = node.position + offset;
            node.parent_id = new_parent.clone();
            node.extent = None;
            released.push(node.id.clone());
        }
        released
    }

    fn remove_nodes(&mut self, ids: &[NodeId]) {
        let doomed: HashSet<&NodeId> = ids.iter().collect();
        self.nodes.retain(|n| !doomed.contains(&n.id));
        self.edges
            .retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));
        self.reindex_nodes();
        self.reindex_edges();
    }

    /// Mark exactly `ids` as selected. Returns whether anything changed.
    pub fn set_selection(&mut self, ids: &[NodeId]) -> bool {
        let wanted: HashSet<&NodeId> = ids.iter().collect();
        let mut changed = false;
        for node in &mut self.nodes {
            let selected = wanted.contains(&node.id);
            if node.selected != selected {
                node.selected = selected;
                changed = true;
            }
        }
        changed
    }

    /// Move a node, together with its descendants, to the top of the z-order.
    pub fn bring_to_front(&mut self, id: &NodeId) -> bool {
        if !self.contains_node(id) {
            return false;
        }
        let mut moving: HashSet<NodeId> = self.descendants(id).into_iter().collect();
        moving.insert(id.clone());

        let before: Vec<NodeId> = self.nodes.iter().map(|n| n.id.clone()).collect();
        let (mut lifted, mut rest): (Vec<Node>, Vec<Node>) = self
            .nodes
            .drain(..)
            .partition(|n| moving.contains(&n.id));
        rest.append(&mut lifted);
        self.nodes = rest;
        self.reindex_nodes();

        !self.nodes.iter().map(|n| &n.id).eq(before.iter())
    }

    /// Copy positions from `nodes` onto matching nodes. Returns the ids that moved.
    pub fn apply_positions(&mut self, nodes: &[Node]) -> Vec<NodeId> {
        let mut moved = Vec::new();
        for update in nodes {
            if let Some(node) = self.node_mut(&update.id)
                && node.position != update.position
            {
                node.position = update.position;
                moved.push(update.id.clone());
            }
        }
        moved
    }

    // ------------------------------------------------------------------
    // Edge mutations
    // ------------------------------------------------------------------

    pub fn try_create_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        label: Option<String>,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Result<Edge, GraphError> {
        self.validate_edge(source, target)?;

        let mut id = EdgeId::generate();
        while self.edge_map.contains_key(&id) {
            id = EdgeId::generate();
        }
        let mut edge = Edge::new(id, source.clone(), target.clone());
        edge.label = label;
        edge.source_handle = source_handle;
        edge.target_handle = target_handle;

        self.edge_map.insert(edge.id.clone(), self.edges.len());
        self.edges.push(edge.clone());
        Ok(edge)
    }

    /// Connect two nodes. Parallel edges are allowed; self-loops and dangling
    /// endpoints are not.
    pub fn create_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        label: Option<String>,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Option<Edge> {
        match self.try_create_edge(source, target, label, source_handle, target_handle) {
            Ok(edge) => Some(edge),
            Err(err) => {
                tracing::warn!("Ignoring edge {} -> {}: {}", source, target, err);
                None
            }
        }
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> bool {
        let Some(&index) = self.edge_map.get(id) else {
            return false;
        };
        self.edges.remove(index);
        self.reindex_edges();
        true
    }

    fn reindex_nodes(&mut self) {
        self.node_map = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.id.clone(), idx))
            .collect();
    }

    fn reindex_edges(&mut self) {
        self.edge_map = self
            .edges
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.id.clone(), idx))
            .collect();
    }
}

impl NodeLookup for GraphModel {
    fn lookup(&self, id: &NodeId) -> Option<&Node> {
        self.node(id)
    }
}
