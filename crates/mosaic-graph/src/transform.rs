//! Conversion between parent-relative and absolute canvas coordinates.

use mosaic_core::{Node, NodeId, NodeTypeTable, Rect, Vec2};

/// Maximum parent chain length walked before giving up.
pub const MAX_PARENT_DEPTH: usize = 64;

/// Anything that can resolve a node id, so the transforms work over a full
/// [`GraphModel`](crate::GraphModel) as well as a bare node slice.
pub trait NodeLookup {
    fn lookup(&self, id: &NodeId) -> Option<&Node>;
}

impl NodeLookup for [Node] {
    fn lookup(&self, id: &NodeId) -> Option<&Node> {
        self.iter().find(|n| &n.id == id)
    }
}

impl NodeLookup for Vec<Node> {
    fn lookup(&self, id: &NodeId) -> Option<&Node> {
        self.as_slice().lookup(id)
    }
}

/// Absolute canvas position of `node`: its own position plus every ancestor's.
///
/// A missing ancestor ends the walk. Chains longer than [`MAX_PARENT_DEPTH`]
/// are cut off so a corrupt graph cannot hang the caller.
pub fn to_absolute<L: NodeLookup + ?Sized>(node: &Node, graph: &L) -> Vec2 {
    let mut position = node.position;
    let mut parent = node.parent_id.as_ref();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if depth >= MAX_PARENT_DEPTH {
            tracing::warn!("Parent chain of node {} exceeds depth cap", node.id);
            break;
        }
        let Some(parent_node) = graph.lookup(parent_id) else {
            break;
        };
        position = position + parent_node.position;
        parent = parent_node.parent_id.as_ref();
        depth += 1;
    }

    position
}

/// Express an absolute point relative to `new_parent`'s origin.
/// With no parent (or an unknown one) the point is already in the right space.
pub fn to_relative<L: NodeLookup + ?Sized>(
    absolute: Vec2,
    new_parent: Option<&NodeId>,
    graph: &L,
) -> Vec2 {
    match new_parent.and_then(|id| graph.lookup(id)) {
        Some(parent) => absolute - to_absolute(parent, graph),
        None => absolute,
    }
}

/// Bounding box of `node` in absolute canvas coordinates.
pub fn absolute_rect<L: NodeLookup + ?Sized>(
    node: &Node,
    graph: &L,
    types: &NodeTypeTable,
) -> Rect {
    Rect::from_pos_size(to_absolute(node, graph), node.size(types))
}
