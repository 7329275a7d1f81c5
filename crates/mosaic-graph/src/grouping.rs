//! Group, ungroup and containment toggling.
//!
//! Every operation keeps the affected nodes where they are on screen: positions
//! are rewritten into the new parent's coordinate space at the moment of
//! reparenting.

use crate::error::GraphError;
use crate::graph::GraphModel;
use mosaic_core::{Extent, GROUP_NODE_TYPE, Node, NodeId, Rect, Vec2};

/// Wrap the selected nodes in a new group node sized to their union bounds
/// plus `padding`.
///
/// Unknown ids are skipped, as are nodes whose ancestor is also selected (they
/// travel with that ancestor). If every remaining node shares a parent the
/// group is nested under it, otherwise it is created at the top level.
pub fn try_group_selected_nodes(
    graph: &mut GraphModel,
    selected_ids: &[NodeId],
    padding: f64,
    contain: bool,
) -> Result<NodeId, GraphError> {
    let members = graph.outermost_ids(selected_ids);
    if members.len() < 2 {
        return Err(GraphError::DegenerateSelection(members.len()));
    }

    let first_parent = graph.node(&members[0]).and_then(|n| n.parent_id.clone());
    let parent = if members
        .iter()
        .all(|id| graph.node(id).and_then(|n| n.parent_id.as_ref()) == first_parent.as_ref())
    {
        first_parent
    } else {
        None
    };

    let Some(bounds) = Rect::union_all(
        members
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|node| graph.absolute_rect(node)),
    ) else {
        return Err(GraphError::DegenerateSelection(0));
    };
    let bounds = bounds.expand(padding);
    let parent_origin = parent
        .as_ref()
        .and_then(|p| graph.absolute_position(p))
        .unwrap_or(Vec2::ZERO);

    let group_id = graph.fresh_node_id("group");
    let mut group = Node::new(group_id.clone(), GROUP_NODE_TYPE, bounds.min - parent_origin)
        .with_size(bounds.width(), bounds.height());
    group.parent_id = parent;
    group.data = graph.types().get(GROUP_NODE_TYPE).data.clone();

    let insert_at = members
        .iter()
        .filter_map(|id| graph.node_index(id))
        .min()
        .unwrap_or(graph.node_count());
    graph.insert_node_at(insert_at, group)?;

    for id in &members {
        let Some(absolute) = graph.absolute_position(id) else {
            continue;
        };
        if let Some(node) = graph.node_mut(id) {
            node.position = absolute - bounds.min;
            node.parent_id = Some(group_id.clone());
            node.extent = contain.then_some(Extent::Parent);
        }
    }

    tracing::debug!("Grouped {} nodes into {}", members.len(), group_id);
    Ok(group_id)
}

/// Group the selection, or do nothing when fewer than two valid nodes are selected.
pub fn group_selected_nodes(
    graph: &mut GraphModel,
    selected_ids: &[NodeId],
    padding: f64,
    contain: bool,
) -> Option<NodeId> {
    match try_group_selected_nodes(graph, selected_ids, padding, contain) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::debug!("Ignoring group request: {}", err);
            None
        }
    }
}

/// Dissolve a group: its children move to the group's parent scope without
/// moving on screen, then the group node and its edges are removed.
/// Returns the released children.
pub fn try_ungroup_node(graph: &mut GraphModel, group_id: &NodeId) -> Result<Vec<NodeId>, GraphError> {
    let group = graph
        .node(group_id)
        .ok_or_else(|| GraphError::NodeNotFound(group_id.clone()))?;
    if !group.is_group() {
        return Err(GraphError::NotAContainer(group_id.clone()));
    }

    let released = graph.release_children(group_id);
    graph.try_delete_node(group_id)?;
    tracing::debug!("Ungrouped {} ({} children)", group_id, released.len());
    Ok(released)
}

pub fn ungroup_node(graph: &mut GraphModel, group_id: &NodeId) -> bool {
    match try_ungroup_node(graph, group_id) {
        Ok(_) => true,
        Err(err) => {
            tracing::debug!("Ignoring ungroup request: {}", err);
            false
        }
    }
}

/// Toggle the advisory `extent: "parent"` flag. Position and parent are left
/// alone; asking to contain a top-level node does nothing.
pub fn try_set_node_contained(
    graph: &mut GraphModel,
    node_id: &NodeId,
    contained: bool,
) -> Result<bool, GraphError> {
    let node = graph
        .node_mut(node_id)
        .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
    if contained && node.parent_id.is_none() {
        return Ok(false);
    }
    let extent = contained.then_some(Extent::Parent);
    let changed = node.extent != extent;
    node.extent = extent;
    Ok(changed)
}

pub fn set_node_contained(graph: &mut GraphModel, node_id: &NodeId, contained: bool) -> bool {
    try_set_node_contained(graph, node_id, contained).unwrap_or_else(|err| {
        tracing::debug!("Ignoring containment change: {}", err);
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(graph: &mut GraphModel, id: &str, node_type: &str, x: f64, y: f64) {
        graph
            .insert_node(Node::new(NodeId::from(id), node_type, Vec2::new(x, y)).with_size(100.0, 100.0))
            .unwrap();
    }

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::from(*n)).collect()
    }

    #[test]
    fn test_group_wraps_selection_and_keeps_absolute_positions() {
        let mut graph = GraphModel::new();
        add(&mut graph, "a", "note", 10.0, 10.0);
        add(&mut graph, "b", "note", 200.0, 10.0);

        let group_id = group_selected_nodes(&mut graph, &ids(&["a", "b"]), 20.0, false).unwrap();

        let group = graph.node(&group_id).unwrap();
        assert!(group.is_group());
        assert_eq!(group.position, Vec2::new(-10.0, -10.0));
        assert_eq!((group.width, group.height), (Some(330.0), Some(140.0)));

        let group_rect = graph.absolute_rect(group);
        for (id, original) in [("a", Vec2::new(10.0, 10.0)), ("b", Vec2::new(200.0, 10.0))] {
            let node = graph.node(&NodeId::from(id)).unwrap();
            assert_eq!(node.parent_id.as_ref(), Some(&group_id));
            assert_eq!(node.extent, None);
            assert_eq!(node.position + group.position, original);
            let rect = graph.absolute_rect(node);
            assert_eq!(rect.union(&group_rect), group_rect);
        }
        // Group renders underneath its children.
        assert_eq!(graph.node_index(&group_id), Some(0));
    }

    #[test]
    fn test_group_needs_two_valid_nodes() {
        let mut graph = GraphModel::new();
        add(&mut graph, "a", "note", 0.0, 0.0);

        assert_eq!(
            try_group_selected_nodes(&mut graph, &ids(&["a"]), 20.0, false),
            Err(GraphError::DegenerateSelection(1))
        );
        assert_eq!(
            try_group_selected_nodes(&mut graph, &ids(&["a", "a", "ghost"]), 20.0, false),
            Err(GraphError::DegenerateSelection(1))
        );
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_group_sets_extent_when_containing() {
        let mut graph = GraphModel::new();
        add(&mut graph, "a", "note", 0.0, 0.0);
        add(&mut graph, "b", "note", 300.0, 0.0);

        group_selected_nodes(&mut graph, &ids(&["a", "b"]), 20.0, true).unwrap();
        assert_eq!(graph.node(&NodeId::from("a")).unwrap().extent, Some(Extent::Parent));
    }

    #[test]
    fn test_group_nests_under_shared_parent() {
        let mut graph = GraphModel::new();
        add(&mut graph, "outer", "group", 100.0, 100.0);
        for (id, x) in [("a", 10.0), ("b", 150.0)] {
            graph
                .insert_node(
                    Node::new(NodeId::from(id), "note", Vec2::new(x, 30.0))
                        .with_size(100.0, 100.0)
                        .with_parent(NodeId::from("outer")),
                )
                .unwrap();
        }

        let group_id = group_selected_nodes(&mut graph, &ids(&["a", "b"]), 10.0, false).unwrap();

        let group = graph.node(&group_id).unwrap();
        assert_eq!(group.parent_id, Some(NodeId::from("outer")));
        assert_eq!(group.position, Vec2::new(0.0, 20.0));
        assert_eq!(
            graph.absolute_position(&NodeId::from("b")),
            Some(Vec2::new(250.0, 130.0))
        );
    }

    #[test]
    fn test_mixed_scopes_group_at_top_level() {
        let mut graph = GraphModel::new();
        add(&mut graph, "outer", "group", 100.0, 100.0);
        graph
            .insert_node(
                Node::new(NodeId::from("inside"), "note", Vec2::new(10.0, 10.0))
                    .with_size(100.0, 100.0)
                    .with_parent(NodeId::from("outer")),
            )
            .unwrap();
        add(&mut graph, "free", "note", 500.0, 500.0);

        let group_id =
            group_selected_nodes(&mut graph, &ids(&["inside", "free"]), 0.0, false).unwrap();

        assert_eq!(graph.node(&group_id).unwrap().parent_id, None);
        assert_eq!(
            graph.absolute_position(&NodeId::from("inside")),
            Some(Vec2::new(110.0, 110.0))
        );
    }

    #[test]
    fn test_selected_descendants_travel_with_their_ancestor() {
        let mut graph = GraphModel::new();
        add(&mut graph, "g", "group", 0.0, 0.0);
        graph
            .insert_node(
                Node::new(NodeId::from("c"), "note", Vec2::new(10.0, 10.0))
                    .with_size(50.0, 50.0)
                    .with_parent(NodeId::from("g")),
            )
            .unwrap();
        add(&mut graph, "x", "note", 300.0, 0.0);

        let group_id = group_selected_nodes(&mut graph, &ids(&["g", "c", "x"]), 0.0, false).unwrap();

        assert_eq!(graph.node(&NodeId::from("c")).unwrap().parent_id, Some(NodeId::from("g")));
        assert_eq!(graph.node(&NodeId::from("g")).unwrap().parent_id, Some(group_id));
    }

    #[test]
    fn test_ungroup_restores_absolute_positions() {
        let mut graph = GraphModel::new();
        add(&mut graph, "a", "note", 10.0, 10.0);
        add(&mut graph, "b", "note", 200.0, 10.0);
        add(&mut graph, "c", "note", 800.0, 0.0);
        let group_id = group_selected_nodes(&mut graph, &ids(&["a", "b"]), 20.0, true).unwrap();
        graph.create_edge(&group_id, &NodeId::from("c"), None, None, None);

        let released = try_ungroup_node(&mut graph, &group_id).unwrap();

        assert_eq!(released, ids(&["a", "b"]));
        assert!(!graph.contains_node(&group_id));
        assert_eq!(graph.edge_count(), 0);
        let a = graph.node(&NodeId::from("a")).unwrap();
        assert_eq!(a.position, Vec2::new(10.0, 10.0));
        assert_eq!(a.parent_id, None);
        assert_eq!(a.extent, None);
    }

    #[test]
    fn test_ungroup_nested_group_moves_children_to_grandparent() {
        let mut graph = GraphModel::new();
        add(&mut graph, "outer", "group", 100.0, 100.0);
        graph
            .insert_node(
                Node::new(NodeId::from("inner"), "group", Vec2::new(20.0, 20.0))
                    .with_size(300.0, 300.0)
                    .with_parent(NodeId::from("outer")),
            )
            .unwrap();
        graph
            .insert_node(
                Node::new(NodeId::from("leaf"), "note", Vec2::new(5.0, 5.0))
                    .with_parent(NodeId::from("inner")),
            )
            .unwrap();

        assert!(ungroup_node(&mut graph, &NodeId::from("inner")));

        let leaf = graph.node(&NodeId::from("leaf")).unwrap();
        assert_eq!(leaf.parent_id, Some(NodeId::from("outer")));
        assert_eq!(leaf.position, Vec2::new(25.0, 25.0));
    }

    #[test]
    fn test_ungroup_rejects_non_group_and_missing() {
        let mut graph = GraphModel::new();
        add(&mut graph, "a", "note", 0.0, 0.0);
        assert_eq!(
            try_ungroup_node(&mut graph, &NodeId::from("a")),
            Err(GraphError::NotAContainer(NodeId::from("a")))
        );
        assert!(!ungroup_node(&mut graph, &NodeId::from("ghost")));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_set_contained_toggles_extent_only() {
        let mut graph = GraphModel::new();
        add(&mut graph, "g", "group", 0.0, 0.0);
        graph
            .insert_node(
                Node::new(NodeId::from("c"), "note", Vec2::new(5.0, 5.0)).with_parent(NodeId::from("g")),
            )
            .unwrap();
        add(&mut graph, "free", "note", 500.0, 0.0);
        let c = NodeId::from("c");

        assert!(set_node_contained(&mut graph, &c, true));
        assert!(!set_node_contained(&mut graph, &c, true));
        let node = graph.node(&c).unwrap();
        assert_eq!(node.extent, Some(Extent::Parent));
        assert_eq!(node.position, Vec2::new(5.0, 5.0));
        assert_eq!(node.parent_id, Some(NodeId::from("g")));

        assert!(set_node_contained(&mut graph, &c, false));
        assert_eq!(graph.node(&c).unwrap().extent, None);

        assert!(!set_node_contained(&mut graph, &NodeId::from("free"), true));
        assert_eq!(graph.node(&NodeId::from("free")).unwrap().extent, None);
        assert!(!set_node_contained(&mut graph, &NodeId::from("ghost"), true));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Grouping then ungrouping leaves every node where it started.
        #[test]
        fn prop_group_ungroup_round_trip(
            points in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 2..8),
            padding in 0.0f64..40.0,
        ) {
            let mut graph = GraphModel::new();
            let mut selected = Vec::new();
            for (i, (x, y)) in points.iter().enumerate() {
                let id = NodeId::new(format!("n{i}"));
                graph
                    .insert_node(Node::new(id.clone(), "note", Vec2::new(*x, *y)))
                    .unwrap();
                selected.push(id);
            }
            let before: Vec<Vec2> = selected
                .iter()
                .map(|id| graph.absolute_position(id).unwrap())
                .collect();

            let group_id = group_selected_nodes(&mut graph, &selected, padding, false).unwrap();
            for (id, original) in selected.iter().zip(&before) {
                prop_assert!(graph.absolute_position(id).unwrap().approx_eq(*original, 1e-6));
            }

            prop_assert!(ungroup_node(&mut graph, &group_id));
            for (id, original) in selected.iter().zip(&before) {
                let node = graph.node(id).unwrap();
                prop_assert!(node.parent_id.is_none());
                prop_assert!(node.position.approx_eq(*original, 1e-6));
            }
        }
    }
}
