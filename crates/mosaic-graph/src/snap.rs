//! Alignment guides for nodes being dragged.
//!
//! Guides are advisory: they describe lines the dragged rectangle lines up
//! with, and never move anything. All coordinates are absolute canvas space.

use crate::transform;
use mosaic_core::{Node, NodeId, NodeTypeTable, Rect};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

const MERGE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideOrientation {
    /// A line of constant x.
    Vertical,
    /// A line of constant y.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignType {
    Edge,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    #[serde(rename = "type")]
    pub orientation: GuideOrientation,
    pub position: f64,
    pub start: f64,
    pub end: f64,
    pub align_type: AlignType,
}

/// (min, max, center) of a rect along one axis.
fn axis(rect: &Rect, orientation: GuideOrientation) -> (f64, f64, f64) {
    match orientation {
        GuideOrientation::Vertical => (rect.min.x, rect.max.x, rect.center().x),
        GuideOrientation::Horizontal => (rect.min.y, rect.max.y, rect.center().y),
    }
}

/// Span of the union of both rects across the guide.
fn span(a: &Rect, b: &Rect, orientation: GuideOrientation) -> (f64, f64) {
    match orientation {
        GuideOrientation::Vertical => (a.min.y.min(b.min.y), a.max.y.max(b.max.y)),
        GuideOrientation::Horizontal => (a.min.x.min(b.min.x), a.max.x.max(b.max.x)),
    }
}

fn guides_against(dragged: &Rect, other: &Rect, threshold: f64, out: &mut Vec<Guide>) {
    for orientation in [GuideOrientation::Vertical, GuideOrientation::Horizontal] {
        let (d_min, d_max, d_center) = axis(dragged, orientation);
        let (o_min, o_max, o_center) = axis(other, orientation);
        let (start, end) = span(dragged, other, orientation);

        let pairs = [
            (d_min, o_min, AlignType::Edge),
            (d_min, o_max, AlignType::Edge),
            (d_max, o_min, AlignType::Edge),
            (d_max, o_max, AlignType::Edge),
            (d_center, o_center, AlignType::Center),
        ];
        for (mine, theirs, align_type) in pairs {
            if (mine - theirs).abs() <= threshold {
                out.push(Guide {
                    orientation,
                    position: theirs,
                    start,
                    end,
                    align_type,
                });
            }
        }
    }
}

fn merge_and_sort(mut guides: Vec<Guide>) -> Vec<Guide> {
    guides.sort_by(|a, b| {
        a.orientation
            .cmp(&b.orientation)
            .then_with(|| a.position.partial_cmp(&b.position).unwrap_or(Ordering::Equal))
            .then_with(|| a.align_type.cmp(&b.align_type))
            .then_with(|| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal))
    });

    let mut merged: Vec<Guide> = Vec::with_capacity(guides.len());
    for guide in guides {
        if let Some(last) = merged.last_mut()
            && last.orientation == guide.orientation
            && last.align_type == guide.align_type
            && (last.position - guide.position).abs() <= MERGE_TOLERANCE
        {
            last.start = last.start.min(guide.start);
            last.end = last.end.max(guide.end);
            continue;
        }
        merged.push(guide);
    }
    merged
}

/// Guides for a rectangle at `bounds` against the nodes of the given scopes,
/// skipping the nodes in `exclude`.
fn guides_for_bounds(
    bounds: &Rect,
    scopes: &HashSet<Option<&NodeId>>,
    exclude: &HashSet<&NodeId>,
    all_nodes: &[Node],
    types: &NodeTypeTable,
    threshold: f64,
) -> Vec<Guide> {
    let mut guides = Vec::new();
    for other in all_nodes {
        if exclude.contains(&other.id) || !scopes.contains(&other.parent_id.as_ref()) {
            continue;
        }
        let other_rect = transform::absolute_rect(other, all_nodes, types);
        guides_against(bounds, &other_rect, threshold, &mut guides);
    }
    merge_and_sort(guides)
}

/// Alignment guides between `dragged` and its siblings.
///
/// `dragged` carries the in-flight position; its entry in `all_nodes` (if
/// any) is ignored.
pub fn calculate_snap_guides(
    dragged: &Node,
    all_nodes: &[Node],
    types: &NodeTypeTable,
    threshold: f64,
) -> Vec<Guide> {
    let bounds = transform::absolute_rect(dragged, all_nodes, types);
    let scopes = HashSet::from([dragged.parent_id.as_ref()]);
    let exclude = HashSet::from([&dragged.id]);
    guides_for_bounds(&bounds, &scopes, &exclude, all_nodes, types, threshold)
}

/// Alignment guides for a multi-node drag, using the union bounding box of
/// the selection against nodes sharing a scope with any selected node.
pub fn calculate_selection_snap_guides(
    dragged: &[Node],
    all_nodes: &[Node],
    types: &NodeTypeTable,
    threshold: f64,
) -> Vec<Guide> {
    let Some(bounds) = Rect::union_all(
        dragged
            .iter()
            .map(|node| transform::absolute_rect(node, all_nodes, types)),
    ) else {
        return Vec::new();
    };
    let scopes: HashSet<Option<&NodeId>> = dragged.iter().map(|n| n.parent_id.as_ref()).collect();
    let exclude: HashSet<&NodeId> = dragged.iter().map(|n| &n.id).collect();
    guides_for_bounds(&bounds, &scopes, &exclude, all_nodes, types, threshold)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use mosaic_core::Vec2;
    use proptest::prelude::*;

    proptest! {
        /// A guide appears at exactly the threshold and disappears just past it.
        #[test]
        fn prop_threshold_boundary(threshold in 1u32..50, gap in 1u32..4) {
            let types = NodeTypeTable::default();
            let threshold = threshold as f64;
            let a = Node::new(NodeId::from("a"), "note", Vec2::new(0.0, 0.0)).with_size(100.0, 100.0);
            // Far below so only the vertical axis can match.
            let at = Node::new(NodeId::from("b"), "note", Vec2::new(threshold, 1000.0)).with_size(100.0, 100.0);
            let past = Node::new(NodeId::from("b"), "note", Vec2::new(threshold + gap as f64 * 0.25, 1000.0))
                .with_size(100.0, 100.0);

            let hit = calculate_snap_guides(&a, &[a.clone(), at], &types, threshold);
            prop_assert!(hit.iter().any(|g| g.position == threshold));
            let miss = calculate_snap_guides(&a, &[a.clone(), past], &types, threshold);
            prop_assert!(miss.is_empty());
        }
    }
}
