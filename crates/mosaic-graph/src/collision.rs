use mosaic_core::{Node, NodeId, NodeTypeTable, Rect, Vec2};
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionOptions {
    pub max_iterations: usize,
    /// Pairs whose overlap fraction is at or below this are left alone.
    pub overlap_threshold: f64,
    /// Extra gap added when pushing a colliding pair apart.
    pub margin: f64,
}

impl Default for CollisionOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            overlap_threshold: 0.0,
            margin: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionOutcome {
    /// Input nodes in input order; only `position` may differ.
    pub nodes: Vec<Node>,
    /// Passes that moved at least one node.
    pub iterations: usize,
    /// False when the iteration budget ran out with collisions left.
    pub converged: bool,
}

/// Overlap area divided by the area of the smaller rectangle.
/// Zero when either rectangle has no area.
pub fn overlap_fraction(a: &Rect, b: &Rect) -> f64 {
    let smaller = a.area().min(b.area());
    if smaller <= 0.0 {
        return 0.0;
    }
    match a.intersection(b) {
        Some(overlap) => overlap.area() / smaller,
        None => 0.0,
    }
}

/// Node indices bucketed by containment scope, each bucket in input order.
fn scopes(nodes: &[Node]) -> Vec<Vec<usize>> {
    let mut keys: Vec<Option<&NodeId>> = Vec::new();
    let mut buckets: Vec<Vec<usize>> = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        let key = node.parent_id.as_ref();
        match keys.iter().position(|k| *k == key) {
            Some(bucket) => buckets[bucket].push(idx),
            None => {
                keys.push(key);
                buckets.push(vec![idx]);
            }
        }
    }
    buckets
}

/// Offsets that separate `a` from `b` along the axis with the smaller
/// penetration depth, split evenly. Ties go to the horizontal axis.
fn separation(a: &Rect, b: &Rect, margin: f64) -> (Vec2, Vec2) {
    // Depth when `a` leaves towards -axis vs towards +axis.
    let (left, right) = (a.max.x - b.min.x, b.max.x - a.min.x);
    let (up, down) = (a.max.y - b.min.y, b.max.y - a.min.y);
    let depth_x = left.min(right);
    let depth_y = up.min(down);

    if depth_x <= depth_y + EPSILON {
        let half = (depth_x + margin) / 2.0;
        // Earlier node goes negative when both ways cost the same.
        let dir = if left <= right { -1.0 } else { 1.0 };
        (Vec2::new(dir * half, 0.0), Vec2::new(-dir * half, 0.0))
    } else {
        let half = (depth_y + margin) / 2.0;
        let dir = if up <= down { -1.0 } else { 1.0 };
        (Vec2::new(0.0, dir * half), Vec2::new(0.0, -dir * half))
    }
}

/// One pass over every scope. Returns whether any pair was pushed.
fn resolve_pass(
    nodes: &mut [Node],
    sizes: &[Vec2],
    scopes: &[Vec<usize>],
    options: &CollisionOptions,
) -> bool {
    let mut moved = false;
    for scope in scopes {
        for (pos, &i) in scope.iter().enumerate() {
            for &j in &scope[pos + 1..] {
                let a = Rect::from_pos_size(nodes[i].position, sizes[i]);
                let b = Rect::from_pos_size(nodes[j].position, sizes[j]);
                if overlap_fraction(&a, &b) <= options.overlap_threshold {
                    continue;
                }
                let (push_a, push_b) = separation(&a, &b, options.margin);
                nodes[i].position = nodes[i].position + push_a;
                nodes[j].position = nodes[j].position + push_b;
                moved = true;
            }
        }
    }
    moved
}

fn has_collisions(
    nodes: &[Node],
    sizes: &[Vec2],
    scopes: &[Vec<usize>],
    threshold: f64,
) -> bool {
    scopes.iter().any(|scope| {
        scope.iter().enumerate().any(|(pos, &i)| {
            scope[pos + 1..].iter().any(|&j| {
                let a = Rect::from_pos_size(nodes[i].position, sizes[i]);
                let b = Rect::from_pos_size(nodes[j].position, sizes[j]);
                overlap_fraction(&a, &b) > threshold
            })
        })
    })
}

/// Iteratively push apart sibling nodes that overlap by more than the
/// threshold. Nodes never move across containment scopes, and the loop is
/// bounded by `max_iterations`.
pub fn resolve_collisions(
    nodes: &[Node],
    types: &NodeTypeTable,
    options: &CollisionOptions,
) -> CollisionOutcome {
    let mut nodes = nodes.to_vec();
    let sizes: Vec<Vec2> = nodes.iter().map(|n| n.size(types)).collect();
    let scopes = scopes(&nodes);

    let mut iterations = 0;
    let mut converged = false;
    while iterations < options.max_iterations {
        if !resolve_pass(&mut nodes, &sizes, &scopes, options) {
            converged = true;
            break;
        }
        iterations += 1;
    }
    if !converged {
        converged = !has_collisions(&nodes, &sizes, &scopes, options.overlap_threshold);
        if !converged {
            tracing::debug!(
                "Collision resolution stopped after {} iterations with overlaps left",
                iterations
            );
        }
    }

    CollisionOutcome {
        nodes,
        iterations,
        converged,
    }
}
