use mosaic_core::{Rect, Vec2};
use std::cmp::Ordering;
use std::f64::consts::TAU;

/// Outcome of a placement search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec2,
    /// True when no free spot was found within the ring budget and
    /// `position` is only the last candidate tried.
    pub exhausted: bool,
}

/// Expanding ring search for a free spot near a desired point.
///
/// Candidates lie on a lattice of `step` around the desired point. Ring `k`
/// holds the lattice offsets at Chebyshev distance `k`; inside a ring the
/// nearer offsets are tried first, ties broken clockwise starting east. The
/// order depends only on `step`, so identical inputs give identical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementFinder {
    pub step: f64,
    pub max_rings: usize,
}

impl Default for PlacementFinder {
    fn default() -> Self {
        Self {
            step: Self::DEFAULT_STEP,
            max_rings: Self::DEFAULT_MAX_RINGS,
        }
    }
}

impl PlacementFinder {
    pub const DEFAULT_STEP: f64 = 20.0;
    pub const DEFAULT_MAX_RINGS: usize = 50;

    pub fn new(step: f64, max_rings: usize) -> Self {
        Self {
            step: if step > 0.0 { step } else { Self::DEFAULT_STEP },
            max_rings,
        }
    }

    /// Lattice offsets of ring `k`, in visiting order.
    fn ring_offsets(k: i64) -> Vec<(i64, i64)> {
        if k == 0 {
            return vec![(0, 0)];
        }
        let mut offsets = Vec::with_capacity((8 * k) as usize);
        for i in -k..=k {
            for j in -k..=k {
                if i.abs().max(j.abs()) == k {
                    offsets.push((i, j));
                }
            }
        }
        let angle = |&(i, j): &(i64, i64)| (j as f64).atan2(i as f64).rem_euclid(TAU);
        offsets.sort_by(|a, b| {
            (a.0 * a.0 + a.1 * a.1)
                .cmp(&(b.0 * b.0 + b.1 * b.1))
                .then_with(|| angle(a).partial_cmp(&angle(b)).unwrap_or(Ordering::Equal))
        });
        offsets
    }

    fn is_free(candidate: &Rect, blocked: &[Rect]) -> bool {
        blocked.iter().all(|rect| !candidate.overlaps(rect))
    }

    /// Find the nearest position for a rectangle of `size` that keeps at least
    /// `margin` clear of every rectangle in `existing`.
    pub fn find(&self, desired: Vec2, size: Vec2, existing: &[Rect], margin: f64) -> Placement {
        let blocked: Vec<Rect> = existing.iter().map(|r| r.expand(margin)).collect();
        let mut last = desired;

        for k in 0..=self.max_rings as i64 {
            for (i, j) in Self::ring_offsets(k) {
                let candidate = Vec2::new(
                    desired.x + i as f64 * self.step,
                    desired.y + j as f64 * self.step,
                );
                if Self::is_free(&Rect::from_pos_size(candidate, size), &blocked) {
                    return Placement {
                        position: candidate,
                        exhausted: false,
                    };
                }
                last = candidate;
            }
        }

        tracing::debug!(
            "Placement search exhausted after {} rings near ({}, {})",
            self.max_rings,
            desired.x,
            desired.y
        );
        Placement {
            position: last,
            exhausted: true,
        }
    }
}

/// Nearest free position to `desired` using the default step and ring budget.
pub fn find_non_overlapping_position(
    desired: Vec2,
    size: Vec2,
    existing: &[Rect],
    margin: f64,
) -> Vec2 {
    PlacementFinder::default()
        .find(desired, size, existing, margin)
        .position
}

/// Round a point to the nearest grid intersection. A non-positive grid is a no-op.
pub fn snap_to_grid(point: Vec2, grid_size: f64) -> Vec2 {
    if grid_size <= 0.0 {
        return point;
    }
    Vec2::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}
