//! k-nearest-neighbor selection over keypoint positions.
//!
//! The search is exhaustive: every keypoint is compared with every other,
//! which is O(n² log k) per image and keeps the result independent of any
//! spatial index. Ties are broken explicitly (distance, then index) so the
//! output is reproducible for identical input.

use std::cmp::Ordering;

use crate::keypoint::Keypoint;

/// One directed `(keypoint, neighbor)` relation found by the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborRelation {
    pub keypoint_index: usize,
    pub neighbor_index: usize,
    pub distance: f64,
}

/// Total order used to rank candidate neighbors: distance ascending, then
/// keypoint index ascending.
#[inline]
fn rank(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Compute the `k` nearest other keypoints for every keypoint.
///
/// The outer vector is aligned with `keypoints`; each inner vector is sorted
/// by rank and holds `min(k, n - 1)` relations. With zero or one keypoint
/// every list is empty.
pub fn select_neighbors(keypoints: &[Keypoint], k: usize) -> Vec<Vec<NeighborRelation>> {
    let n = keypoints.len();
    let take = k.min(n.saturating_sub(1));
    if take == 0 {
        return vec![Vec::new(); n];
    }

    let mut out = Vec::with_capacity(n);
    let mut candidates: Vec<(f64, usize)> = Vec::with_capacity(n - 1);

    for (i, kp) in keypoints.iter().enumerate() {
        candidates.clear();
        candidates.extend(
            keypoints
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, other)| (kp.distance_to(other), j)),
        );

        // Partition so the `take` best candidates come first, then order them.
        if take < candidates.len() {
            candidates.select_nth_unstable_by(take - 1, rank);
            candidates.truncate(take);
        }
        candidates.sort_unstable_by(rank);

        out.push(
            candidates
                .iter()
                .map(|&(distance, j)| NeighborRelation {
                    keypoint_index: i,
                    neighbor_index: j,
                    distance,
                })
                .collect(),
        );
    }

    out
}
