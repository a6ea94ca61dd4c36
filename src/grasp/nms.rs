//! Non-maximum suppression over 6-DOF grasp poses.

use crate::grasp::GraspCandidate;
use crate::util::math::rotation_angle;
use std::cmp::Ordering;

/// Tolerances that decide when two grasps are duplicates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Maximum translation distance in meters.
    pub translation_tolerance: f32,
    /// Maximum geodesic rotation difference in degrees.
    pub rotation_tolerance_deg: f32,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            translation_tolerance: 0.03,
            rotation_tolerance_deg: 30.0,
        }
    }
}

impl NmsConfig {
    /// Returns true when `a` and `b` fall within both tolerances.
    pub fn is_duplicate(&self, a: &GraspCandidate, b: &GraspCandidate) -> bool {
        let dist = (a.translation() - b.translation()).norm();
        if dist > self.translation_tolerance {
            return false;
        }
        let angle = rotation_angle(a.rotation(), b.rotation());
        angle <= self.rotation_tolerance_deg.to_radians()
    }
}

/// Orders by descending score, then ascending original index.
pub(crate) fn score_order_desc(
    a: (usize, &GraspCandidate),
    b: (usize, &GraspCandidate),
) -> Ordering {
    b.1.score()
        .partial_cmp(&a.1.score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Greedy pose NMS.
///
/// Candidates are visited by descending score (ties by input index) and kept
/// if they are not a duplicate of any previously kept candidate. The result is
/// in visiting order, so it is already sorted by score.
pub fn nms_poses(grasps: &[GraspCandidate], cfg: &NmsConfig) -> Vec<GraspCandidate> {
    let mut order: Vec<(usize, &GraspCandidate)> = grasps.iter().enumerate().collect();
    order.sort_by(|a, b| score_order_desc(*a, *b));

    let mut kept: Vec<GraspCandidate> = Vec::new();
    'outer: for (_, grasp) in order {
        for kept_grasp in kept.iter() {
            if cfg.is_duplicate(grasp, kept_grasp) {
                continue 'outer;
            }
        }
        kept.push(*grasp);
    }

    kept
}
