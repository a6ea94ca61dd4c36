//! Feasibility filtering of ranked grasp candidates.
//!
//! The collision pass defers the geometric test to a [`CollisionDetector`];
//! the orientation pass is a soft preference that falls back to its input
//! when it would reject everything.

pub mod collision;

use crate::cloud::PointCloud;
use crate::grasp::{GraspCandidate, GraspSet};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{GraspError, GraspResult};
use nalgebra::Vector3;

pub use collision::{CollisionConfig, ModelFreeCollisionDetector};

/// Collision collaborator contract.
///
/// Returns one flag per candidate, aligned by index; `true` means colliding.
pub trait CollisionDetector {
    fn detect(
        &self,
        grasps: &GraspSet,
        scene: &PointCloud,
        approach_distance: f32,
        collision_threshold: f32,
    ) -> GraspResult<Vec<bool>>;
}

/// Keeps grasps whose approach axis projects onto `reference_axis` at or
/// above `min_projection`.
///
/// With the defaults this is the rotation entry at row 1, column 0. The
/// cutoff `-0.383` is roughly `cos(112.5°)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationRule {
    /// Unit reference direction in the cloud frame.
    pub reference_axis: Vector3<f32>,
    /// Minimum accepted projection of the approach axis.
    pub min_projection: f32,
}

impl Default for OrientationRule {
    fn default() -> Self {
        Self {
            reference_axis: Vector3::y(),
            min_projection: -0.383,
        }
    }
}

impl OrientationRule {
    /// Projection of the grasp's approach axis on the reference axis.
    pub fn projection(&self, grasp: &GraspCandidate) -> f32 {
        grasp.approach_axis().dot(&self.reference_axis)
    }

    /// Returns true if the grasp passes the rule.
    pub fn admits(&self, grasp: &GraspCandidate) -> bool {
        self.projection(grasp) >= self.min_projection
    }
}

/// Parameters for the feasibility passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterConfig {
    /// Approach clearance passed to the collision detector, in meters.
    pub approach_distance: f32,
    /// Collision threshold; non-positive disables the collision pass.
    pub collision_threshold: f32,
    /// Orientation preference.
    pub orientation: OrientationRule,
    /// Optional maximum translation z (camera depth); `None` disables it.
    pub max_depth: Option<f32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            approach_distance: 0.05,
            collision_threshold: 0.01,
            orientation: OrientationRule::default(),
            max_depth: None,
        }
    }
}

/// Counts and decisions of one filter run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// True when the collision pass was disabled by a non-positive threshold.
    pub collision_skipped: bool,
    /// Candidates dropped as colliding.
    pub collided: usize,
    /// Candidates dropped by the depth gate.
    pub beyond_depth: usize,
    /// Candidates dropped by the orientation pass (zero after a fallback).
    pub orientation_dropped: usize,
    /// True when the orientation pass would have emptied the set.
    pub orientation_fallback: bool,
}

/// Collision, depth and orientation pruning.
#[derive(Clone, Debug, Default)]
pub struct FeasibilityFilter {
    cfg: FilterConfig,
}

impl FeasibilityFilter {
    pub fn new(cfg: FilterConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.cfg
    }

    /// Prunes `grasps` in place.
    ///
    /// Passing `None` as the detector is only valid when the collision pass is
    /// disabled; otherwise the call fails with
    /// [`GraspError::CollisionServiceUnavailable`] and `grasps` is untouched.
    pub fn apply(
        &self,
        grasps: &mut GraspSet,
        scene: &PointCloud,
        detector: Option<&dyn CollisionDetector>,
    ) -> GraspResult<FilterOutcome> {
        let _span = trace_span!("feasibility", input = grasps.len()).entered();
        let mut outcome = FilterOutcome::default();

        if self.cfg.collision_threshold <= 0.0 {
            outcome.collision_skipped = true;
        } else {
            outcome.collided = self.collision_pass(grasps, scene, detector)?;
        }

        if let Some(max_depth) = self.cfg.max_depth {
            outcome.beyond_depth = grasps.retain(|g| g.translation().z <= max_depth);
        }

        let (dropped, fallback) = self.orientation_pass(grasps);
        outcome.orientation_dropped = dropped;
        outcome.orientation_fallback = fallback;

        trace_event!(
            "feasibility_done",
            kept = grasps.len(),
            collided = outcome.collided,
            beyond_depth = outcome.beyond_depth,
            orientation_dropped = outcome.orientation_dropped,
            orientation_fallback = outcome.orientation_fallback
        );
        Ok(outcome)
    }

    fn collision_pass(
        &self,
        grasps: &mut GraspSet,
        scene: &PointCloud,
        detector: Option<&dyn CollisionDetector>,
    ) -> GraspResult<usize> {
        let _span = trace_span!("collision_pass", input = grasps.len()).entered();
        let detector = detector.ok_or_else(|| {
            GraspError::CollisionServiceUnavailable("no collision detector configured".to_string())
        })?;
        if grasps.is_empty() {
            return Ok(0);
        }
        let mask = detector.detect(
            grasps,
            scene,
            self.cfg.approach_distance,
            self.cfg.collision_threshold,
        )?;
        if mask.len() != grasps.len() {
            return Err(GraspError::CollisionServiceUnavailable(format!(
                "detector returned {} flags for {} candidates",
                mask.len(),
                grasps.len()
            )));
        }
        grasps.drop_flagged(&mask)
    }

    /// Returns `(dropped, fell_back)`.
    fn orientation_pass(&self, grasps: &mut GraspSet) -> (usize, bool) {
        let rule = self.cfg.orientation;
        let admitted: GraspSet = grasps.iter().copied().filter(|g| rule.admits(g)).collect();
        if admitted.is_empty() && !grasps.is_empty() {
            trace_warn!(
                "orientation pass rejected all {} candidates; keeping them unfiltered",
                grasps.len()
            );
            return (0, true);
        }
        let dropped = grasps.len() - admitted.len();
        *grasps = admitted;
        (dropped, false)
    }
}
