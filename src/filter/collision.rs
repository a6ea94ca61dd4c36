//! Model-free collision detection against a scene cloud.
//!
//! Scene points are voxel-downsampled and moved into each grasp frame
//! (x = approach, y = closing, z = finger height). Points inside the two
//! fingers, the palm plate behind them, or the approach corridor behind the
//! palm count as occupied. A grasp collides when the occupied fraction of
//! that gripper volume, measured in voxels, exceeds the threshold.

use crate::cloud::PointCloud;
use crate::filter::CollisionDetector;
use crate::grasp::{GraspCandidate, GraspSet};
use crate::trace::{trace_event, trace_span};
use crate::util::{GraspError, GraspResult};
use nalgebra::Point3;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Gripper model and scene resolution for [`ModelFreeCollisionDetector`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionConfig {
    /// Voxel edge length used to downsample the scene, in meters.
    pub voxel_size: f32,
    /// Finger thickness along the closing axis.
    pub finger_width: f32,
    /// Finger length along the approach axis.
    pub finger_length: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.01,
            finger_width: 0.01,
            finger_length: 0.06,
        }
    }
}

/// Point-occupancy collision test for parallel-jaw grippers.
#[derive(Clone, Debug)]
pub struct ModelFreeCollisionDetector {
    cfg: CollisionConfig,
}

impl ModelFreeCollisionDetector {
    pub fn new(cfg: CollisionConfig) -> GraspResult<Self> {
        if !(cfg.voxel_size > 0.0) {
            return Err(GraspError::InvalidInput("voxel_size must be positive"));
        }
        if !(cfg.finger_width > 0.0) || !(cfg.finger_length > 0.0) {
            return Err(GraspError::InvalidInput("finger dimensions must be positive"));
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.cfg
    }

    /// Occupied fraction of the gripper volume for one grasp.
    ///
    /// `points` should already be downsampled to `voxel_size`. The approach
    /// corridor is never shorter than one finger width, so a non-positive
    /// `approach_distance` cannot make the volume negative.
    pub fn occupancy(
        &self,
        grasp: &GraspCandidate,
        points: &[Point3<f32>],
        approach_distance: f32,
    ) -> f32 {
        let fw = self.cfg.finger_width;
        let fl = self.cfg.finger_length;
        let approach_distance = approach_distance.max(fw);
        let geom = grasp.geometry();
        let (half_h, half_w, depth) = (geom.height * 0.5, geom.width * 0.5, geom.depth);
        let outer = half_w + fw;
        let finger_start = depth - fl;
        let palm_start = finger_start - fw;
        let corridor_start = palm_start - approach_distance;

        let to_local = grasp.rotation().transpose();
        let origin = grasp.translation();

        let mut hits = 0usize;
        for p in points {
            let local = to_local * (p.coords - origin);
            if local.z <= -half_h || local.z >= half_h {
                continue;
            }
            let (x, y) = (local.x, local.y);
            let within_outer = y > -outer && y < outer;
            let in_fingers_x = x > finger_start && x < depth;
            let left = in_fingers_x && y > -outer && y < -half_w;
            let right = in_fingers_x && y < outer && y > half_w;
            let palm = within_outer && x <= finger_start && x > palm_start;
            let corridor = within_outer && x <= palm_start && x > corridor_start;
            if left || right || palm || corridor {
                hits += 1;
            }
        }

        let span = geom.width + 2.0 * fw;
        let fingers = 2.0 * geom.height * fl * fw;
        let palm = geom.height * span * fw;
        let corridor = geom.height * span * approach_distance;
        let voxels = (fingers + palm + corridor) / self.cfg.voxel_size.powi(3);
        hits as f32 / (voxels + 1e-6)
    }
}

impl CollisionDetector for ModelFreeCollisionDetector {
    fn detect(
        &self,
        grasps: &GraspSet,
        scene: &PointCloud,
        approach_distance: f32,
        collision_threshold: f32,
    ) -> GraspResult<Vec<bool>> {
        let _span = trace_span!("model_free_collision", grasps = grasps.len()).entered();
        let sparse = scene.voxel_downsample(self.cfg.voxel_size);
        let points = sparse.points();

        #[cfg(feature = "rayon")]
        let mask: Vec<bool> = grasps
            .as_slice()
            .par_iter()
            .map(|g| self.occupancy(g, points, approach_distance) > collision_threshold)
            .collect();
        #[cfg(not(feature = "rayon"))]
        let mask: Vec<bool> = grasps
            .iter()
            .map(|g| self.occupancy(g, points, approach_distance) > collision_threshold)
            .collect();

        trace_event!(
            "collision_mask",
            scene_points = points.len(),
            colliding = mask.iter().filter(|c| **c).count()
        );
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::{CollisionConfig, ModelFreeCollisionDetector};
    use crate::cloud::PointCloud;
    use crate::filter::CollisionDetector;
    use crate::grasp::{GraspCandidate, GraspSet, GripperGeometry};
    use nalgebra::{Matrix3, Point3, Vector3};

    fn grasp_at_origin() -> GraspCandidate {
        GraspCandidate::new(
            Vector3::zeros(),
            Matrix3::identity(),
            0.8,
            GripperGeometry {
                width: 0.08,
                height: 0.02,
                depth: 0.02,
            },
        )
        .unwrap()
    }

    fn left_finger_block() -> Vec<Point3<f32>> {
        let mut points = Vec::new();
        for i in 0..6 {
            for z in [-0.005f32, 0.005] {
                points.push(Point3::new(-0.035 + 0.01 * i as f32, -0.045, z));
            }
        }
        points
    }

    #[test]
    fn rejects_non_positive_voxel() {
        let cfg = CollisionConfig {
            voxel_size: 0.0,
            ..CollisionConfig::default()
        };
        assert!(ModelFreeCollisionDetector::new(cfg).is_err());
    }

    #[test]
    fn points_inside_a_finger_collide() {
        let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
        let scene = PointCloud::new(left_finger_block());
        let set = GraspSet::from_vec(vec![grasp_at_origin()]);
        let mask = detector.detect(&set, &scene, 0.05, 0.01).unwrap();
        assert_eq!(mask, vec![true]);
    }

    #[test]
    fn negative_approach_distance_still_detects_fingers() {
        let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
        let scene = PointCloud::new(left_finger_block());
        let set = GraspSet::from_vec(vec![grasp_at_origin()]);
        for approach in [-0.05, 0.0] {
            let mask = detector.detect(&set, &scene, approach, 0.01).unwrap();
            assert_eq!(mask, vec![true]);
        }
        let occupancy = detector.occupancy(&grasp_at_origin(), &left_finger_block(), -0.05);
        assert!(occupancy > 0.0);
    }

    #[test]
    fn points_between_fingers_do_not_collide() {
        let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
        let points: Vec<_> = (0..6)
            .map(|i| Point3::new(-0.005 + 0.005 * i as f32, 0.0, 0.0))
            .collect();
        let scene = PointCloud::new(points);
        let set = GraspSet::from_vec(vec![grasp_at_origin()]);
        let mask = detector.detect(&set, &scene, 0.05, 0.01).unwrap();
        assert_eq!(mask, vec![false]);
    }

    #[test]
    fn occupancy_is_zero_for_distant_scene() {
        let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
        let far = vec![Point3::new(1.0, 1.0, 1.0)];
        assert_eq!(detector.occupancy(&grasp_at_origin(), &far, 0.05), 0.0);
    }
}
