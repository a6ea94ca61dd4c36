#![cfg(feature = "rayon")]

use graspick::{
    CollisionConfig, CollisionDetector, GraspCandidate, GraspSet, GripperGeometry,
    ModelFreeCollisionDetector, PointCloud,
};
use nalgebra::{Point3, Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn parallel_mask_matches_per_grasp_occupancy() {
    let mut rng = StdRng::seed_from_u64(11);
    let points: Vec<Point3<f32>> = (0..4000)
        .map(|_| {
            Point3::new(
                rng.random_range(-0.2..0.2),
                rng.random_range(-0.2..0.2),
                rng.random_range(0.4..0.6),
            )
        })
        .collect();
    let scene = PointCloud::new(points);
    let grasps: GraspSet = (0..64)
        .map(|_| {
            let rot = Rotation3::from_euler_angles(
                rng.random_range(-3.0..3.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(-3.0..3.0),
            );
            GraspCandidate::new(
                Vector3::new(
                    rng.random_range(-0.3..0.3),
                    rng.random_range(-0.3..0.3),
                    rng.random_range(0.3..0.7),
                ),
                *rot.matrix(),
                rng.random_range(0.0..1.0),
                GripperGeometry::default(),
            )
            .unwrap()
        })
        .collect();

    let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
    let mask = detector.detect(&grasps, &scene, 0.05, 0.01).unwrap();

    let sparse = scene.voxel_downsample(0.01);
    let expected: Vec<bool> = grasps
        .iter()
        .map(|g| detector.occupancy(g, sparse.points(), 0.05) > 0.01)
        .collect();
    assert_eq!(mask, expected);
    assert!(mask.iter().any(|c| *c));
}
