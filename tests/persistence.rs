use graspick::{GraspCandidate, GraspError, GraspLog, GripperGeometry};
use nalgebra::{Rotation3, Vector3};

fn grasp(t: [f32; 3], roll: f32, pitch: f32, yaw: f32) -> GraspCandidate {
    let rot = Rotation3::from_euler_angles(roll, pitch, yaw);
    GraspCandidate::new(
        Vector3::from(t),
        *rot.matrix(),
        0.7,
        GripperGeometry::default(),
    )
    .unwrap()
}

#[test]
fn record_round_trips_pose() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grasps.csv");
    let first = grasp([0.123456, -0.5, 0.987654], 0.3, -1.1, 2.5);
    let second = grasp([1e-4, 2.0, -3.25], -0.7, 0.2, 0.0);

    let mut log = GraspLog::open(&path).unwrap();
    let written = log.append("box", 4, &first).unwrap();
    log.append("cylinder", 11, &second).unwrap();
    assert_eq!(written.row_index, 0);
    assert_eq!(log.next_row(), 2);

    let records = GraspLog::read_all(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], written);
    assert_eq!(records[1].row_index, 1);
    assert_eq!(records[1].object_label, "cylinder");
    assert_eq!(records[1].location, 11);

    for (record, original) in records.iter().zip([first, second]) {
        let t = original.translation();
        for (got, want) in record.translation.iter().zip([t.x, t.y, t.z]) {
            assert!((got - want).abs() < 1e-6);
        }
        for (got, want) in record.rotation_flat.iter().zip(original.rotation_flat()) {
            assert!((got - want).abs() < 1e-6);
        }
        let restored =
            GraspCandidate::from_flat(record.translation, record.rotation_flat, 0.7, original.geometry())
                .unwrap();
        assert!((restored.rotation() - original.rotation()).amax() < 1e-6);
    }
}

#[test]
fn reopening_continues_row_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grasps.csv");
    let g = grasp([0.0, 0.0, 0.5], 0.0, 0.0, 0.0);
    {
        let mut log = GraspLog::open(&path).unwrap();
        log.append("box", 1, &g).unwrap();
        log.append("box", 2, &g).unwrap();
    }
    let mut log = GraspLog::open(&path).unwrap();
    assert_eq!(log.next_row(), 2);
    let record = log.append("box", 3, &g).unwrap();
    assert_eq!(record.row_index, 2);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|line| !line.starts_with("row")));
}

#[test]
fn labels_with_delimiters_survive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grasps.csv");
    let mut log = GraspLog::open(&path).unwrap();
    let g = grasp([0.1, 0.2, 0.3], 0.0, 0.0, 0.5);
    log.append("cheez-its, large", 0, &g).unwrap();
    let records = GraspLog::read_all(&path).unwrap();
    assert_eq!(records[0].object_label, "cheez-its, large");
}

#[test]
fn unwritable_path_reports_persistence_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("grasps.csv");
    let mut log = GraspLog::open(&path).unwrap();
    let g = grasp([0.0, 0.0, 0.5], 0.0, 0.0, 0.0);
    let err = log.append("box", 1, &g).unwrap_err();
    assert!(matches!(err, GraspError::PersistenceWriteFailure(_)));
    assert_eq!(log.next_row(), 0);
}

#[test]
fn labels_with_line_breaks_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grasps.csv");
    let mut log = GraspLog::open(&path).unwrap();
    let g = grasp([0.1, 0.2, 0.3], 0.0, 0.0, 0.5);
    for label in ["box\nlarge", "box\r", "\r\nbox"] {
        let err = log.append(label, 0, &g).unwrap_err();
        assert!(matches!(err, GraspError::InvalidInput(_)));
    }
    assert_eq!(log.next_row(), 0);
    assert!(!path.exists());

    log.append("box", 0, &g).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 1);
}
