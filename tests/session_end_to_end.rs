use graspick::{
    Collaborators, CollisionConfig, GraspCandidate, GraspError, GraspLog, GraspProposer,
    GraspRelay, GraspResult, GraspSet, GripperGeometry, ModelFreeCollisionDetector, PointCloud,
    RelayPayload, RenderSurface, ScriptedInput, Session, SessionConfig, Shape, Tag, WriterRelay,
};
use nalgebra::{Matrix3, Point3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Surface that reports closed on the first poll.
#[derive(Default)]
struct ClosedSurface {
    created: usize,
    destroyed: usize,
    /// Creation fails once this many surfaces exist.
    create_limit: Option<usize>,
}

impl RenderSurface for ClosedSurface {
    fn create_surface(&mut self, _width: u32) -> GraspResult<()> {
        if self.create_limit.is_some_and(|limit| self.created >= limit) {
            return Err(GraspError::Io("display unavailable".to_string()));
        }
        self.created += 1;
        Ok(())
    }

    fn add_geometry(&mut self, _shape: Shape<'_>) -> GraspResult<()> {
        Ok(())
    }

    fn poll_events(&mut self) -> bool {
        false
    }

    fn orbit(&mut self, _dx: f32, _dy: f32) {}

    fn refresh(&mut self) {}

    fn destroy_surface(&mut self) {
        self.destroyed += 1;
    }
}

struct FailingRelay;

impl GraspRelay for FailingRelay {
    fn publish(&mut self, _payload: &RelayPayload) -> GraspResult<()> {
        Err(GraspError::RelayFailure("no subscribers".to_string()))
    }
}

struct FixedProposer {
    grasps: GraspSet,
    seen_points: Option<usize>,
}

impl GraspProposer for FixedProposer {
    fn propose(&mut self, cloud: &PointCloud) -> GraspResult<GraspSet> {
        self.seen_points = Some(cloud.len());
        Ok(self.grasps.clone())
    }
}

fn grasp(t: [f32; 3], score: f32) -> GraspCandidate {
    GraspCandidate::new(
        Vector3::from(t),
        Matrix3::identity(),
        score,
        GripperGeometry {
            width: 0.08,
            height: 0.02,
            depth: 0.02,
        },
    )
    .unwrap()
}

/// Clutter around (1, 1, 1) that fills the left finger of a grasp placed there.
fn scene() -> PointCloud {
    let mut points = Vec::new();
    for i in 0..6 {
        for z in [-0.005f32, 0.005] {
            points.push(Point3::new(1.0 - 0.035 + 0.01 * i as f32, 1.0 - 0.045, 1.0 + z));
        }
    }
    points.push(Point3::new(-1.0, -1.0, 2.0));
    PointCloud::new(points)
}

/// Best-scoring grasp collides; one near-duplicate; five clean grasps.
fn raw_candidates() -> GraspSet {
    let mut set = GraspSet::new();
    set.add(grasp([0.1, 0.0, 0.5], 0.9));
    set.add(grasp([1.0, 1.0, 1.0], 0.99));
    set.add(grasp([0.105, 0.0, 0.5], 0.85));
    for i in 2..6 {
        set.add(grasp([0.1 * i as f32, 0.0, 0.5], 1.0 - 0.1 * i as f32));
    }
    set
}

fn config() -> SessionConfig {
    SessionConfig {
        num_point: 16,
        object_label: "box".to_string(),
        ..SessionConfig::default()
    }
}

#[test]
fn session_selects_persists_and_relays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grasps.csv");
    let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
    let mut surface = ClosedSurface::default();
    let mut input = ScriptedInput::new(["red", "x", "4"]);
    let mut log = GraspLog::open(&path).unwrap();
    let mut relay = WriterRelay::new(Vec::new());

    let mut session = Session::new(config());
    let outcome = {
        let mut io = Collaborators {
            detector: Some(&detector),
            surface: &mut surface,
            input: &mut input,
            log: &mut log,
            relay: &mut relay,
        };
        session.process(raw_candidates(), &scene(), &mut io).unwrap()
    };

    assert_eq!(outcome.suppressed, 1);
    assert_eq!(outcome.filter.collided, 1);
    assert!(!outcome.filter.orientation_fallback);
    assert_eq!(outcome.selection.tag, Tag::Red);
    assert_eq!(*outcome.selection.grasp.translation(), Vector3::new(0.3, 0.0, 0.5));
    assert_eq!(outcome.location, 4);
    assert!(outcome.persisted());
    assert!(outcome.relayed());
    assert!(outcome.preview_error.is_none());
    assert_eq!(session.completed(), 1);
    // Selection surface, then the confirmation preview.
    assert_eq!(surface.created, 2);
    assert_eq!(surface.destroyed, 2);

    let records = GraspLog::read_all(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].object_label, "box");
    assert_eq!(records[0].location, 4);
    assert_eq!(records[0].translation, [0.3, 0.0, 0.5]);

    let relayed = String::from_utf8(relay.into_inner()).unwrap();
    let values: Vec<f32> = relayed
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(values.len(), 12);
    assert_eq!(&values[..3], &[0.3, 0.0, 0.5]);
    assert_eq!(values[3], 1.0);
}

#[test]
fn run_samples_scene_for_the_proposer() {
    let dir = tempfile::tempdir().unwrap();
    let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
    let mut surface = ClosedSurface::default();
    let mut input = ScriptedInput::new(["black"]);
    let mut log = GraspLog::open(dir.path().join("grasps.csv")).unwrap();
    let mut relay = WriterRelay::new(Vec::new());
    let mut proposer = FixedProposer {
        grasps: raw_candidates(),
        seen_points: None,
    };
    let mut rng = StdRng::seed_from_u64(5);

    let mut session = Session::new(SessionConfig {
        location: Some(9),
        ..config()
    });
    let mut io = Collaborators {
        detector: Some(&detector),
        surface: &mut surface,
        input: &mut input,
        log: &mut log,
        relay: &mut relay,
    };
    let outcome = session
        .run(&mut proposer, &scene(), &mut rng, &mut io)
        .unwrap();

    assert_eq!(proposer.seen_points, Some(16));
    assert_eq!(outcome.selection.rank, 0);
    assert_eq!(outcome.selection.grasp.score(), 0.9);
    assert_eq!(outcome.location, 9);
}

#[test]
fn persistence_failure_still_relays() {
    let dir = tempfile::tempdir().unwrap();
    let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
    let mut surface = ClosedSurface::default();
    let mut input = ScriptedInput::new(["green", "2"]);
    let mut log = GraspLog::open(dir.path().join("missing").join("grasps.csv")).unwrap();
    let mut relay = WriterRelay::new(Vec::new());

    let mut session = Session::new(config());
    let outcome = {
        let mut io = Collaborators {
            detector: Some(&detector),
            surface: &mut surface,
            input: &mut input,
            log: &mut log,
            relay: &mut relay,
        };
        session.process(raw_candidates(), &scene(), &mut io).unwrap()
    };

    assert!(!outcome.persisted());
    assert!(matches!(
        outcome.persist_error,
        Some(GraspError::PersistenceWriteFailure(_))
    ));
    assert!(outcome.relayed());
    assert_eq!(relay.into_inner().iter().filter(|b| **b == b'\n').count(), 1);
}

#[test]
fn relay_failure_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grasps.csv");
    let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
    let mut surface = ClosedSurface::default();
    let mut input = ScriptedInput::new(["blue", "1"]);
    let mut log = GraspLog::open(&path).unwrap();
    let mut relay = FailingRelay;

    let mut session = Session::new(config());
    let mut io = Collaborators {
        detector: Some(&detector),
        surface: &mut surface,
        input: &mut input,
        log: &mut log,
        relay: &mut relay,
    };
    let outcome = session
        .process(raw_candidates(), &scene(), &mut io)
        .unwrap();

    assert!(outcome.persisted());
    assert_eq!(
        outcome.relay_error,
        Some(GraspError::RelayFailure("no subscribers".to_string()))
    );
    assert_eq!(GraspLog::read_all(&path).unwrap().len(), 1);
}

#[test]
fn too_few_survivors_abort_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
    let mut surface = ClosedSurface::default();
    let mut input = ScriptedInput::new(["red", "1"]);
    let mut log = GraspLog::open(dir.path().join("grasps.csv")).unwrap();
    let mut relay = WriterRelay::new(Vec::new());

    let mut candidates = GraspSet::new();
    candidates.add(grasp([1.0, 1.0, 1.0], 0.99));
    candidates.add(grasp([0.1, 0.0, 0.5], 0.9));
    candidates.add(grasp([0.2, 0.0, 0.5], 0.8));
    candidates.add(grasp([0.3, 0.0, 0.5], 0.7));

    let mut session = Session::new(config());
    let err = {
        let mut io = Collaborators {
            detector: Some(&detector),
            surface: &mut surface,
            input: &mut input,
            log: &mut log,
            relay: &mut relay,
        };
        session.process(candidates, &scene(), &mut io).unwrap_err()
    };

    assert_eq!(
        err,
        GraspError::InsufficientCandidates {
            required: 4,
            available: 3,
        }
    );
    assert_eq!(surface.created, 0);
    assert_eq!(log.next_row(), 0);
    assert_eq!(session.completed(), 0);
    assert!(relay.into_inner().is_empty());
}

#[test]
fn preview_failure_is_reported_after_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grasps.csv");
    let detector = ModelFreeCollisionDetector::new(CollisionConfig::default()).unwrap();
    let mut surface = ClosedSurface {
        create_limit: Some(1),
        ..ClosedSurface::default()
    };
    let mut input = ScriptedInput::new(["black", "3"]);
    let mut log = GraspLog::open(&path).unwrap();
    let mut relay = WriterRelay::new(Vec::new());

    let mut session = Session::new(config());
    let outcome = {
        let mut io = Collaborators {
            detector: Some(&detector),
            surface: &mut surface,
            input: &mut input,
            log: &mut log,
            relay: &mut relay,
        };
        session.process(raw_candidates(), &scene(), &mut io).unwrap()
    };

    assert_eq!(
        outcome.preview_error,
        Some(GraspError::Io("display unavailable".to_string()))
    );
    assert!(outcome.persisted());
    assert!(outcome.relayed());
    assert_eq!(surface.created, 1);
    assert_eq!(surface.destroyed, 1);
    assert_eq!(GraspLog::read_all(&path).unwrap().len(), 1);
}
