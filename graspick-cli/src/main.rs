use clap::Parser;
use graspick::{
    Collaborators, CollisionConfig, FilterConfig, GraspCandidate, GraspError, GraspLog,
    GraspRelay, GraspResult, GraspSet, GripperGeometry, LineInput, ModelFreeCollisionDetector,
    NmsConfig, OrientationRule, PointCloud, RenderSurface, Session, SessionConfig,
    SessionOutcome, SelectorConfig, Shape, UdpRelay, WriterRelay,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Graspick CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NmsConfigJson {
    translation_tolerance: f32,
    rotation_tolerance_deg: f32,
}

impl Default for NmsConfigJson {
    fn default() -> Self {
        let cfg = NmsConfig::default();
        Self {
            translation_tolerance: cfg.translation_tolerance,
            rotation_tolerance_deg: cfg.rotation_tolerance_deg,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilterConfigJson {
    approach_distance: f32,
    collision_threshold: f32,
    reference_axis: [f32; 3],
    min_projection: f32,
    max_depth: Option<f32>,
}

impl Default for FilterConfigJson {
    fn default() -> Self {
        let cfg = FilterConfig::default();
        let axis = cfg.orientation.reference_axis;
        Self {
            approach_distance: cfg.approach_distance,
            collision_threshold: cfg.collision_threshold,
            reference_axis: [axis.x, axis.y, axis.z],
            min_projection: cfg.orientation.min_projection,
            max_depth: cfg.max_depth,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CollisionConfigJson {
    voxel_size: f32,
    finger_width: f32,
    finger_length: f32,
}

impl Default for CollisionConfigJson {
    fn default() -> Self {
        let cfg = CollisionConfig::default();
        Self {
            voxel_size: cfg.voxel_size,
            finger_width: cfg.finger_width,
            finger_length: cfg.finger_length,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SelectorConfigJson {
    max_prompts: usize,
}

impl Default for SelectorConfigJson {
    fn default() -> Self {
        Self {
            max_prompts: SelectorConfig::default().max_prompts,
        }
    }
}

/// A candidate given as an explicit pose.
#[derive(Debug, Deserialize)]
struct CandidateJson {
    translation: [f32; 3],
    /// Row-major 3x3 rotation.
    rotation: [f32; 9],
    score: f32,
    #[serde(default)]
    width: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidateEntry {
    Pose(CandidateJson),
    Row(Vec<f32>),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    candidates_path: String,
    cloud_path: String,
    log_path: String,
    object_label: String,
    location: Option<u32>,
    relay_addr: Option<String>,
    output_path: Option<String>,
    nms: NmsConfigJson,
    filter: FilterConfigJson,
    collision: CollisionConfigJson,
    selector: SelectorConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            candidates_path: String::new(),
            cloud_path: String::new(),
            log_path: "grasps.csv".to_string(),
            object_label: session.object_label,
            location: session.location,
            relay_addr: None,
            output_path: None,
            nms: NmsConfigJson::default(),
            filter: FilterConfigJson::default(),
            collision: CollisionConfigJson::default(),
            selector: SelectorConfigJson::default(),
        }
    }
}

impl Config {
    fn session_config(&self) -> Result<SessionConfig, Box<dyn std::error::Error>> {
        let [x, y, z] = self.filter.reference_axis;
        let reference_axis = Vector3::new(x, y, z)
            .try_normalize(1e-6)
            .ok_or("filter.reference_axis must be non-zero")?;
        Ok(SessionConfig {
            object_label: self.object_label.clone(),
            location: self.location,
            nms: NmsConfig {
                translation_tolerance: self.nms.translation_tolerance,
                rotation_tolerance_deg: self.nms.rotation_tolerance_deg,
            },
            filter: FilterConfig {
                approach_distance: self.filter.approach_distance,
                collision_threshold: self.filter.collision_threshold,
                orientation: OrientationRule {
                    reference_axis,
                    min_projection: self.filter.min_projection,
                },
                max_depth: self.filter.max_depth,
            },
            selector: SelectorConfig {
                max_prompts: self.selector.max_prompts,
                ..SelectorConfig::default()
            },
            ..SessionConfig::default()
        })
    }
}

/// Terminal stand-in for a 3D viewer: lists the tagged candidates and closes
/// at once so the operator can answer.
struct ConsoleSurface;

impl RenderSurface for ConsoleSurface {
    fn create_surface(&mut self, _width: u32) -> GraspResult<()> {
        Ok(())
    }

    fn add_geometry(&mut self, shape: Shape<'_>) -> GraspResult<()> {
        match shape {
            Shape::Gripper { grasp, tag } => {
                let t = grasp.translation();
                eprintln!(
                    "{:>5}: score {:.3} at ({:.3}, {:.3}, {:.3})",
                    tag.as_str(),
                    grasp.score(),
                    t.x,
                    t.y,
                    t.z
                );
            }
            Shape::Cloud(cloud) => eprintln!("scene: {} points", cloud.len()),
        }
        Ok(())
    }

    fn poll_events(&mut self) -> bool {
        false
    }

    fn orbit(&mut self, _dx: f32, _dy: f32) {}

    fn refresh(&mut self) {}

    fn destroy_surface(&mut self) {}
}

fn load_candidates(path: &str) -> Result<GraspSet, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let entries: Vec<CandidateEntry> = serde_json::from_str(&text)?;
    let mut set = GraspSet::new();
    for entry in entries {
        let grasp = match entry {
            CandidateEntry::Pose(pose) => {
                let geometry = GripperGeometry {
                    width: pose.width.unwrap_or(GripperGeometry::default().width),
                    ..GripperGeometry::default()
                };
                GraspCandidate::from_flat(pose.translation, pose.rotation, pose.score, geometry)?
            }
            CandidateEntry::Row(row) => {
                let row: [f32; 17] = row
                    .as_slice()
                    .try_into()
                    .map_err(|_| GraspError::InvalidInput("candidate rows hold 17 values"))?;
                GraspCandidate::from_graspnet_row(&row)?
            }
        };
        set.add(grasp);
    }
    Ok(set)
}

#[derive(Debug, Serialize)]
struct Output {
    tag: String,
    rank: usize,
    score: f32,
    translation: [f32; 3],
    rotation: [f32; 9],
    location: u32,
    suppressed: usize,
    collided: usize,
    orientation_fallback: bool,
    row_index: Option<u64>,
    persist_error: Option<String>,
    relay_error: Option<String>,
    preview_error: Option<String>,
}

impl From<&SessionOutcome> for Output {
    fn from(value: &SessionOutcome) -> Self {
        let grasp = &value.selection.grasp;
        let t = grasp.translation();
        Self {
            tag: value.selection.tag.to_string(),
            rank: value.selection.rank,
            score: grasp.score(),
            translation: [t.x, t.y, t.z],
            rotation: grasp.rotation_flat(),
            location: value.location,
            suppressed: value.suppressed,
            collided: value.filter.collided,
            orientation_fallback: value.filter.orientation_fallback,
            row_index: value.record.as_ref().map(|r| r.row_index),
            persist_error: value.persist_error.as_ref().map(ToString::to_string),
            relay_error: value.relay_error.as_ref().map(ToString::to_string),
            preview_error: value.preview_error.as_ref().map(ToString::to_string),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("graspick=info".parse()?))
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.candidates_path.is_empty() || config.cloud_path.is_empty() {
        return Err("candidates_path and cloud_path must be set in the config".into());
    }

    let grasps = load_candidates(&config.candidates_path)?;
    let scene = PointCloud::load_xyz(&config.cloud_path)?;
    let detector = ModelFreeCollisionDetector::new(CollisionConfig {
        voxel_size: config.collision.voxel_size,
        finger_width: config.collision.finger_width,
        finger_length: config.collision.finger_length,
    })?;
    let mut log = GraspLog::open(&config.log_path)?;
    let mut relay: Box<dyn GraspRelay> = match &config.relay_addr {
        Some(addr) => Box::new(UdpRelay::new(addr.as_str())?),
        None => Box::new(WriterRelay::new(io::stderr())),
    };
    let mut surface = ConsoleSurface;
    let stdin = io::stdin();
    let mut input = LineInput::new(stdin.lock(), io::stderr());

    let mut session = Session::new(config.session_config()?);
    let outcome = {
        let mut io = Collaborators {
            detector: Some(&detector),
            surface: &mut surface,
            input: &mut input,
            log: &mut log,
            relay: relay.as_mut(),
        };
        session.process(grasps, &scene, &mut io)?
    };

    let json = serde_json::to_string_pretty(&Output::from(&outcome))?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
