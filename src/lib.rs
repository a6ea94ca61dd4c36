//! Graspick turns ranked 6-DOF grasp proposals into one operator-confirmed grasp.
//!
//! The pipeline suppresses near-duplicate poses, ranks by score, prunes
//! colliding and badly oriented candidates, lets an operator choose among the
//! top four on a render surface, then appends the choice to a CSV log and
//! relays it downstream. Rendering, proposal models and transports are
//! collaborators behind small traits; optional `tracing` and `rayon` features
//! add spans/events and parallel collision checks.

pub mod acquire;
pub mod cloud;
pub mod filter;
pub mod grasp;
pub mod persist;
pub mod relay;
pub mod select;
pub mod session;
mod trace;
pub mod util;

pub use acquire::{EveryNthFrame, FrameCounter, FrameSlot, TriggerPolicy};
pub use cloud::PointCloud;
pub use filter::{
    CollisionConfig, CollisionDetector, FeasibilityFilter, FilterConfig, FilterOutcome,
    ModelFreeCollisionDetector, OrientationRule,
};
pub use grasp::{GraspCandidate, GraspSet, GripperGeometry, NmsConfig};
pub use persist::{GraspLog, PersistedGraspRecord};
pub use relay::{GraspRelay, RelayPayload, UdpRelay, WriterRelay};
pub use select::{
    LineInput, RenderSurface, ScriptedInput, Selection, SelectionInput, SelectionMachine,
    Selector, SelectorConfig, SelectorState, Shape, Tag,
};
pub use session::{Collaborators, GraspProposer, Session, SessionConfig, SessionOutcome};
pub use util::{AbortReason, GraspError, GraspResult};
