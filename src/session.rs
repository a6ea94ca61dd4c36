//! One grasp-selection session from raw proposals to a recorded grasp.
//!
//! Stages run in order on the calling thread: NMS, score sort, feasibility
//! filtering, interactive selection, location prompt, persistence, relay,
//! then a preview of the chosen grasp. Persistence, relay and preview
//! failures are reported in the outcome and do not abort the session;
//! everything before them is fatal.

use crate::cloud::PointCloud;
use crate::filter::{CollisionDetector, FeasibilityFilter, FilterConfig, FilterOutcome};
use crate::grasp::{GraspSet, NmsConfig};
use crate::persist::{GraspLog, PersistedGraspRecord};
use crate::relay::{GraspRelay, RelayPayload};
use crate::select::{RenderSurface, Selection, SelectionInput, Selector, SelectorConfig};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{AbortReason, GraspError, GraspResult};
use rand::Rng;

/// Grasp-proposal model contract.
pub trait GraspProposer {
    /// Predicts raw candidates for a sampled cloud.
    fn propose(&mut self, cloud: &PointCloud) -> GraspResult<GraspSet>;
}

/// Session parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Points sampled from the scene for the proposal model.
    pub num_point: usize,
    /// Label written with every record.
    pub object_label: String,
    /// Fixed placement index; `None` asks the operator.
    pub location: Option<u32>,
    pub nms: NmsConfig,
    pub filter: FilterConfig,
    pub selector: SelectorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            num_point: 20_000,
            object_label: "box".to_string(),
            location: None,
            nms: NmsConfig::default(),
            filter: FilterConfig::default(),
            selector: SelectorConfig::default(),
        }
    }
}

/// External collaborators used by one session.
pub struct Collaborators<'a> {
    /// `None` is only accepted when the collision pass is disabled.
    pub detector: Option<&'a dyn CollisionDetector>,
    pub surface: &'a mut dyn RenderSurface,
    pub input: &'a mut dyn SelectionInput,
    pub log: &'a mut GraspLog,
    pub relay: &'a mut dyn GraspRelay,
}

/// What a completed session produced.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOutcome {
    pub selection: Selection,
    pub location: u32,
    /// Candidates removed by NMS.
    pub suppressed: usize,
    pub filter: FilterOutcome,
    /// The written record, if persistence succeeded.
    pub record: Option<PersistedGraspRecord>,
    pub persist_error: Option<GraspError>,
    pub relay_error: Option<GraspError>,
    /// Set when the confirmation preview could not be shown.
    pub preview_error: Option<GraspError>,
}

impl SessionOutcome {
    pub fn persisted(&self) -> bool {
        self.record.is_some()
    }

    pub fn relayed(&self) -> bool {
        self.relay_error.is_none()
    }
}

/// Sequential grasp pipeline. Methods take `&mut self`, so sessions on one
/// pipeline never overlap.
#[derive(Debug)]
pub struct Session {
    cfg: SessionConfig,
    filter: FeasibilityFilter,
    selector: Selector,
    completed: u64,
}

impl Session {
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            filter: FeasibilityFilter::new(cfg.filter),
            selector: Selector::new(cfg.selector),
            cfg,
            completed: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    /// Sessions that reached persistence and relay.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Samples the scene, asks the proposer for candidates, then runs
    /// [`Session::process`] against the full scene.
    pub fn run<P, R>(
        &mut self,
        proposer: &mut P,
        scene: &PointCloud,
        rng: &mut R,
        io: &mut Collaborators<'_>,
    ) -> GraspResult<SessionOutcome>
    where
        P: GraspProposer + ?Sized,
        R: Rng + ?Sized,
    {
        let sampled = scene.sample(self.cfg.num_point, rng)?;
        let grasps = proposer.propose(&sampled)?;
        trace_event!("proposed", count = grasps.len(), sampled = sampled.len());
        self.process(grasps, scene, io)
    }

    /// Runs the pipeline on already proposed candidates.
    pub fn process(
        &mut self,
        mut grasps: GraspSet,
        scene: &PointCloud,
        io: &mut Collaborators<'_>,
    ) -> GraspResult<SessionOutcome> {
        let _span = trace_span!("session", candidates = grasps.len()).entered();

        let suppressed = grasps.suppress(&self.cfg.nms);
        grasps.sort_by_score();
        let filter = self.filter.apply(&mut grasps, scene, io.detector)?;

        let selection = self
            .selector
            .run(&grasps, scene, &mut *io.surface, &mut *io.input)?;
        let location = match self.cfg.location {
            Some(location) => location,
            None => prompt_location(&mut *io.input, self.cfg.selector.max_prompts)?,
        };

        let (record, persist_error) =
            match io
                .log
                .append(&self.cfg.object_label, location, &selection.grasp)
            {
                Ok(record) => (Some(record), None),
                Err(err) => {
                    trace_warn!("grasp not persisted: {err}");
                    (None, Some(err))
                }
            };

        let relay_error = match io.relay.publish(&RelayPayload::from_grasp(&selection.grasp)) {
            Ok(()) => None,
            Err(err) => {
                trace_warn!("grasp not relayed: {err}");
                Some(err)
            }
        };

        let preview_error = match self
            .selector
            .confirm(&selection, scene, &mut *io.surface)
        {
            Ok(()) => None,
            Err(err) => {
                trace_warn!("confirmation preview failed: {err}");
                Some(err)
            }
        };

        self.completed += 1;
        trace_event!(
            "session_done",
            tag = selection.tag.as_str(),
            location = location,
            persisted = record.is_some(),
            relayed = relay_error.is_none()
        );
        Ok(SessionOutcome {
            selection,
            location,
            suppressed,
            filter,
            record,
            persist_error,
            relay_error,
            preview_error,
        })
    }
}

fn prompt_location<I>(input: &mut I, max_prompts: usize) -> GraspResult<u32>
where
    I: SelectionInput + ?Sized,
{
    let mut answers = 0usize;
    loop {
        let Some(answer) = input.prompt("Enter the placement location index:")? else {
            return Err(GraspError::SelectionAborted(AbortReason::InputClosed));
        };
        answers += 1;
        match answer.trim().parse::<u32>() {
            Ok(location) => return Ok(location),
            Err(_) => {
                trace_warn!("invalid location {answer:?}, asking again");
                if max_prompts != 0 && answers >= max_prompts {
                    return Err(GraspError::SelectionAborted(AbortReason::PromptsExhausted));
                }
            }
        }
    }
}
