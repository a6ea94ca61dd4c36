//! Human-in-the-loop selection among the top-ranked candidates.
//!
//! The top [`SLOT_COUNT`] candidates are tagged with the fixed palette and
//! drawn together with the scene. The selector polls the surface until the
//! operator closes it, then asks for the tag of the preferred grasp.
//!
//! State flow: `Presenting` -> `AwaitingInput` -> `Selected` | `Aborted`.
//! Unknown tags keep the machine in `AwaitingInput` and are re-prompted.

pub mod input;
pub mod palette;
pub mod surface;

use crate::cloud::PointCloud;
use crate::grasp::{GraspCandidate, GraspSet};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{AbortReason, GraspError, GraspResult};

pub use input::{LineInput, ScriptedInput, SelectionInput};
pub use palette::Tag;
pub use surface::{RenderSurface, Shape, SurfaceGuard};

/// Number of candidates presented at once; fixed by the palette.
pub const SLOT_COUNT: usize = Tag::ALL.len();

/// Selector parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectorConfig {
    /// Surface width in pixels.
    pub window_width: u32,
    /// Camera orbit applied once when presentation starts.
    pub orbit: (f32, f32),
    /// Answers accepted before giving up; `0` means unlimited.
    pub max_prompts: usize,
    /// Polls allowed while the surface stays open; `None` waits forever.
    pub max_polls: Option<usize>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            window_width: 900,
            orbit: (0.0, 900.0),
            max_prompts: 5,
            max_polls: None,
        }
    }
}

/// Selection state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectorState {
    Presenting,
    AwaitingInput,
    Selected(Tag),
    Aborted(AbortReason),
}

/// A candidate with its presentation slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaggedGrasp {
    pub tag: Tag,
    /// Position in the ranked set, `0` is best.
    pub rank: usize,
    pub grasp: GraspCandidate,
}

/// The operator's choice.
pub type Selection = TaggedGrasp;

/// Explicit selection state machine, independent of any display or terminal.
#[derive(Clone, Debug)]
pub struct SelectionMachine {
    slots: [TaggedGrasp; SLOT_COUNT],
    state: SelectorState,
    answers: usize,
    max_prompts: usize,
}

impl SelectionMachine {
    /// Tags the first [`SLOT_COUNT`] candidates of `grasps`.
    pub fn new(grasps: &GraspSet, max_prompts: usize) -> GraspResult<Self> {
        let top = grasps.top(SLOT_COUNT)?;
        let slots = std::array::from_fn(|rank| TaggedGrasp {
            tag: Tag::ALL[rank],
            rank,
            grasp: top[rank],
        });
        Ok(Self {
            slots,
            state: SelectorState::Presenting,
            answers: 0,
            max_prompts,
        })
    }

    pub fn slots(&self) -> &[TaggedGrasp; SLOT_COUNT] {
        &self.slots
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    /// The surface reported closed; start waiting for a tag.
    pub fn surface_closed(&mut self) {
        if self.state == SelectorState::Presenting {
            self.state = SelectorState::AwaitingInput;
        }
    }

    /// Resolves one typed answer.
    ///
    /// An unknown tag returns [`GraspError::UnknownSelectionTag`] and leaves
    /// the machine in `AwaitingInput`, unless that answer used up the last
    /// allowed prompt, in which case the machine moves to `Aborted`.
    pub fn submit(&mut self, answer: &str) -> GraspResult<Selection> {
        if self.state != SelectorState::AwaitingInput {
            return Err(GraspError::InvalidInput("selection is not awaiting input"));
        }
        self.answers += 1;
        match Tag::parse(answer) {
            Ok(tag) => {
                let slot = self.slots[tag_slot(tag)];
                self.state = SelectorState::Selected(tag);
                Ok(slot)
            }
            Err(err) => {
                if self.max_prompts != 0 && self.answers >= self.max_prompts {
                    self.state = SelectorState::Aborted(AbortReason::PromptsExhausted);
                }
                Err(err)
            }
        }
    }

    /// Ends the selection without a choice.
    pub fn abort(&mut self, reason: AbortReason) {
        if !matches!(self.state, SelectorState::Selected(_)) {
            self.state = SelectorState::Aborted(reason);
        }
    }
}

fn tag_slot(tag: Tag) -> usize {
    match tag {
        Tag::Black => 0,
        Tag::Blue => 1,
        Tag::Red => 2,
        Tag::Green => 3,
    }
}

/// Drives the render/poll loop and the operator prompt.
#[derive(Clone, Debug, Default)]
pub struct Selector {
    cfg: SelectorConfig,
}

impl Selector {
    pub fn new(cfg: SelectorConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.cfg
    }

    /// Presents the top candidates and returns the one the operator picks.
    ///
    /// Fails with [`GraspError::InsufficientCandidates`] before touching the
    /// surface when fewer than [`SLOT_COUNT`] candidates are available. The
    /// surface is destroyed on every exit path once it has been created.
    pub fn run<S, I>(
        &self,
        grasps: &GraspSet,
        scene: &PointCloud,
        surface: &mut S,
        input: &mut I,
    ) -> GraspResult<Selection>
    where
        S: RenderSurface + ?Sized,
        I: SelectionInput + ?Sized,
    {
        let _span = trace_span!("select", candidates = grasps.len()).entered();
        let mut machine = SelectionMachine::new(grasps, self.cfg.max_prompts)?;

        let mut guard = SurfaceGuard::open(surface, self.cfg.window_width)?;
        for slot in machine.slots() {
            guard.add_geometry(Shape::Gripper {
                grasp: &slot.grasp,
                tag: slot.tag,
            })?;
        }
        guard.add_geometry(Shape::Cloud(scene))?;

        let mut rotated = false;
        let mut polls = 0usize;
        while machine.state() == SelectorState::Presenting {
            if !guard.poll_events() {
                machine.surface_closed();
                break;
            }
            if !rotated {
                guard.orbit(self.cfg.orbit.0, self.cfg.orbit.1);
                rotated = true;
            }
            guard.refresh();
            polls += 1;
            if self.cfg.max_polls.is_some_and(|max| polls >= max) {
                machine.abort(AbortReason::PollLimitReached);
            }
        }
        trace_event!("presentation_closed", polls = polls);

        let message = prompt_message(machine.slots());
        while machine.state() == SelectorState::AwaitingInput {
            let Some(answer) = input.prompt(&message)? else {
                machine.abort(AbortReason::InputClosed);
                break;
            };
            match machine.submit(&answer) {
                Ok(selection) => {
                    trace_event!("selected", rank = selection.rank, score = selection.grasp.score());
                    return Ok(selection);
                }
                Err(GraspError::UnknownSelectionTag(tag)) => {
                    trace_warn!("unknown selection tag {tag:?}, asking again");
                }
                Err(err) => return Err(err),
            }
        }

        match machine.state() {
            SelectorState::Aborted(reason) => Err(GraspError::SelectionAborted(reason)),
            _ => Err(GraspError::InvalidInput("selection ended in an unexpected state")),
        }
    }

    /// Shows only the chosen grasp, in its tag color, with the scene.
    ///
    /// Opens a fresh surface, orbits once and polls until the operator closes
    /// it. Reaching `max_polls` ends the preview early; that is not an error.
    pub fn confirm<S>(
        &self,
        selection: &Selection,
        scene: &PointCloud,
        surface: &mut S,
    ) -> GraspResult<()>
    where
        S: RenderSurface + ?Sized,
    {
        let _span = trace_span!("confirm", tag = selection.tag.as_str()).entered();
        let mut guard = SurfaceGuard::open(surface, self.cfg.window_width)?;
        guard.add_geometry(Shape::Gripper {
            grasp: &selection.grasp,
            tag: selection.tag,
        })?;
        guard.add_geometry(Shape::Cloud(scene))?;

        let mut polls = 0usize;
        while guard.poll_events() {
            if polls == 0 {
                guard.orbit(self.cfg.orbit.0, self.cfg.orbit.1);
            }
            guard.refresh();
            polls += 1;
            if self.cfg.max_polls.is_some_and(|max| polls >= max) {
                trace_warn!("confirmation preview left open after {polls} polls");
                break;
            }
        }
        trace_event!("confirmation_closed", polls = polls);
        Ok(())
    }
}

fn prompt_message(slots: &[TaggedGrasp; SLOT_COUNT]) -> String {
    let names: Vec<&str> = slots.iter().map(|s| s.tag.as_str()).collect();
    format!(
        "Type the color of the best grasp (case sensitive): {}",
        names.join(", ")
    )
}
