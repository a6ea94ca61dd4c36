//! Frame handoff between sensor callbacks and the grasp pipeline.
//!
//! [`FrameSlot`] is a single-slot channel: producers overwrite the pending
//! frame, the consumer takes the latest one. [`FrameCounter`] decides, through
//! a [`TriggerPolicy`], which incoming frame starts a new session.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct SlotState<T> {
    frame: Option<T>,
    published: u64,
    closed: bool,
}

/// Overwrite-latest single-slot channel with a readiness signal.
pub struct FrameSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                frame: None,
                published: 0,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Stores `frame`, replacing any frame not yet taken.
    ///
    /// Returns the total number of frames published so far.
    pub fn publish(&self, frame: T) -> u64 {
        let mut state = self.state.lock();
        state.frame = Some(frame);
        state.published += 1;
        let published = state.published;
        drop(state);
        self.ready.notify_one();
        published
    }

    /// Takes the pending frame without blocking.
    pub fn try_take(&self) -> Option<T> {
        self.state.lock().frame.take()
    }

    /// Waits up to `timeout` for a frame.
    ///
    /// Returns `None` on timeout, or once the slot is closed and empty.
    pub fn wait_take(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.ready.wait_for(&mut state, deadline - now);
        }
    }

    /// Wakes every waiter; later waits return immediately once empty.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    /// Total frames published, including overwritten ones.
    pub fn published(&self) -> u64 {
        self.state.lock().published
    }
}

/// Decides whether a frame count should start a session.
pub trait TriggerPolicy {
    fn should_trigger(&self, frame_count: u64) -> bool;
}

/// Triggers once `period` frames have arrived since the last trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EveryNthFrame {
    pub period: u64,
}

impl Default for EveryNthFrame {
    fn default() -> Self {
        Self { period: 6 }
    }
}

impl TriggerPolicy for EveryNthFrame {
    fn should_trigger(&self, frame_count: u64) -> bool {
        self.period > 0 && frame_count >= self.period
    }
}

/// Counts frames and resets whenever its policy triggers.
#[derive(Clone, Debug)]
pub struct FrameCounter<P> {
    policy: P,
    count: u64,
}

impl<P: TriggerPolicy> FrameCounter<P> {
    pub fn new(policy: P) -> Self {
        Self { policy, count: 0 }
    }

    /// Registers one frame; returns true if it should start a session.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.policy.should_trigger(self.count) {
            self.count = 0;
            return true;
        }
        false
    }

    /// Frames seen since the last trigger.
    pub fn count(&self) -> u64 {
        self.count
    }
}
