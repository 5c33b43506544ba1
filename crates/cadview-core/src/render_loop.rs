//! Frame scheduling
//!
//! The render loop is a self-rescheduling task: every frame it runs, it asks
//! the scheduler for the next one. The token of the pending request is the
//! single cancellation point; stopping the loop cancels it, and any frame
//! that arrives with a different token is ignored.

use std::f64::consts::TAU;
use tracing::debug;

/// Handle for one requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Source of display-refresh callbacks
pub trait FrameScheduler {
    /// Ask for one callback on the next display refresh
    fn request_frame(&mut self) -> FrameToken;
    /// Withdraw a previously requested callback
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Loop bookkeeping: the pending request and the idle rotation angle
#[derive(Debug, Clone)]
pub struct RenderLoop {
    pending: Option<FrameToken>,
    frames: u64,
    /// Total idle rotation in radians
    idle_angle: f64,
    idle_step: f64,
}

impl RenderLoop {
    pub fn new(idle_step: f32) -> Self {
        Self {
            pending: None,
            frames: 0,
            idle_angle: 0.0,
            idle_step: f64::from(idle_step),
        }
    }

    /// Request the first frame; no-op if already running
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.pending.is_none() {
            let token = scheduler.request_frame();
            debug!(token = token.0, "Render loop started");
            self.pending = Some(token);
        }
    }

    /// Cancel the pending frame. Returns false if the loop was not running.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) -> bool {
        match self.pending.take() {
            Some(token) => {
                scheduler.cancel_frame(token);
                debug!(token = token.0, frames = self.frames, "Render loop stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Claim a delivered frame. True only for the currently pending token.
    pub fn accept(&mut self, token: FrameToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            self.frames += 1;
            true
        } else {
            false
        }
    }

    /// Schedule the next frame after a tick
    pub fn reschedule(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.pending.is_none() {
            self.pending = Some(scheduler.request_frame());
        }
    }

    /// Advance the idle rotation by one step and return the yaw to display,
    /// wrapped into `[0, TAU)`
    pub fn advance_idle_rotation(&mut self) -> f32 {
        self.idle_angle += self.idle_step;
        self.idle_angle.rem_euclid(TAU) as f32
    }

    /// Total rotation since the loop was created
    pub fn idle_angle(&self) -> f64 {
        self.idle_angle
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Scheduler that queues requests until the host's frame callback drains them.
///
/// The host calls [`FrameQueue::take_due`] once per display refresh and
/// hands the token to the session.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next_id: u64,
    pending: Option<FrameToken>,
    cancelled: u64,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token due on this refresh, if any
    pub fn take_due(&mut self) -> Option<FrameToken> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameToken {
        self.next_id += 1;
        let token = FrameToken(self.next_id);
        self.pending = Some(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.pending == Some(token) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}
