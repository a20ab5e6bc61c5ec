//! Cooperative frame scheduling
//!
//! The engine never owns an event loop. A host-provided [`FrameScheduler`]
//! stands in for whatever drives refresh in the embedding environment:
//! a windowing loop's redraw request, a browser frame callback, or a
//! headless harness in tests. The contract is that after `request_frame`
//! the host calls back into the engine exactly once (via
//! [`Chart::on_frame`](crate::chart::Chart::on_frame)) unless the request
//! is cancelled first.

use std::cell::RefCell;
use std::rc::Rc;

/// Identifier for one pending frame request.
pub type FrameHandle = u64;

/// Host-provided frame scheduling primitive.
pub trait FrameScheduler {
    /// Ask the host to deliver one frame at the next display refresh.
    fn request_frame(&mut self) -> FrameHandle;

    /// Revoke a pending request so the frame is never delivered.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Default)]
struct ManualState {
    next_handle: FrameHandle,
    pending: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
}

/// Scheduler for headless use: records requests instead of scheduling.
///
/// Cloning yields another handle to the same state, so a test can keep
/// one clone for inspection while the engine owns the other. The driver
/// drains pending handles with [`ManualScheduler::take_pending`] and
/// delivers each by calling the engine's frame entry point.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests not yet delivered or cancelled
    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Handles cancelled so far
    pub fn cancelled(&self) -> Vec<FrameHandle> {
        self.state.borrow().cancelled.clone()
    }

    /// Drain pending requests, marking them delivered.
    pub fn take_pending(&self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut state = self.state.borrow_mut();
        state.pending.retain(|&h| h != handle);
        state.cancelled.push(handle);
    }
}

/// Dirty flag plus the one outstanding frame request.
///
/// At most one request is ever pending; arming while armed is a no-op.
/// The owning chart calls [`begin_frame`](FrameLoop::begin_frame) when the
/// host delivers a frame and [`finish_frame`](FrameLoop::finish_frame)
/// after stepping, which re-arms only while something still animates.
pub struct FrameLoop {
    scheduler: Box<dyn FrameScheduler>,
    pending: Option<FrameHandle>,
    dirty: bool,
}

impl FrameLoop {
    pub fn new(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            pending: None,
            dirty: false,
        }
    }

    /// Note that the scene changed and make sure a frame is coming.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.arm();
    }

    /// Request a frame unless one is already pending.
    pub fn arm(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_frame());
        }
    }

    /// Called when the host delivers a frame. Returns whether the scene
    /// was marked dirty since the last frame and resets the flag.
    pub fn begin_frame(&mut self) -> bool {
        self.pending = None;
        std::mem::take(&mut self.dirty)
    }

    /// Called after the frame's work. Re-arms while animation continues
    /// or the scene was dirtied again mid-frame.
    pub fn finish_frame(&mut self, keep_running: bool) {
        if keep_running || self.dirty {
            self.arm();
        }
    }

    /// Cancel any outstanding request.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    /// Whether a frame request is outstanding
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the scene changed since the last delivered frame
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
