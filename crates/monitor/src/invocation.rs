//! Per-thread stack of in-flight frames.

use crate::frame::Frame;
use crate::report::InvocationReport;
use crate::thread::ThreadIdentity;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tundra_domain::elapsed_between;
use tundra_ports::SnapshotCodable;

/// The call stack of one thread.
///
/// Only the owning thread pushes and pops; reporting threads read the stack
/// concurrently. The front of the deque is the innermost call.
#[derive(Debug)]
pub struct Invocation {
    thread: ThreadIdentity,
    frames: Mutex<VecDeque<Arc<Frame>>>,
}

impl Invocation {
    /// Empty stack owned by `thread`.
    #[must_use]
    pub fn new(thread: ThreadIdentity) -> Self {
        Self {
            thread,
            frames: Mutex::new(VecDeque::new()),
        }
    }

    /// Owning thread.
    #[must_use]
    pub const fn thread(&self) -> &ThreadIdentity {
        &self.thread
    }

    /// Push a frame for a call that just started.
    pub fn push(&self, frame: Arc<Frame>) {
        self.frames.lock().push_front(frame);
    }

    /// Pop `frame`, returning false if it is not on this stack.
    ///
    /// The frame is normally on top. If an unwinding caller skipped a pop, the
    /// frame is removed from wherever it sits so the stack stays consistent.
    pub fn pop(&self, frame: &Arc<Frame>) -> bool {
        let mut frames = self.frames.lock();
        let Some(position) = frames.iter().position(|held| Arc::ptr_eq(held, frame)) else {
            return false;
        };
        frames.remove(position).is_some()
    }

    /// Number of frames on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    /// True when no call is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Start of the outermost call; the ordering key for reports.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.frames.lock().back().map(|frame| frame.started_at())
    }

    /// Frames innermost first.
    #[must_use]
    pub fn frames(&self) -> Vec<Arc<Frame>> {
        self.frames.lock().iter().cloned().collect()
    }

    /// Report this stack relative to `now`, or `None` if it is empty.
    ///
    /// The frames are copied out before rendering so the owning thread is
    /// never blocked on HTML generation.
    pub fn report_at(&self, now: DateTime<Utc>) -> Option<InvocationReport> {
        let frames = self.frames();
        let started_at = frames.last()?.started_at();
        let callstack: Vec<_> = frames.iter().map(|frame| frame.report_at(now)).collect();

        Some(InvocationReport {
            thread_id: self.thread.number(),
            thread_name: self.thread.name().to_owned(),
            started_at,
            elapsed: elapsed_between(started_at, now),
            callstack_length: callstack.len(),
            callstack,
        })
    }
}

impl SnapshotCodable for Invocation {
    type Snapshot = Option<InvocationReport>;
    const KIND: &'static str = "invocation";

    fn snapshot(&self) -> Option<InvocationReport> {
        self.report_at(Utc::now())
    }
}
