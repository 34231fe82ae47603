//! Draw scheduling.
//!
//! Every redraw becomes a [`DrawJob`]. Immediate jobs start right away and settle any pass
//! still animating. Serialized jobs (harm insertions, which arrive in bursts when several
//! stakeholders finish generating together) wait in a FIFO and start only once the
//! running pass has settled, so one animated pass runs at a time and each starts from
//! settled previous positions.
//!
//! Callers get a [`DrawHandle`] future that resolves when their pass settles. Awaiting it
//! is optional; nothing in the engine blocks on it.

use envision_core::NodeId;
use envision_render::PassEnd;
use futures::channel::oneshot;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Resolves with the pass summary once the draw has settled, or `None` when the draw was
/// dropped (its trigger vanished or the session restarted).
#[derive(Debug)]
#[must_use = "a DrawHandle does nothing unless awaited or dropped"]
pub struct DrawHandle {
    rx: oneshot::Receiver<PassEnd>,
}

impl DrawHandle {
    pub(crate) fn pair() -> (oneshot::Sender<PassEnd>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Non-blocking check; `Some(None)` means the draw was dropped.
    pub fn try_take(&mut self) -> Option<Option<PassEnd>> {
        match self.rx.try_recv() {
            Ok(Some(end)) => Some(Some(end)),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(None),
        }
    }
}

impl Future for DrawHandle {
    type Output = Option<PassEnd>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// State change applied when the job starts, just before layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DrawAction {
    Redraw,
    ShowChildren(NodeId),
}

/// Work that depends on the job's pass having settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FollowUp {
    GenerateChildren(NodeId),
    SwapContent(NodeId),
}

#[derive(Debug)]
pub(crate) struct DrawJob {
    pub(crate) trigger: NodeId,
    pub(crate) action: DrawAction,
    pub(crate) follow_up: Option<FollowUp>,
    pub(crate) done: Option<oneshot::Sender<PassEnd>>,
}

impl DrawJob {
    pub(crate) fn new(trigger: NodeId, action: DrawAction) -> (Self, DrawHandle) {
        let (tx, handle) = DrawHandle::pair();
        (
            Self {
                trigger,
                action,
                follow_up: None,
                done: Some(tx),
            },
            handle,
        )
    }

    pub(crate) fn then(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct DrawScheduler {
    running: Option<DrawJob>,
    queue: VecDeque<DrawJob>,
    idle_waiters: Vec<oneshot::Sender<PassEnd>>,
    last_end: Option<PassEnd>,
}

impl DrawScheduler {
    pub(crate) fn is_idle(&self) -> bool {
        self.running.is_none() && self.queue.is_empty()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    /// True when a serialized job must wait for its turn.
    pub(crate) fn must_wait(&self) -> bool {
        !self.is_idle()
    }

    pub(crate) fn enqueue(&mut self, job: DrawJob) {
        tracing::debug!(trigger = %job.trigger, queued = self.queue.len() + 1, "draw queued");
        self.queue.push_back(job);
    }

    pub(crate) fn next_queued(&mut self) -> Option<DrawJob> {
        self.queue.pop_front()
    }

    pub(crate) fn set_running(&mut self, job: DrawJob) {
        self.running = Some(job);
    }

    /// Resolves the running job's handle and returns its follow-up.
    pub(crate) fn finish_running(&mut self, end: PassEnd) -> Option<FollowUp> {
        let job = self.running.take()?;
        if let Some(done) = job.done {
            let _ = done.send(end.clone());
        }
        self.last_end = Some(end);
        job.follow_up
    }

    /// Hands out a handle that resolves the next time the scheduler runs dry.
    pub(crate) fn when_idle(&mut self) -> DrawHandle {
        let (tx, handle) = DrawHandle::pair();
        match (&self.last_end, self.is_idle()) {
            (Some(end), true) => {
                let _ = tx.send(end.clone());
            }
            (None, true) => drop(tx),
            _ => self.idle_waiters.push(tx),
        }
        handle
    }

    /// Called once nothing is running or queued.
    pub(crate) fn notify_idle(&mut self) {
        if let Some(end) = &self.last_end {
            for tx in self.idle_waiters.drain(..) {
                let _ = tx.send(end.clone());
            }
        }
    }

    /// Drops every job; their handles resolve to `None`.
    pub(crate) fn clear(&mut self) {
        self.running = None;
        self.queue.clear();
        self.idle_waiters.clear();
        self.last_end = None;
    }
}
