//! Buffer and window deadlines for the live session.
//!
//! Each deadline is a sleeping task that reports back on a channel instead of
//! calling into the session, so the session is only ever touched by its owner.
//! A firing carries the id of the timer that produced it; firings from a timer
//! that has since been restarted or cancelled are recognised and dropped.

use crate::session::TimerKind;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// A deadline elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub id: u64,
}

#[derive(Debug)]
struct PendingTimer {
    id: u64,
    task: JoinHandle<()>,
}

#[derive(Debug)]
pub struct SessionTimers {
    buffer_duration: Duration,
    window_duration: Duration,
    buffer: Option<PendingTimer>,
    window: Option<PendingTimer>,
    next_id: u64,
    fired_tx: mpsc::UnboundedSender<TimerFired>,
}

impl SessionTimers {
    pub fn new(
        buffer_duration: Duration,
        window_duration: Duration,
        fired_tx: mpsc::UnboundedSender<TimerFired>,
    ) -> Self {
        Self {
            buffer_duration,
            window_duration,
            buffer: None,
            window: None,
            next_id: 0,
            fired_tx,
        }
    }

    pub fn duration(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::Buffer => self.buffer_duration,
            TimerKind::Window => self.window_duration,
        }
    }

    /// (Re)starts the deadline of `kind`, cancelling any earlier one.
    pub fn start(&mut self, kind: TimerKind) {
        self.cancel(kind);
        self.next_id += 1;
        let id = self.next_id;
        let duration = self.duration(kind);
        let tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if tx.send(TimerFired { kind, id }).is_err() {
                trace!(?kind, "timer receiver dropped");
            }
        });
        trace!(?kind, id, ?duration, "timer started");
        *self.slot(kind) = Some(PendingTimer { id, task });
    }

    /// Cancels the deadline of `kind` if one is pending.
    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(timer) = self.slot(kind).take() {
            timer.task.abort();
            trace!(?kind, id = timer.id, "timer cancelled");
        }
    }

    pub fn cancel_all(&mut self) {
        self.cancel(TimerKind::Buffer);
        self.cancel(TimerKind::Window);
    }

    /// Pending means started and not yet consumed or cancelled. A timer whose
    /// firing is still queued counts as pending.
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Buffer => self.buffer.is_some(),
            TimerKind::Window => self.window.is_some(),
        }
    }

    /// Accepts a firing if it belongs to the live timer of its kind, clearing
    /// that timer. Returns false for stale firings.
    pub fn consume(&mut self, fired: TimerFired) -> bool {
        let slot = self.slot(fired.kind);
        if slot.as_ref().is_some_and(|timer| timer.id == fired.id) {
            *slot = None;
            return true;
        }
        trace!(kind = ?fired.kind, id = fired.id, "stale timer firing dropped");
        false
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<PendingTimer> {
        match kind {
            TimerKind::Buffer => &mut self.buffer,
            TimerKind::Window => &mut self.window,
        }
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
