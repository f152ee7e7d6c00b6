//! Per-job event channel backed by `tokio::sync::mpsc::unbounded_channel`.
//!
//! Producers never block. A single [`Subscription`] at a time owns the
//! receiving half; a new subscription can be taken once the previous one is
//! dropped (e.g. after a client reconnects). Missed events are not replayed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jacport_core::event::{CompleteData, JobEvent, ProgressData};
use jacport_core::types::{JobId, Stage};
use tokio::sync::{mpsc, Mutex as AsyncMutex, OwnedMutexGuard};

// ---------------------------------------------------------------------------
// EventChannel
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EmitState {
    last_pct: u8,
    terminated: bool,
}

/// Ordered event queue for one job.
///
/// Enforces the stream protocol on the producer side: progress percentages
/// never go backwards, and once a terminal event has been queued every
/// further event is dropped.
#[derive(Debug)]
pub struct EventChannel {
    sender: mpsc::UnboundedSender<JobEvent>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<JobEvent>>>,
    state: Mutex<EmitState>,
}

impl EventChannel {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
            state: Mutex::new(EmitState::default()),
        }
    }

    /// Queue an event. Returns `false` if it was dropped because the job
    /// already emitted its terminal event.
    pub fn send(&self, mut event: JobEvent) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.terminated {
            tracing::debug!(event = event.name(), "Dropping event emitted after terminal event");
            return false;
        }

        match &mut event {
            JobEvent::Progress(data) => {
                data.pct = data.pct.clamp(state.last_pct, 100);
                state.last_pct = data.pct;
            }
            JobEvent::Complete(_) | JobEvent::Error(_) => state.terminated = true,
        }

        // The channel owns its receiver, so the send cannot fail while `self` lives.
        let _ = self.sender.send(event);
        true
    }

    /// Whether a terminal event has been queued.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).terminated
    }

    /// Take the consumer side, or `None` if another subscription holds it.
    pub fn subscribe(&self) -> Option<Subscription> {
        let receiver = Arc::clone(&self.receiver).try_lock_owned().ok()?;
        Some(Subscription { receiver })
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Outcome of waiting for the next event.
#[derive(Debug, Clone, PartialEq)]
pub enum Next {
    Event(JobEvent),
    /// Nothing arrived within the wait window.
    Idle,
    /// The producer side is gone and the queue is drained.
    Closed,
}

/// Exclusive consumer handle for an [`EventChannel`].
pub struct Subscription {
    receiver: OwnedMutexGuard<mpsc::UnboundedReceiver<JobEvent>>,
}

impl Subscription {
    /// Wait up to `idle` for the next event.
    pub async fn next(&mut self, idle: Duration) -> Next {
        match tokio::time::timeout(idle, self.receiver.recv()).await {
            Ok(Some(event)) => Next::Event(event),
            Ok(None) => Next::Closed,
            Err(_) => Next::Idle,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

// ---------------------------------------------------------------------------
// JobEmitter
// ---------------------------------------------------------------------------

/// Producer handle for one job, cheaply cloneable.
#[derive(Debug, Clone)]
pub struct JobEmitter {
    job_id: JobId,
    channel: Arc<EventChannel>,
}

impl JobEmitter {
    pub fn new(job_id: JobId, channel: Arc<EventChannel>) -> Self {
        Self { job_id, channel }
    }

    pub fn emit(&self, event: JobEvent) -> bool {
        let name = event.name();
        let queued = self.channel.send(event);
        if !queued {
            tracing::warn!(job_id = %self.job_id, event = name, "Job already finished, event dropped");
        }
        queued
    }

    /// Emit a simple status line for `step`.
    pub fn status(&self, step: Stage, pct: u8, message: impl Into<String>) {
        self.emit(JobEvent::progress(step, pct, message));
    }

    pub fn progress(&self, data: ProgressData) {
        self.emit(JobEvent::Progress(data));
    }

    pub fn complete(&self, data: CompleteData) {
        self.emit(JobEvent::Complete(data));
    }

    /// Emit the non-recoverable terminal error.
    pub fn fail(&self, message: impl Into<String>) {
        self.emit(JobEvent::fatal(message));
    }

    pub fn is_terminated(&self) -> bool {
        self.channel.is_terminated()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
