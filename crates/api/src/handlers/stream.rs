//! Server-sent event relay for a job's progress.
//!
//! ```text
//! wait for registration --(timeout)--> error "Job not found", close
//!        |
//!   subscribe --(held elsewhere)--> error "Stream already open", close
//!        |
//!   relay events, ": ping" on idle, close after complete/error
//! ```
//!
//! Closing the connection never affects the pipeline run.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderName;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use futures::stream::{self, Stream};
use jacport_core::event::{JobEvent, EVENT_ERROR};
use jacport_core::types::JobId;
use jacport_events::{JobRegistry, Next, Subscription};
use serde_json::json;

use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

const JOB_NOT_FOUND: &str = "Job not found";
const STREAM_IN_USE: &str = "Stream already open for this job";
const JOB_FINISHED: &str = "Job already finished";

/// GET /api/stream/{job_id}
pub async fn stream_progress(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> impl IntoResponse {
    tracing::debug!(job_id = %job_id, "Stream opened");

    let relay = Relay::Waiting {
        registry: Arc::clone(&state.registry),
        job_id,
        max_wait: state.config.stream_wait(),
        keepalive: state.config.keepalive(),
    };

    (
        [(CACHE_CONTROL, "no-cache"), (X_ACCEL_BUFFERING, "no")],
        Sse::new(frames(relay)),
    )
}

// ---------------------------------------------------------------------------
// Relay state machine
// ---------------------------------------------------------------------------

enum Relay {
    Waiting {
        registry: Arc<JobRegistry>,
        job_id: JobId,
        max_wait: Duration,
        keepalive: Duration,
    },
    Relaying {
        job_id: JobId,
        subscription: Subscription,
        keepalive: Duration,
    },
    Done,
}

fn frames(relay: Relay) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream::unfold(relay, |relay| async move {
        let (frame, next) = step(relay).await?;
        Some((Ok(frame), next))
    })
}

/// Produce the next frame and the state after it, or `None` to close.
async fn step(relay: Relay) -> Option<(Event, Relay)> {
    match relay {
        Relay::Waiting {
            registry,
            job_id,
            max_wait,
            keepalive,
        } => {
            let Some(channel) = registry.wait_for_channel(&job_id, max_wait).await else {
                tracing::warn!(job_id = %job_id, "Stream gave up waiting for job");
                return Some((notice(JOB_NOT_FOUND), Relay::Done));
            };
            let Some(subscription) = channel.subscribe() else {
                tracing::warn!(job_id = %job_id, "Second concurrent stream rejected");
                return Some((notice(STREAM_IN_USE), Relay::Done));
            };
            if channel.is_terminated() && subscription.is_empty() {
                return Some((notice(JOB_FINISHED), Relay::Done));
            }
            relay_next(job_id, subscription, keepalive).await
        }
        Relay::Relaying {
            job_id,
            subscription,
            keepalive,
        } => relay_next(job_id, subscription, keepalive).await,
        Relay::Done => None,
    }
}

async fn relay_next(
    job_id: JobId,
    mut subscription: Subscription,
    keepalive: Duration,
) -> Option<(Event, Relay)> {
    match subscription.next(keepalive).await {
        Next::Event(event) => {
            let frame = event_frame(&event);
            if event.is_terminal() {
                tracing::debug!(job_id = %job_id, event = event.name(), "Stream finished");
                return Some((frame, Relay::Done));
            }
            Some((
                frame,
                Relay::Relaying {
                    job_id,
                    subscription,
                    keepalive,
                },
            ))
        }
        Next::Idle => Some((
            Event::default().comment("ping"),
            Relay::Relaying {
                job_id,
                subscription,
                keepalive,
            },
        )),
        Next::Closed => {
            tracing::debug!(job_id = %job_id, "Event channel closed");
            None
        }
    }
}

fn event_frame(event: &JobEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.data().to_string())
}

/// Informational error frame for transport problems; not a job event.
fn notice(message: &str) -> Event {
    Event::default()
        .event(EVENT_ERROR)
        .data(json!({ "message": message }).to_string())
}
