//! Jacport job registry and per-job event channels.
//!
//! - [`JobRegistry`]: process-wide map of job id to job state, with lazy
//!   TTL eviction and a readiness signal for streams that open early.
//! - [`EventChannel`]: unbounded, ordered, single-consumer queue of
//!   [`JobEvent`](jacport_core::event::JobEvent)s for one job.
//! - [`JobEmitter`]: producer handle used by the pipeline.

pub mod channel;
pub mod registry;

pub use channel::{EventChannel, JobEmitter, Next, Subscription};
pub use registry::JobRegistry;
