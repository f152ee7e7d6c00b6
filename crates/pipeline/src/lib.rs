//! Jacport conversion pipeline.
//!
//! [`Pipeline`] runs the six stages of a conversion job (fetch, analyze,
//! plan, convert, assemble, complete) and reports progress through the
//! job's [`JobEmitter`](jacport_events::JobEmitter). Per-file and auxiliary
//! failures degrade to deterministic fallbacks; only source failures,
//! archive failures and stage timeouts end a run early.

pub mod archive;
pub mod config;
pub mod convert;
pub mod error;
pub mod orchestrator;
pub mod prompts;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::{ConversionJob, Pipeline};
