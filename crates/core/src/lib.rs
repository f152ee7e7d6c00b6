//! Jacport domain types and pure conversion rules.
//!
//! Everything in this crate is free of I/O so that the registry, the
//! pipeline and the HTTP layer all agree on the same vocabulary.

pub mod conversion;
pub mod error;
pub mod event;
pub mod plan;
pub mod preview;
pub mod role;
pub mod types;
