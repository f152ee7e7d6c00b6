//! Text-generation gateway.
//!
//! - [`TextGenerator`]: the seam over an external completion provider.
//! - [`AnthropicClient`]: provider implementation for the Anthropic
//!   Messages API.
//! - [`Gateway`]: process-wide admission control, at most N calls in
//!   flight across every job and stage.

pub mod anthropic;
pub mod error;
pub mod gateway;
pub mod generator;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayConfig};
pub use generator::{CompletionRequest, TextGenerator};
