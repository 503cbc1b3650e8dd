// Redfuzz Core Abstractions
//
// This crate provides the runtime abstractions shared by the fuzzing
// engine and the provider crates.
//
// Key design decisions:
// - Uses traits (ModelProvider, Scorer) for pluggable backends
// - Provider crates depend on core and register handles at startup;
//   core has no knowledge of specific provider implementations
// - The attempt data model is serde round-trippable so completed work
//   can be checkpointed as JSONL lines
// - Error handling distinguishes run-fatal errors (checkpoint I/O) from
//   attempt-level errors that the engine retries

pub mod attempt;
pub mod error;
pub mod message;
pub mod provider;
pub mod scorer;

// Re-exports for convenience
pub use attempt::{AttemptParams, AttemptResult};
pub use error::{FuzzError, Result};
pub use message::{ChatMessage, ChatRole};
pub use provider::{split_qualified_name, ModelProvider, ProviderHandle, ProviderResponse};
pub use scorer::{ScoreContext, Scorer, Verdict};
