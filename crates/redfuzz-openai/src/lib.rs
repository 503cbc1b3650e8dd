// OpenAI Provider Crate
//
// This crate provides an OpenAI-compatible ModelProvider implementation.
// The chat completions protocol is the de facto base format for hosted
// and local model servers, so one provider covers OpenAI itself as well
// as Ollama/vLLM style endpoints via `with_base_url`.

mod provider;
mod types;

#[cfg(test)]
mod tests;

pub use provider::OpenAiProvider;
pub use types::{ChatRequest, ChatResponse, WireMessage};

// Re-export the core trait for convenience
pub use redfuzz_core::ModelProvider;
