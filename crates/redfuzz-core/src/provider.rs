// Model Provider Trait
//
// Provider-agnostic interface to a remote model. Implementations handle
// provider-specific API calls and response parsing. Handles are registered
// into the engine's resource pool under a qualified "<provider>/<model>"
// key and leased exclusively by one worker at a time.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::ChatMessage;

/// A leased handle to a model provider
pub type ProviderHandle = Arc<dyn ModelProvider>;

/// Response from a model call
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
}

impl ProviderResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Trait for model providers
///
/// A provider wraps one stateful remote connection. `generate` runs a
/// single-prompt completion; `chat` runs a multi-turn conversation.
/// Either may legitimately produce no output (`Ok(None)`), which the
/// engine treats as a non-result distinct from an error.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Qualified key in the form "<provider>/<model>"
    fn qualified_name(&self) -> &str;

    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<Option<ProviderResponse>>;

    /// Generate a completion for a multi-turn conversation
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Option<ProviderResponse>>;

    /// Release underlying connections
    async fn close(&self) -> Result<()>;
}

/// Split a qualified "<provider>/<model>" key into its parts
pub fn split_qualified_name(qualified: &str) -> Result<(&str, &str)> {
    qualified.split_once('/').ok_or_else(|| {
        crate::error::FuzzError::config(format!(
            "model key {qualified:?} not in provider/model format"
        ))
    })
}
