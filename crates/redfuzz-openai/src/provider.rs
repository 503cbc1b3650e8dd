// OpenAI Provider Implementation
//
// Implements the ModelProvider trait from redfuzz-core over OpenAI's
// chat completions API. Requests are non-streaming; an attempt only
// needs the final completion text.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use redfuzz_core::{
    ChatMessage, FuzzError, ModelProvider, ProviderResponse, Result,
};

use crate::types::{ChatRequest, ChatResponse, WireMessage};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completions provider
///
/// One instance wraps one model; register several instances to pool
/// concurrent handles for the same model key.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    qualified_name: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiProvider {
    /// Create a provider with an explicit API key
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: OPENAI_API_URL.to_string(),
            qualified_name: format!("openai/{model}"),
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Create a provider from the OPENAI_API_KEY environment variable
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            FuzzError::config("OPENAI_API_KEY environment variable not set")
        })?;
        Ok(Self::new(api_key, model))
    }

    /// Point the provider at an OpenAI-compatible endpoint
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the completion length
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Endpoint the provider posts to
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn chat_completion(
        &self,
        messages: Vec<WireMessage>,
    ) -> Result<Option<ProviderResponse>> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| FuzzError::provider(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FuzzError::provider(format!(
                "API request failed with status {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| FuzzError::provider(format!("malformed response: {e}")))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "completion finished"
            );
        }

        // An empty choice list or empty content is a non-result, not an
        // error; the engine skips the attempt without requeueing it.
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty());

        Ok(text.map(ProviderResponse::new))
    }
}

// The API key must never reach logs.
impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    async fn generate(&self, prompt: &str) -> Result<Option<ProviderResponse>> {
        self.chat_completion(vec![WireMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }])
        .await
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<Option<ProviderResponse>> {
        let wire = messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();
        self.chat_completion(wire).await
    }

    async fn close(&self) -> Result<()> {
        // reqwest::Client releases its connections on drop
        Ok(())
    }
}
