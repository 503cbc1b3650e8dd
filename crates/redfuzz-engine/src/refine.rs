// Refinement loop
//
// Triggered only when classification reports a hit. Builds a running
// conversation from the successful transformed input and its output,
// then repeatedly asks the model to elaborate, collecting each reply.
// A missing reply aborts the loop; the original attempt stays recorded,
// it just carries no refinement metadata.

use tracing::debug;

use redfuzz_core::{ChatMessage, FuzzError, ModelProvider, Result};

const IMPROVE_PROMPT: &str = "Be more specific about each step";

/// Iterative elaboration of a successful attempt's response.
pub struct RefinementHandler {
    attempts: usize,
}

impl RefinementHandler {
    /// Create a handler with the given attempt budget
    pub fn new(attempts: usize) -> Self {
        Self { attempts }
    }

    /// Ask the model to elaborate on `response` up to the configured
    /// number of times, returning every follow-up reply.
    pub async fn refine(
        &self,
        model: &dyn ModelProvider,
        transformed_input: &str,
        response: &str,
    ) -> Result<Vec<String>> {
        let mut conversation = vec![
            ChatMessage::user(transformed_input),
            ChatMessage::assistant(response),
        ];
        let mut refined = Vec::new();

        debug!(attempts = self.attempts, "refining response");
        for _ in 0..self.attempts {
            conversation.push(ChatMessage::user(IMPROVE_PROMPT));
            let reply = model
                .chat(&conversation)
                .await?
                .filter(|r| !r.text.is_empty())
                .ok_or_else(|| {
                    FuzzError::refinement("cannot refine response, got no reply from the model")
                })?;
            refined.push(reply.text.clone());
            conversation.push(ChatMessage::assistant(reply.text));
        }

        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use redfuzz_core::ProviderResponse;

    /// Replies with a scripted sequence, recording each conversation seen.
    struct ScriptedChat {
        replies: Mutex<Vec<Option<String>>>,
        seen_lengths: Mutex<Vec<usize>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<Option<&str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies.into_iter().rev().map(|r| r.map(String::from)).collect(),
                ),
                seen_lengths: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl redfuzz_core::ModelProvider for ScriptedChat {
        fn qualified_name(&self) -> &str {
            "test/scripted"
        }

        async fn generate(&self, _prompt: &str) -> Result<Option<ProviderResponse>> {
            unreachable!("refinement only chats")
        }

        async fn chat(&self, messages: &[ChatMessage]) -> Result<Option<ProviderResponse>> {
            self.seen_lengths.lock().push(messages.len());
            Ok(self.replies.lock().pop().flatten().map(ProviderResponse::new))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_refine_collects_each_reply() {
        let model = ScriptedChat::new(vec![Some("more detail"), Some("even more")]);
        let handler = RefinementHandler::new(2);

        let refined = handler.refine(model.as_ref(), "prompt", "response").await.unwrap();
        assert_eq!(refined, vec!["more detail", "even more"]);

        // Conversation grows by two turns per round: seed (2) + follow-up,
        // then + reply + follow-up
        assert_eq!(*model.seen_lengths.lock(), vec![3, 5]);
    }

    #[tokio::test]
    async fn test_refine_aborts_on_missing_reply() {
        let model = ScriptedChat::new(vec![Some("more detail"), None]);
        let handler = RefinementHandler::new(3);

        let err = handler
            .refine(model.as_ref(), "prompt", "response")
            .await
            .unwrap_err();
        assert!(matches!(err, FuzzError::Refinement(_)));
    }

    #[tokio::test]
    async fn test_zero_budget_refines_nothing() {
        let model = ScriptedChat::new(vec![]);
        let handler = RefinementHandler::new(0);

        let refined = handler.refine(model.as_ref(), "prompt", "response").await.unwrap();
        assert!(refined.is_empty());
        assert!(model.seen_lengths.lock().is_empty());
    }
}
