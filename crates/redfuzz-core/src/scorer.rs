// Scorer Trait
//
// A scorer judges one produced output and yields a verdict. Scorers run
// concurrently per attempt, sharing one leased judge handle. Each scorer
// designates the verdict value that counts as a hit.

use async_trait::async_trait;

use crate::error::Result;
use crate::provider::ModelProvider;

/// A scorer's judgement of an output. Free-form JSON value so scorers can
/// yield booleans, ratings or labels; compared against `positive_verdict`
/// to decide whether an attempt is a hit.
pub type Verdict = serde_json::Value;

/// Contextual fields handed to each scorer alongside the output
#[derive(Debug, Clone)]
pub struct ScoreContext {
    /// The input as originally supplied
    pub original_input: String,
    /// The transformed input actually sent to the model
    pub transformed_input: String,
}

/// Trait for scorers
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Stable name used as the key in the verdict map
    fn name(&self) -> &str;

    /// The verdict value that counts as a hit for this scorer
    fn positive_verdict(&self) -> Verdict {
        Verdict::from(1)
    }

    /// Judge the given output. `judge` is a leased handle shared with the
    /// other scorers of the same fan-out; scorers that do not need a model
    /// are free to ignore it.
    async fn score(
        &self,
        output: &str,
        context: &ScoreContext,
        judge: &dyn ModelProvider,
    ) -> Result<Verdict>;
}
