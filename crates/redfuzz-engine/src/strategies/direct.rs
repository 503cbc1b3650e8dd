// Direct strategy - sends the input as is.

use async_trait::async_trait;
use tracing::debug;

use redfuzz_core::{AttemptParams, AttemptResult, Result};

use crate::strategy::{AttackStrategy, AttemptContext, StrategyMode};

/// Baseline strategy: the input is sent to the target unchanged.
pub struct DirectStrategy;

impl DirectStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DirectStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttackStrategy for DirectStrategy {
    fn mode(&self) -> StrategyMode {
        StrategyMode::Direct
    }

    async fn perform_attempt(
        &self,
        params: &AttemptParams,
        ctx: &AttemptContext<'_>,
    ) -> Result<Option<AttemptResult>> {
        let lease = ctx.lease_target().await?;
        let response = lease.generate(&params.input).await?;
        debug!(
            input = %params.input,
            got_output = response.is_some(),
            "direct attempt finished"
        );

        Ok(response
            .map(|r| AttemptResult::new(&params.input, &params.input, r.text)))
    }
}
