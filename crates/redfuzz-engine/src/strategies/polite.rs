// Polite strategy - adds "please" to the beginning and end of the input.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use redfuzz_core::{AttemptParams, AttemptResult, Result};

use crate::strategy::{AttackStrategy, AttemptContext, StrategyMode, StrategyOptions};

/// Options for the polite strategy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoliteOptions {
    /// Add "Please" before the input
    pub add_prefix: bool,
    /// Add ", please" after the input
    pub add_suffix: bool,
}

impl Default for PoliteOptions {
    fn default() -> Self {
        Self {
            add_prefix: true,
            add_suffix: true,
        }
    }
}

/// Wraps the input in a polite request before sending it.
pub struct PoliteStrategy {
    options: PoliteOptions,
}

impl PoliteStrategy {
    pub fn new(options: PoliteOptions) -> Self {
        Self { options }
    }

    /// Build from an open options map; unknown fields are ignored,
    /// missing fields fall back to their defaults.
    pub fn from_options(options: &StrategyOptions) -> Result<Self> {
        let options: PoliteOptions =
            serde_json::from_value(serde_json::Value::Object(options.clone()))
                .map_err(|e| redfuzz_core::FuzzError::config(format!("invalid polite options: {e}")))?;
        Ok(Self::new(options))
    }

    fn transform(&self, input: &str) -> String {
        let mut transformed = input.to_string();
        if self.options.add_prefix {
            transformed = format!("Please {transformed}");
        }
        if self.options.add_suffix {
            transformed.push_str(", please");
        }
        transformed
    }
}

#[async_trait]
impl AttackStrategy for PoliteStrategy {
    fn mode(&self) -> StrategyMode {
        StrategyMode::Polite
    }

    async fn perform_attempt(
        &self,
        params: &AttemptParams,
        ctx: &AttemptContext<'_>,
    ) -> Result<Option<AttemptResult>> {
        if !self.options.add_prefix && !self.options.add_suffix {
            warn!("add_prefix and add_suffix are both false, nothing will be added to the input");
        }

        let transformed = self.transform(&params.input);

        let lease = ctx.lease_target().await?;
        let response = lease.generate(&transformed).await?;
        debug!(
            input = %params.input,
            got_output = response.is_some(),
            "polite attempt finished"
        );

        Ok(response.map(|r| AttemptResult::new(&params.input, transformed, r.text)))
    }
}
