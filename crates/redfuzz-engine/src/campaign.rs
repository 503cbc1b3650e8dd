// Campaign orchestrator
//
// Run-level entry point: registers provider handles and scorers, crosses
// target models with strategy modes, and aggregates the raw summaries
// into a report. A fresh resource pool is built per run from the
// registered handles and torn down with it.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use redfuzz_core::{split_qualified_name, ProviderHandle, Result, Scorer};

use crate::config::{CompletionPolicy, EngineConfig};
use crate::executor::{AttemptExecutor, RunSummary};
use crate::pool::ResourcePool;
use crate::report::CampaignReport;
use crate::strategy::{StrategyMode, StrategyOptions, StrategyRegistry};

/// Correlates a run to its checkpoint files
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRun {
    /// Execution id; supplied externally to resume a prior run or
    /// generated fresh
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub policy: CompletionPolicy,
    /// Qualified keys of the registered handles
    pub resource_keys: Vec<String>,
}

/// Top-level fuzzing campaign.
pub struct Campaign {
    providers: Vec<ProviderHandle>,
    scorers: Vec<Arc<dyn Scorer>>,
    registry: StrategyRegistry,
    strategy_options: StrategyOptions,
    config: EngineConfig,
    execution_id: String,
    started_at: DateTime<Utc>,
}

impl Campaign {
    /// Create a campaign with a fresh execution id
    pub fn new(config: EngineConfig) -> Self {
        let execution_id = Uuid::new_v4().to_string();
        info!(%execution_id, "initiating campaign");
        Self {
            providers: Vec::new(),
            scorers: Vec::new(),
            registry: StrategyRegistry::with_builtins(),
            strategy_options: StrategyOptions::new(),
            config,
            execution_id,
            started_at: Utc::now(),
        }
    }

    /// Resume (or name) a campaign by execution id
    pub fn with_execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = id.into();
        self
    }

    /// Set strategy-specific options shared by every created strategy
    pub fn with_strategy_options(mut self, options: StrategyOptions) -> Self {
        self.strategy_options = options;
        self
    }

    /// Register a provider handle. Its qualified name must be in the
    /// "<provider>/<model>" form.
    pub fn add_provider(&mut self, handle: ProviderHandle) -> Result<()> {
        split_qualified_name(handle.qualified_name())?;
        info!(key = handle.qualified_name(), "adding provider handle");
        self.providers.push(handle);
        Ok(())
    }

    /// Register a scorer
    pub fn add_scorer(&mut self, scorer: Arc<dyn Scorer>) {
        self.scorers.push(scorer);
    }

    /// Mutable access to the strategy registry, for custom strategies
    pub fn strategy_registry_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.registry
    }

    /// The campaign's execution id
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Execution metadata for this campaign
    pub fn execution(&self) -> ExecutionRun {
        ExecutionRun {
            id: self.execution_id.clone(),
            started_at: self.started_at,
            policy: self.config.completion,
            resource_keys: self
                .providers
                .iter()
                .map(|p| p.qualified_name().to_string())
                .collect(),
        }
    }

    /// Attack every target with every strategy mode over the given
    /// inputs. Targets without a registered handle are skipped with an
    /// error log; a run always returns whatever it accumulated.
    #[instrument(skip(self, modes, targets, inputs), fields(execution_id = %self.execution_id))]
    pub async fn run(
        &self,
        modes: &[StrategyMode],
        targets: &[String],
        inputs: &[String],
    ) -> Result<(CampaignReport, Vec<RunSummary>)> {
        info!("starting campaign...");
        let start = Instant::now();

        let pool = Arc::new(ResourcePool::new());
        for provider in &self.providers {
            pool.register(Arc::clone(provider));
        }

        let mut summaries = Vec::new();
        for target in targets {
            if !pool.contains(target) {
                error!(target = %target, "target has not been added to the campaign, skipping");
                continue;
            }

            for mode in modes {
                info!(
                    inputs = inputs.len(),
                    mode = %mode,
                    target = %target,
                    "attacking inputs"
                );
                let strategy = self.registry.create(*mode, &self.strategy_options)?;
                let executor = AttemptExecutor::new(
                    strategy,
                    self.scorers.clone(),
                    Arc::clone(&pool),
                    target.clone(),
                    self.run_checkpoint_id(*mode, target),
                    self.config.clone(),
                );
                summaries.push(executor.run(inputs).await?);
            }
        }

        info!(elapsed = ?start.elapsed(), "campaign done");

        let report = CampaignReport::from_summaries(&self.execution_id, &summaries, &self.scorers);
        Ok((report, summaries))
    }

    /// Close every registered provider
    pub async fn close(&self) -> Result<()> {
        for result in join_all(self.providers.iter().map(|p| p.close())).await {
            result?;
        }
        Ok(())
    }

    /// Checkpoint file id for one (mode, target) pair. Deterministic so
    /// resuming with the same execution id finds the same files.
    fn run_checkpoint_id(&self, mode: StrategyMode, target: &str) -> String {
        format!("{}-{}-{}", self.execution_id, mode, target.replace('/', "_"))
    }
}
