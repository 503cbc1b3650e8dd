// Attack strategy trait and registry
//
// A strategy is the pluggable algorithm that turns an input into a model
// query and parses its result. Strategies are registered in an explicit
// key -> factory table built at startup; each factory receives an open
// options map for strategy-specific arguments.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use redfuzz_core::{AttemptParams, AttemptResult, FuzzError, Result};

use crate::pool::{Lease, ResourcePool};
use crate::strategies::{DirectStrategy, PoliteStrategy};

/// Attack strategy modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyMode {
    /// Send the input unchanged
    Direct,
    /// Wrap the input in a polite request
    Polite,
}

impl StrategyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyMode::Direct => "direct",
            StrategyMode::Polite => "polite",
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyMode {
    type Err = FuzzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(StrategyMode::Direct),
            "polite" => Ok(StrategyMode::Polite),
            other => Err(FuzzError::config(format!("unknown strategy mode: {other}"))),
        }
    }
}

/// Lease accessor bound to the run's resource pool, handed to strategies
/// while performing an attempt.
pub struct AttemptContext<'a> {
    pool: &'a ResourcePool,
    target_key: &'a str,
}

impl<'a> AttemptContext<'a> {
    pub(crate) fn new(pool: &'a ResourcePool, target_key: &'a str) -> Self {
        Self { pool, target_key }
    }

    /// Qualified key of the model under attack
    pub fn target_key(&self) -> &str {
        self.target_key
    }

    /// Lease the target model's handle
    pub async fn lease_target(&self) -> Result<Lease> {
        self.pool.lease(self.target_key).await
    }

    /// Lease a handle for an arbitrary registered key
    pub async fn lease(&self, key: &str) -> Result<Lease> {
        self.pool.lease(key).await
    }
}

/// Trait for attack strategies
#[async_trait]
pub trait AttackStrategy: Send + Sync {
    /// The mode this strategy implements
    fn mode(&self) -> StrategyMode;

    /// Expand the supplied inputs into attempt parameters.
    /// Default: one attempt per input.
    fn generate_attempts(&self, inputs: &[String]) -> Vec<AttemptParams> {
        inputs.iter().map(AttemptParams::new).collect()
    }

    /// Filter out attempts already covered by prior results when resuming
    /// a previous execution id. Default: drop attempts whose dedup key
    /// matches a recorded result.
    fn reduce_attempts(
        &self,
        prior: &[AttemptResult],
        attempts: Vec<AttemptParams>,
    ) -> Vec<AttemptParams> {
        attempts
            .into_iter()
            .filter(|params| !prior.iter().any(|entry| entry.dedup_key() == params.dedup_key()))
            .collect()
    }

    /// Perform one attempt: transform the input, lease a handle through
    /// `ctx`, query the model and parse the result. `Ok(None)` means the
    /// model produced no output; an error requeues the attempt.
    async fn perform_attempt(
        &self,
        params: &AttemptParams,
        ctx: &AttemptContext<'_>,
    ) -> Result<Option<AttemptResult>>;
}

impl fmt::Debug for dyn AttackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttackStrategy")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

/// Open options map for strategy-specific arguments
pub type StrategyOptions = serde_json::Map<String, Value>;

/// Factory building a strategy instance from its options
pub type StrategyFactory =
    Box<dyn Fn(&StrategyOptions) -> Result<Arc<dyn AttackStrategy>> + Send + Sync>;

/// Explicit mode -> factory table, populated at startup.
pub struct StrategyRegistry {
    factories: HashMap<StrategyMode, StrategyFactory>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with all builtin strategies registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(StrategyMode::Direct, |_options| {
            Ok(Arc::new(DirectStrategy::new()) as Arc<dyn AttackStrategy>)
        });
        registry.register(StrategyMode::Polite, |options| {
            Ok(Arc::new(PoliteStrategy::from_options(options)?) as Arc<dyn AttackStrategy>)
        });
        registry
    }

    /// Register a factory for `mode`, replacing any existing one
    pub fn register<F>(&mut self, mode: StrategyMode, factory: F)
    where
        F: Fn(&StrategyOptions) -> Result<Arc<dyn AttackStrategy>> + Send + Sync + 'static,
    {
        self.factories.insert(mode, Box::new(factory));
    }

    /// Whether a factory is registered for `mode`
    pub fn has_strategy(&self, mode: StrategyMode) -> bool {
        self.factories.contains_key(&mode)
    }

    /// Build a strategy for `mode` with the given options
    pub fn create(
        &self,
        mode: StrategyMode,
        options: &StrategyOptions,
    ) -> Result<Arc<dyn AttackStrategy>> {
        let factory = self
            .factories
            .get(&mode)
            .ok_or_else(|| FuzzError::config(format!("no strategy registered for mode: {mode}")))?;
        factory(options)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
