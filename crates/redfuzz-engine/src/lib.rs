// Redfuzz Execution Engine
//
// The concurrent engine that drives repeated, resource-constrained
// attempts against a bounded pool of exclusive model handles, with
// resumable progress and pluggable scoring.
//
// Key design decisions:
// - Handles are leased exclusively via an RAII guard so release runs on
//   every exit path, including cancellation
// - Completed attempts are checkpointed as JSONL before a worker moves
//   on, giving at-least-once durability across crashes
// - Workers are cooperatively cancelled through a watch channel; a run
//   always awaits every worker before returning
// - Strategies and scorers plug in via traits; builtin implementations
//   are registered in explicit tables at startup
// - No ordering is guaranteed between results of different attempts

pub mod campaign;
pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod executor;
pub mod pool;
pub mod refine;
pub mod report;
pub mod scorers;
pub mod strategies;
pub mod strategy;

// Re-exports for convenience
pub use campaign::{Campaign, ExecutionRun};
pub use checkpoint::CheckpointStore;
pub use classify::{is_hit, ClassificationOutcome};
pub use config::{CompletionPolicy, EngineConfig};
pub use executor::{AttemptExecutor, RunSummary};
pub use pool::{Lease, ResourcePool};
pub use refine::RefinementHandler;
pub use report::{CampaignReport, ModelReport, ReportEntry, StrategyReport};
pub use strategy::{
    AttackStrategy, AttemptContext, StrategyFactory, StrategyMode, StrategyOptions,
    StrategyRegistry,
};
