// Engine configuration
//
// Builder-style configuration for one engine run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rule governing when a multi-worker run is considered finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Continue until every worker has finished
    AllCompleted,
    /// Stop as soon as the run accumulator holds any result
    FirstCompleted,
    /// Like FirstCompleted, but also stop the instant any worker
    /// returns with no results at all
    FirstResult,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        CompletionPolicy::AllCompleted
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrently scheduled workers
    pub max_workers: usize,

    /// Completion policy for the run
    pub completion: CompletionPolicy,

    /// Qualified key of the judge model used for classification.
    /// Defaults to the attack target's key when unset.
    pub judge_key: Option<String>,

    /// Refinement attempt budget. Zero disables refinement.
    pub refine_attempts: usize,

    /// Retry cap per dedup key for failing attempts. `None` retries
    /// forever (reference behavior, risks a hot loop on a permanently
    /// failing item).
    pub max_retries: Option<u32>,

    /// Directory holding checkpoint files, one per execution id
    pub checkpoint_dir: PathBuf,

    /// Coordinator poll interval. A liveness aid only; correctness does
    /// not depend on it.
    pub poll_interval: Duration,

    /// Show a progress bar while attacking
    pub progress: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            completion: CompletionPolicy::default(),
            judge_key: None,
            refine_attempts: 0,
            max_retries: Some(3),
            checkpoint_dir: PathBuf::from(".out"),
            poll_interval: Duration::from_secs(60),
            progress: false,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    /// Set the completion policy
    pub fn with_completion(mut self, policy: CompletionPolicy) -> Self {
        self.completion = policy;
        self
    }

    /// Use a distinct judge model for classification
    pub fn with_judge_key(mut self, key: impl Into<String>) -> Self {
        self.judge_key = Some(key.into());
        self
    }

    /// Set the refinement attempt budget
    pub fn with_refine_attempts(mut self, attempts: usize) -> Self {
        self.refine_attempts = attempts;
        self
    }

    /// Set the retry cap for failing attempts
    pub fn with_max_retries(mut self, retries: Option<u32>) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the checkpoint directory
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// Set the coordinator poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.completion, CompletionPolicy::AllCompleted);
        assert_eq!(config.max_retries, Some(3));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert!(config.judge_key.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_max_workers(4)
            .with_completion(CompletionPolicy::FirstCompleted)
            .with_judge_key("openai/gpt-4o-mini")
            .with_refine_attempts(2)
            .with_max_retries(None);

        assert_eq!(config.max_workers, 4);
        assert_eq!(config.completion, CompletionPolicy::FirstCompleted);
        assert_eq!(config.judge_key.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(config.refine_attempts, 2);
        assert_eq!(config.max_retries, None);
    }

    #[test]
    fn test_workers_floor_at_one() {
        let config = EngineConfig::new().with_max_workers(0);
        assert_eq!(config.max_workers, 1);
    }
}
